//! Collection Schemas
//!
//! Minimal schema description handed to hooks and storage. Undeclared
//! collections get a permissive schema keyed on `id`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::Data;
use super::error::{CoreError, CoreResult};

/// Shared schema handle
pub type SchemaRef = Arc<CollectionSchema>;

fn default_primary_key() -> String {
    "id".to_string()
}

/// Schema of one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Declared fields; `None` accepts any field
    #[serde(default)]
    pub fields: Option<BTreeSet<String>>,
}

impl CollectionSchema {
    /// Schema accepting any field
    pub fn permissive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            fields: None,
        }
    }

    /// Schema restricted to the given fields
    pub fn with_fields<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
            fields: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    /// Reject fields the schema does not declare
    pub fn validate_data(&self, data: &Data) -> CoreResult<()> {
        let Some(fields) = &self.fields else {
            return Ok(());
        };

        let unknown: Vec<&str> = data
            .keys()
            .filter(|k| **k != self.primary_key && !fields.contains(k.as_str()))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(CoreError::validation(format!(
                "Unknown field(s) for {}: {}",
                self.name,
                unknown.join(", ")
            )))
        }
    }
}

/// Lookup of declared schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, SchemaRef>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from declarations, rejecting duplicates and empty names
    pub fn from_schemas(schemas: impl IntoIterator<Item = CollectionSchema>) -> CoreResult<Self> {
        let mut registry = Self::new();
        for schema in schemas {
            registry.declare(schema)?;
        }
        Ok(registry)
    }

    pub fn declare(&mut self, schema: CollectionSchema) -> CoreResult<()> {
        if schema.name.trim().is_empty() {
            return Err(CoreError::configuration("Collection name must not be empty"));
        }
        if self.schemas.contains_key(&schema.name) {
            return Err(CoreError::configuration(format!(
                "Collection declared twice: {}",
                schema.name
            )));
        }
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Schema for a collection, permissive when undeclared
    pub fn get(&self, collection: &str) -> SchemaRef {
        self.schemas
            .get(collection)
            .cloned()
            .unwrap_or_else(|| Arc::new(CollectionSchema::permissive(collection)))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
