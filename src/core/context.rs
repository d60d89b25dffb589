//! Operation Context
//!
//! The per-call envelope threaded through a hook pipeline, plus the partial
//! override a handler hands back.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::accountability::Accountability;
use super::error::CoreError;
use super::schema::SchemaRef;
use crate::query::Query;

/// Field mapping carried as an item's payload
pub type Data = Map<String, Value>;

/// A stored item
pub type Item = Map<String, Value>;

/// Lifecycle events a hook chain can intercept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    Create,
    Read,
    Update,
    Delete,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 4] = [
        LifecycleEvent::Create,
        LifecycleEvent::Read,
        LifecycleEvent::Update,
        LifecycleEvent::Delete,
    ];

    /// Hook event name, e.g. `items.create`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "items.create",
            Self::Read => "items.read",
            Self::Update => "items.update",
            Self::Delete => "items.delete",
        }
    }

    /// Bare action name, e.g. `create`
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Whether a handler on this event may hand back a target `id`
    fn accepts_id(&self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }

    /// Whether a handler on this event may hand back `data`
    fn accepts_data(&self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }

    /// Whether a handler on this event may hand back a `query`
    fn accepts_query(&self) -> bool {
        matches!(self, Self::Read)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| CoreError::configuration(format!("Unknown lifecycle event: {}", s)))
    }
}

/// Item identifier; numeric or textual primary keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl ItemId {
    /// Parse a path segment, preferring an integer key
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Str(raw.to_string()))
    }

    /// Extract an identifier from a JSON value
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Context passed by value into each handler of a pipeline
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub collection: String,
    pub event: LifecycleEvent,
    pub id: Option<ItemId>,
    pub data: Option<Data>,
    pub query: Option<Query>,
    pub accountability: Accountability,
    pub schema: SchemaRef,
}

impl OperationContext {
    pub fn new(event: LifecycleEvent, schema: SchemaRef, accountability: Accountability) -> Self {
        Self {
            collection: schema.name.clone(),
            event,
            id: None,
            data: None,
            query: None,
            accountability,
            schema,
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Merge a handler's partial override into this context
    ///
    /// Shallow replace per field. The patch is checked against the event
    /// before anything is written, so a rejected patch leaves the context
    /// untouched.
    pub fn apply(&mut self, patch: ContextPatch) -> Result<(), String> {
        if patch.id.is_some() && !self.event.accepts_id() {
            return Err(format!("handler returned `id` for {}", self.event));
        }
        if patch.data.is_some() && !self.event.accepts_data() {
            return Err(format!("handler returned `data` for {}", self.event));
        }
        if patch.query.is_some() && !self.event.accepts_query() {
            return Err(format!("handler returned `query` for {}", self.event));
        }

        if let Some(id) = patch.id {
            self.id = Some(id);
        }
        if let Some(data) = patch.data {
            self.data = Some(data);
        }
        if let Some(query) = patch.query {
            self.query = Some(query);
        }
        Ok(())
    }
}

/// Partial override returned by a handler
///
/// Fields left as `None` carry over unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextPatch {
    pub id: Option<ItemId>,
    pub data: Option<Data>,
    pub query: Option<Query>,
}

impl ContextPatch {
    /// A patch that changes nothing
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn data(data: Data) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn query(query: Query) -> Self {
        Self {
            query: Some(query),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.data.is_none() && self.query.is_none()
    }
}
