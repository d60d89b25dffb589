//! Storage Backend
//!
//! Boundary to the storage collaborator. The items service is the only
//! caller; it hands over the final, hook-mutated query or data. Each
//! single-item write is atomic on its own; nothing here spans items.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use thiserror::Error;

use crate::core::{CollectionSchema, Data, Item, ItemId};
use crate::query::Query;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Future returned by storage operations
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = StorageResult<T>> + Send + 'a>>;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Item {id} not found in {collection}")]
    NotFound { collection: String, id: String },

    /// Opaque failure from the backend
    #[error("{0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(collection: &str, id: &ItemId) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

/// Trait for the storage backend
pub trait StorageBackend: Send + Sync {
    /// Rows matching a query
    fn query<'a>(
        &'a self,
        schema: &'a CollectionSchema,
        query: &'a Query,
    ) -> StorageFuture<'a, Vec<Item>>;

    /// A single row by primary key
    fn read<'a>(&'a self, schema: &'a CollectionSchema, id: &'a ItemId)
        -> StorageFuture<'a, Option<Item>>;

    /// Insert a row, returning its primary key
    fn insert<'a>(&'a self, schema: &'a CollectionSchema, data: Data) -> StorageFuture<'a, ItemId>;

    /// Merge fields into an existing row
    fn update<'a>(
        &'a self,
        schema: &'a CollectionSchema,
        id: &'a ItemId,
        data: Data,
    ) -> StorageFuture<'a, Item>;

    /// Remove a row; `false` if it did not exist
    fn delete<'a>(&'a self, schema: &'a CollectionSchema, id: &'a ItemId) -> StorageFuture<'a, bool>;
}

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Item>,
    next_id: i64,
}

impl Table {
    fn position(&self, primary_key: &str, id: &ItemId) -> Option<usize> {
        let key = id.to_value();
        self.rows.iter().position(|row| row.get(primary_key) == Some(&key))
    }

    fn assign_id(&mut self, primary_key: &str, data: &mut Data) -> StorageResult<ItemId> {
        if let Some(raw) = data.get(primary_key) {
            let id = ItemId::from_value(raw).ok_or_else(|| {
                StorageError::Backend(format!("Primary key {} must be a string or integer", primary_key))
            })?;
            if self.position(primary_key, &id).is_some() {
                return Err(StorageError::Backend(format!("Duplicate primary key: {}", id)));
            }
            if let ItemId::Int(n) = id {
                self.next_id = self.next_id.max(n);
            }
            return Ok(id);
        }

        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| StorageError::Backend("primary key space exhausted".into()))?;
        let id = ItemId::Int(self.next_id);
        data.insert(primary_key.to_string(), id.to_value());
        Ok(id)
    }
}

/// In-memory storage backend
///
/// Rows keep insertion order; auto-assigned keys are increasing integers.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<HashMap<String, Table>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, bypassing hooks and permissions
    pub fn seed(
        &self,
        schema: &CollectionSchema,
        rows: impl IntoIterator<Item = Value>,
    ) -> StorageResult<Vec<ItemId>> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(schema.name.clone()).or_default();

        let mut ids = Vec::new();
        for row in rows {
            let Value::Object(mut data) = row else {
                return Err(StorageError::Backend("Seed rows must be objects".into()));
            };
            ids.push(table.assign_id(&schema.primary_key, &mut data)?);
            table.rows.push(data);
        }
        Ok(ids)
    }

    /// Snapshot of every row in a collection
    pub fn rows(&self, collection: &str) -> Vec<Item> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(collection)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn query_now(&self, schema: &CollectionSchema, query: &Query) -> StorageResult<Vec<Item>> {
        let rows = self.rows(&schema.name);
        query
            .evaluate(rows)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn read_now(&self, schema: &CollectionSchema, id: &ItemId) -> Option<Item> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = tables.get(&schema.name)?;
        table
            .position(&schema.primary_key, id)
            .map(|i| table.rows[i].clone())
    }

    fn insert_now(&self, schema: &CollectionSchema, mut data: Data) -> StorageResult<ItemId> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(schema.name.clone()).or_default();
        let id = table.assign_id(&schema.primary_key, &mut data)?;
        table.rows.push(data);
        Ok(id)
    }

    fn update_now(&self, schema: &CollectionSchema, id: &ItemId, data: Data) -> StorageResult<Item> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .get_mut(&schema.name)
            .ok_or_else(|| StorageError::not_found(&schema.name, id))?;
        let index = table
            .position(&schema.primary_key, id)
            .ok_or_else(|| StorageError::not_found(&schema.name, id))?;

        let row = &mut table.rows[index];
        for (key, value) in data {
            // the primary key is not updatable
            if key != schema.primary_key {
                row.insert(key, value);
            }
        }
        Ok(row.clone())
    }

    fn delete_now(&self, schema: &CollectionSchema, id: &ItemId) -> bool {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get_mut(&schema.name) else {
            return false;
        };
        match table.position(&schema.primary_key, id) {
            Some(index) => {
                table.rows.remove(index);
                true
            }
            None => false,
        }
    }
}

impl StorageBackend for InMemoryStorage {
    fn query<'a>(
        &'a self,
        schema: &'a CollectionSchema,
        query: &'a Query,
    ) -> StorageFuture<'a, Vec<Item>> {
        Box::pin(async move { self.query_now(schema, query) })
    }

    fn read<'a>(
        &'a self,
        schema: &'a CollectionSchema,
        id: &'a ItemId,
    ) -> StorageFuture<'a, Option<Item>> {
        Box::pin(async move { Ok(self.read_now(schema, id)) })
    }

    fn insert<'a>(&'a self, schema: &'a CollectionSchema, data: Data) -> StorageFuture<'a, ItemId> {
        Box::pin(async move { self.insert_now(schema, data) })
    }

    fn update<'a>(
        &'a self,
        schema: &'a CollectionSchema,
        id: &'a ItemId,
        data: Data,
    ) -> StorageFuture<'a, Item> {
        Box::pin(async move { self.update_now(schema, id, data) })
    }

    fn delete<'a>(&'a self, schema: &'a CollectionSchema, id: &'a ItemId) -> StorageFuture<'a, bool> {
        Box::pin(async move { Ok(self.delete_now(schema, id)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use serde_json::json;

    fn posts() -> CollectionSchema {
        CollectionSchema::permissive("posts")
    }

    fn data(value: Value) -> Data {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let storage = InMemoryStorage::new();
        let a = storage.insert(&posts(), data(json!({"title": "a"}))).await.unwrap();
        let b = storage.insert(&posts(), data(json!({"title": "b"}))).await.unwrap();

        assert_eq!(a, ItemId::Int(1));
        assert_eq!(b, ItemId::Int(2));
        assert_eq!(storage.rows("posts")[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_explicit_key_and_duplicate() {
        let storage = InMemoryStorage::new();
        let id = storage
            .insert(&posts(), data(json!({"id": 10, "title": "a"})))
            .await
            .unwrap();
        assert_eq!(id, ItemId::Int(10));

        let next = storage.insert(&posts(), data(json!({"title": "b"}))).await.unwrap();
        assert_eq!(next, ItemId::Int(11));

        let dup = storage.insert(&posts(), data(json!({"id": 10}))).await;
        assert!(matches!(dup, Err(StorageError::Backend(_))));
    }

    #[tokio::test]
    async fn test_auto_id_overflow_is_backend_error() {
        let storage = InMemoryStorage::new();
        storage.seed(&posts(), vec![json!({"id": i64::MAX})]).unwrap();

        let result = storage.insert(&posts(), data(json!({"title": "x"}))).await;
        assert_eq!(
            result,
            Err(StorageError::Backend("primary key space exhausted".into()))
        );
        assert_eq!(storage.rows("posts").len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_key() {
        let storage = InMemoryStorage::new();
        storage.seed(&posts(), vec![json!({"id": 1, "title": "a"})]).unwrap();

        let row = storage
            .update(&posts(), &ItemId::Int(1), data(json!({"id": 5, "status": "x"})))
            .await
            .unwrap();

        assert_eq!(row["id"], 1);
        assert_eq!(row["title"], "a");
        assert_eq!(row["status"], "x");
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let storage = InMemoryStorage::new();
        let result = storage
            .update(&posts(), &ItemId::Int(1), Data::new())
            .await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_query_and_delete() {
        let storage = InMemoryStorage::new();
        storage
            .seed(
                &posts(),
                vec![
                    json!({"title": "a", "status": "draft"}),
                    json!({"title": "b", "status": "published"}),
                ],
            )
            .unwrap();

        let query = Query::new().with_filter(Filter::eq("status", "published"));
        let rows = storage.query(&posts(), &query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "b");

        assert!(storage.delete(&posts(), &ItemId::Int(1)).await.unwrap());
        assert!(!storage.delete(&posts(), &ItemId::Int(1)).await.unwrap());
        assert_eq!(storage.rows("posts").len(), 1);
    }

    #[tokio::test]
    async fn test_string_keys() {
        let storage = InMemoryStorage::new();
        let schema = CollectionSchema::permissive("tags").with_primary_key("slug");
        storage.seed(&schema, vec![json!({"slug": "rust"})]).unwrap();

        let row = storage.read(&schema, &ItemId::from("rust")).await.unwrap();
        assert!(row.is_some());
    }
}
