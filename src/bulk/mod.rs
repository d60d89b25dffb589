//! # Bulk Operations
//!
//! One logical request fanned out into independent per-item updates. Items
//! never affect each other: a failure is recorded in its own result row and
//! the batch carries on. The batch as a whole is not atomic.

pub mod coordinator;

pub use coordinator::BulkCoordinator;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{CoreError, CoreResult, Data, ItemId};

pub const IDS_REQUIRED: &str = "ids array is required";
pub const DATA_REQUIRED: &str = "data object is required";

/// Validated bulk update request
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequest {
    pub ids: Vec<ItemId>,
    pub data: Data,
}

impl BulkRequest {
    /// Validate a raw `{ids, data}` body
    ///
    /// `ids` must be a non-empty array of integer or string keys and `data`
    /// an object. Nothing is dispatched for an invalid request.
    pub fn from_value(body: &Value) -> CoreResult<Self> {
        let ids = match body.get("ids") {
            Some(Value::Array(raw)) if !raw.is_empty() => raw
                .iter()
                .map(ItemId::from_value)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| CoreError::validation(IDS_REQUIRED))?,
            _ => return Err(CoreError::validation(IDS_REQUIRED)),
        };

        let data = match body.get("data") {
            Some(Value::Object(map)) => map.clone(),
            _ => return Err(CoreError::validation(DATA_REQUIRED)),
        };

        Ok(Self { ids, data })
    }
}

/// Outcome of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub id: ItemId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn succeeded(id: ItemId) -> Self {
        Self {
            id,
            success: true,
            error: None,
        }
    }

    pub fn failed(id: ItemId, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate outcome; `results` follows the input id order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}

impl BulkResult {
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}
