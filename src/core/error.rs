//! Core Error Types
//!
//! Unified error taxonomy surfaced by the items service and its collaborators.

use thiserror::Error;

use crate::hooks::HookError;
use crate::items::storage::StorageError;

/// Core module result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Bad registration or configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed input shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// No authenticated user where one is required
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but the role lacks access
    #[error("Forbidden: {0}")]
    PermissionDenied(String),

    /// A handler in the chain failed
    #[error("{0}")]
    HookAborted(HookError),

    /// A handler in the chain intentionally vetoed the operation
    #[error("{0}")]
    Vetoed(HookError),

    /// Opaque passthrough from the storage collaborator
    #[error("Storage error: {0}")]
    Storage(String),

    /// Target item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The hook failure behind this error, if any
    pub fn hook_error(&self) -> Option<&HookError> {
        match self {
            Self::HookAborted(e) | Self::Vetoed(e) => Some(e),
            _ => None,
        }
    }

    /// Get error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::HookAborted(_) => "HOOK_ABORTED",
            Self::Vetoed(_) => "VETOED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::HookAborted(_) => 400,
            Self::Unauthorized => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::Vetoed(_) => 409,
            Self::Configuration(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<HookError> for CoreError {
    fn from(e: HookError) -> Self {
        if e.is_veto() {
            Self::Vetoed(e)
        } else {
            Self::HookAborted(e)
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { .. } => Self::NotFound(e.to_string()),
            StorageError::Backend(msg) => Self::Storage(msg),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CoreError::Unauthorized.status_code(), 401);
        assert_eq!(CoreError::permission_denied("x").status_code(), 403);
        assert_eq!(CoreError::validation("x").status_code(), 400);
        assert_eq!(CoreError::Storage("disk".into()).status_code(), 500);
    }

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: CoreError = StorageError::NotFound {
            collection: "posts".into(),
            id: "9".into(),
        }
        .into();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
