//! Hook Handlers
//!
//! A handler receives the current operation context and hands back a partial
//! override, or fails. Failing is the only way to stop the core operation.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::core::{ContextPatch, CoreError, OperationContext};

/// What a handler hands back
pub type HookResult = Result<ContextPatch, HookFailure>;

/// Future returned by a handler
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = HookResult> + Send + 'a>>;

/// A handler registered on a `(collection, event)` chain
pub trait HookHandler: Send + Sync {
    fn call(&self, ctx: OperationContext) -> HookFuture<'_>;
}

impl<F, Fut> HookHandler for F
where
    F: Fn(OperationContext) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    fn call(&self, ctx: OperationContext) -> HookFuture<'_> {
        Box::pin(self(ctx))
    }
}

/// Failure raised by a handler
///
/// A veto stops the pipeline exactly like any other failure; it only marks
/// the stop as intentional so callers and logs can tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookFailure {
    message: String,
    vetoed: bool,
}

impl HookFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            vetoed: false,
        }
    }

    /// Intentional short-circuit of the core operation
    pub fn veto(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            vetoed: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_veto(&self) -> bool {
        self.vetoed
    }
}

impl From<CoreError> for HookFailure {
    fn from(e: CoreError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<&str> for HookFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HookFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}
