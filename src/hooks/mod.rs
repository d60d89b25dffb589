//! # Hooks Module
//!
//! Interception of item lifecycle events. Extensions register handlers per
//! `(collection, event)`; the executor folds each chain over the operation
//! context before the items service touches storage.
//!
//! ## Guarantees
//!
//! - Handlers for one chain run in registration order, never concurrently
//! - A handler observes every mutation made by the handlers before it
//! - The first failing handler stops the chain and the core operation

pub mod handler;
pub mod pipeline;
pub mod registry;

pub use handler::{HookFailure, HookFuture, HookHandler, HookResult};
pub use pipeline::{HookError, PipelineExecutor};
pub use registry::{HandlerToken, HookChain, HookDefinition, HookRegistry};
