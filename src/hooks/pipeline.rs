//! Pipeline Executor
//!
//! Folds a hook chain left to right over an operation context. Handlers run
//! strictly one after another; each sees the context as left by the previous
//! one. The first failure stops the fold and is returned to the caller,
//! which must then skip the core storage operation.

use std::fmt;
use std::sync::Arc;

use crate::core::OperationContext;
use crate::observability::{log_event, Event};

use super::handler::HookFailure;
use super::registry::HookRegistry;

/// A handler failure together with where the fold stopped
#[derive(Debug, Clone)]
pub struct HookError {
    failure: HookFailure,
    index: usize,
    context: Box<OperationContext>,
}

impl HookError {
    pub fn new(failure: HookFailure, index: usize, context: OperationContext) -> Self {
        Self {
            failure,
            index,
            context: Box::new(context),
        }
    }

    pub fn failure(&self) -> &HookFailure {
        &self.failure
    }

    /// The failing handler's message, unchanged
    pub fn message(&self) -> &str {
        self.failure.message()
    }

    /// Position of the failing handler in its chain
    pub fn index(&self) -> usize {
        self.index
    }

    /// Context as of just before the failing handler ran
    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    pub fn is_veto(&self) -> bool {
        self.failure.is_veto()
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.failure.message())
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.failure)
    }
}

/// Runs the registered chain for an operation
#[derive(Clone)]
pub struct PipelineExecutor {
    registry: Arc<HookRegistry>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Run the chain keyed by the context's collection and event
    ///
    /// With no handlers registered the context comes back unchanged.
    pub async fn run(&self, initial: OperationContext) -> Result<OperationContext, HookError> {
        let chain = self.registry.chain_for(&initial.collection, initial.event);
        let mut ctx = initial;

        for (index, hook) in chain.iter().enumerate() {
            let outcome = hook.handler().call(ctx.clone()).await;

            let failure = match outcome {
                Ok(patch) => match ctx.apply(patch) {
                    Ok(()) => continue,
                    Err(reason) => HookFailure::new(reason),
                },
                Err(failure) => failure,
            };

            let error = HookError::new(failure, index, ctx);
            report(&error);
            return Err(error);
        }

        Ok(ctx)
    }
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("registry", &self.registry)
            .finish()
    }
}

fn report(error: &HookError) {
    let event = if error.is_veto() {
        Event::PipelineVetoed
    } else {
        Event::PipelineAborted
    };
    let ctx = error.context();
    let index = error.index().to_string();
    log_event(
        event,
        &[
            ("collection", ctx.collection.as_str()),
            ("event", ctx.event.as_str()),
            ("index", index.as_str()),
            ("message", error.message()),
        ],
    );
}
