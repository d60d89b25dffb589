//! # Hook Registry
//!
//! Ordered handler chains keyed by `(collection, event)`. Insertion order is
//! execution order. Chains are copy-on-write: readers get an `Arc` snapshot,
//! writers swap in a rebuilt slice, so a running pipeline never observes a
//! half-updated chain.
//!
//! The registry has two phases. During startup extensions register freely;
//! `seal()` closes registration before traffic is served. Unregistration
//! stays available after sealing.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::{CoreError, CoreResult, LifecycleEvent, OperationContext};
use crate::observability::{log_event, Event};

use super::handler::{HookHandler, HookResult};

/// Handle identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerToken(u64);

impl HandlerToken {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// A registered handler with its slot in the chain
#[derive(Clone)]
pub struct HookDefinition {
    pub token: HandlerToken,
    pub collection: String,
    pub event: LifecycleEvent,
    handler: Arc<dyn HookHandler>,
}

impl HookDefinition {
    pub fn handler(&self) -> &dyn HookHandler {
        self.handler.as_ref()
    }

    /// Registration sequence; ties never occur
    pub fn order(&self) -> u64 {
        self.token.0
    }
}

impl fmt::Debug for HookDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDefinition")
            .field("token", &self.token)
            .field("collection", &self.collection)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// Immutable snapshot of one chain
pub type HookChain = Arc<[HookDefinition]>;

type ChainKey = (String, LifecycleEvent);

#[derive(Default)]
struct RegistryState {
    chains: HashMap<ChainKey, HookChain>,
    index: HashMap<HandlerToken, ChainKey>,
}

/// Registry of hook chains
#[derive(Default)]
pub struct HookRegistry {
    state: RwLock<RegistryState>,
    next_token: AtomicU64,
    sealed: AtomicBool,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the chain for `(collection, event)`
    ///
    /// Registering the same handler twice yields two independent slots.
    pub fn register<F, Fut>(
        &self,
        collection: &str,
        event: LifecycleEvent,
        handler: F,
    ) -> CoreResult<HandlerToken>
    where
        F: Fn(OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.register_arc(collection, event, Arc::new(handler))
    }

    /// Register by event name, e.g. `items.create`
    pub fn register_named<F, Fut>(
        &self,
        collection: &str,
        event: &str,
        handler: F,
    ) -> CoreResult<HandlerToken>
    where
        F: Fn(OperationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let event = event.parse::<LifecycleEvent>()?;
        self.register(collection, event, handler)
    }

    /// Register a shared handler
    pub fn register_arc(
        &self,
        collection: &str,
        event: LifecycleEvent,
        handler: Arc<dyn HookHandler>,
    ) -> CoreResult<HandlerToken> {
        if collection.trim().is_empty() {
            return Err(CoreError::configuration("Hook collection must not be empty"));
        }
        if self.is_sealed() {
            return Err(CoreError::configuration(format!(
                "Hook registry is sealed; cannot register {} on {}",
                event, collection
            )));
        }

        let token = HandlerToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        let key = (collection.to_string(), event);
        let definition = HookDefinition {
            token,
            collection: collection.to_string(),
            event,
            handler,
        };

        let position = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let mut chain = state
                .chains
                .get(&key)
                .map(|c| c.to_vec())
                .unwrap_or_default();
            chain.push(definition);
            let position = chain.len();
            state.chains.insert(key.clone(), chain.into());
            state.index.insert(token, key);
            position
        };

        let position = position.to_string();
        log_event(
            Event::HookRegistered,
            &[
                ("collection", collection),
                ("event", event.as_str()),
                ("position", position.as_str()),
            ],
        );

        Ok(token)
    }

    /// Remove a single handler; returns whether it was registered
    pub fn unregister(&self, token: HandlerToken) -> bool {
        let removed = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(key) = state.index.remove(&token) else {
                return false;
            };
            if let Some(chain) = state.chains.get(&key) {
                let rebuilt: Vec<HookDefinition> =
                    chain.iter().filter(|d| d.token != token).cloned().collect();
                if rebuilt.is_empty() {
                    state.chains.remove(&key);
                } else {
                    state.chains.insert(key.clone(), rebuilt.into());
                }
            }
            key
        };

        log_event(
            Event::HookUnregistered,
            &[("collection", removed.0.as_str()), ("event", removed.1.as_str())],
        );
        true
    }

    /// Ordered chain for `(collection, event)`; empty when none registered
    pub fn chain_for(&self, collection: &str, event: LifecycleEvent) -> HookChain {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .chains
            .get(&(collection.to_string(), event))
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Close the registration phase
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::SeqCst) {
            let handlers = self.len().to_string();
            log_event(Event::RegistrySealed, &[("handlers", handlers.as_str())]);
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// Total number of registered handlers
    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(collection, event, chain length)` for every non-empty chain, sorted
    pub fn summary(&self) -> Vec<(String, LifecycleEvent, usize)> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<_> = state
            .chains
            .iter()
            .map(|((collection, event), chain)| (collection.clone(), *event, chain.len()))
            .collect();
        rows.sort();
        rows
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("handlers", &self.len())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}
