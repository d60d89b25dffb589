//! # Extensions
//!
//! Third-party code plugs in at two seams:
//!
//! - `HookExtension`: registers handlers on the hook registry at startup
//! - `EndpointExtension`: contributes routes mounted by the registrar
//!
//! Both receive an `ExtensionContext` giving access to the items services.
//! The bundled `posts_hooks` and `custom_endpoints` extensions double as
//! reference implementations.

pub mod context;
pub mod custom_endpoints;
pub mod posts_hooks;
pub mod registrar;

pub use context::ExtensionContext;
pub use custom_endpoints::CustomEndpoints;
pub use posts_hooks::PostsHooks;
pub use registrar::EndpointRegistrar;

use axum::Router;

use crate::core::CoreResult;
use crate::hooks::HookRegistry;

/// Extension registering hook handlers
pub trait HookExtension: Send + Sync {
    /// Unique extension id
    fn id(&self) -> &str;

    /// Called once during startup, before the registry is sealed
    fn register(&self, registry: &HookRegistry, context: &ExtensionContext) -> CoreResult<()>;
}

/// Extension contributing HTTP routes
pub trait EndpointExtension: Send + Sync {
    /// Unique extension id
    fn id(&self) -> &str;

    /// Called once during startup; the returned router is merged at the root
    fn routes(&self, context: &ExtensionContext) -> Router;
}
