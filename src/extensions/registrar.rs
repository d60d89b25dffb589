//! Endpoint Registrar
//!
//! Collects routers from endpoint extensions and wraps the result in the
//! accountability middleware, so every mounted route sees the caller.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{middleware, Router};

use crate::core::{CoreError, CoreResult};
use crate::http_server::{resolve_accountability, AccountabilityResolver};
use crate::observability::{log_event, Event};

use super::{EndpointExtension, ExtensionContext};

/// Mounts extension routes onto one router
#[derive(Default)]
pub struct EndpointRegistrar {
    router: Router,
    mounted: Vec<String>,
    ids: HashSet<String>,
}

impl EndpointRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge built-in routes that do not belong to an extension
    pub fn merge(&mut self, routes: Router) {
        self.router = std::mem::take(&mut self.router).merge(routes);
    }

    /// Call the extension's route factory once and merge its router
    pub fn mount(&mut self, extension: &dyn EndpointExtension, context: &ExtensionContext) -> CoreResult<()> {
        let id = extension.id().to_string();
        if id.trim().is_empty() {
            return Err(CoreError::configuration("Endpoint extension id must not be empty"));
        }
        if !self.ids.insert(id.clone()) {
            return Err(CoreError::configuration(format!(
                "Endpoint extension mounted twice: {}",
                id
            )));
        }

        self.merge(extension.routes(context));
        log_event(Event::RoutesMounted, &[("extension", id.as_str())]);
        self.mounted.push(id);
        Ok(())
    }

    /// Ids of mounted extensions, in mount order
    pub fn mounted(&self) -> &[String] {
        &self.mounted
    }

    /// Final router with accountability resolved per request
    pub fn into_router(self, resolver: Arc<dyn AccountabilityResolver>) -> Router {
        self.router
            .layer(middleware::from_fn_with_state(resolver, resolve_accountability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SchemaRegistry;
    use crate::hooks::HookRegistry;
    use crate::items::{AllowAll, InMemoryStorage, Services};
    use axum::routing::get;

    struct Ping;

    impl EndpointExtension for Ping {
        fn id(&self) -> &str {
            "ping"
        }

        fn routes(&self, _context: &ExtensionContext) -> Router {
            Router::new().route("/ping", get(|| async { "pong" }))
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let services = Arc::new(Services::new(
            Arc::new(InMemoryStorage::new()),
            Arc::new(HookRegistry::new()),
            SchemaRegistry::new(),
            Arc::new(AllowAll),
        ));
        let ctx = ExtensionContext::new(&services, 1, "administrator");
        let mut registrar = EndpointRegistrar::new();

        registrar.mount(&Ping, &ctx).unwrap();
        assert!(matches!(
            registrar.mount(&Ping, &ctx),
            Err(CoreError::Configuration(_))
        ));
        assert_eq!(registrar.mounted(), ["ping".to_string()]);
    }
}
