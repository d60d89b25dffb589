//! # Application assembly
//!
//! Startup runs in a fixed order:
//!
//! 1. Validate config, build schemas, policy and storage
//! 2. Let every hook extension register its handlers
//! 3. Seal the hook registry
//! 4. Mount built-in and extension routes behind the accountability layer
//!
//! After `build` returns, the registry accepts no new handlers.

use std::collections::HashSet;
use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use crate::bulk::BulkCoordinator;
use crate::config::Config;
use crate::core::{CoreError, CoreResult};
use crate::extensions::{
    CustomEndpoints, EndpointExtension, EndpointRegistrar, ExtensionContext, HookExtension,
    PostsHooks,
};
use crate::hooks::HookRegistry;
use crate::http_server::{
    cors_layer, health_routes, items_routes, AccountabilityResolver, HttpServer,
};
use crate::items::{InMemoryStorage, PermissionPolicy, Services, StorageBackend};
use crate::observability::{log_event, Event};

/// Builder for a running application
pub struct AppBuilder {
    config: Config,
    storage: Option<Arc<dyn StorageBackend>>,
    policy: Option<Arc<dyn PermissionPolicy>>,
    resolver: Option<Arc<dyn AccountabilityResolver>>,
    hook_extensions: Vec<Box<dyn HookExtension>>,
    endpoint_extensions: Vec<Box<dyn EndpointExtension>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            storage: None,
            policy: None,
            resolver: None,
            hook_extensions: Vec::new(),
            endpoint_extensions: Vec::new(),
        }
    }

    /// Storage backend; in-memory when not set
    pub fn with_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Permission policy; the config's role policy when not set
    pub fn with_policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Token resolver; the config's token table when not set
    pub fn with_resolver(mut self, resolver: Arc<dyn AccountabilityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_hook_extension(mut self, extension: impl HookExtension + 'static) -> Self {
        self.hook_extensions.push(Box::new(extension));
        self
    }

    pub fn with_endpoint_extension(mut self, extension: impl EndpointExtension + 'static) -> Self {
        self.endpoint_extensions.push(Box::new(extension));
        self
    }

    /// The `posts` hooks and the custom endpoints
    pub fn with_bundled_extensions(self) -> Self {
        self.with_hook_extension(PostsHooks)
            .with_endpoint_extension(CustomEndpoints)
    }

    pub fn build(self) -> CoreResult<App> {
        let config = self.config;
        config.validate()?;

        let schemas = config.schema_registry()?;
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(config.policy()));
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        let registry = Arc::new(HookRegistry::new());
        let services = Arc::new(Services::new(storage, registry.clone(), schemas, policy));

        let context = ExtensionContext::new(
            &services,
            config.bulk.max_concurrency,
            config.permissions.admin_role.clone(),
        );

        let mut hook_ids = HashSet::new();
        let mut hook_extensions = Vec::new();
        for extension in &self.hook_extensions {
            let id = extension.id().to_string();
            if !hook_ids.insert(id.clone()) {
                return Err(CoreError::configuration(format!(
                    "Hook extension loaded twice: {}",
                    id
                )));
            }
            extension.register(&registry, &context)?;
            log_event(Event::ExtensionLoaded, &[("extension", id.as_str()), ("kind", "hook")]);
            hook_extensions.push(id);
        }
        registry.seal();

        let mut registrar = EndpointRegistrar::new();
        registrar.merge(health_routes());
        registrar.merge(items_routes(services.clone()));
        for extension in &self.endpoint_extensions {
            registrar.mount(extension.as_ref(), &context)?;
        }
        let endpoint_extensions = registrar.mounted().to_vec();

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(config.token_resolver()));
        let router = registrar
            .into_router(resolver)
            .layer(cors_layer(&config.server));

        Ok(App {
            config,
            services,
            context,
            router,
            hook_extensions,
            endpoint_extensions,
        })
    }
}

/// Assembled application
pub struct App {
    config: Config,
    services: Arc<Services>,
    context: ExtensionContext,
    router: Router,
    hook_extensions: Vec<String>,
    endpoint_extensions: Vec<String>,
}

impl App {
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        self.services.registry()
    }

    pub fn context(&self) -> &ExtensionContext {
        &self.context
    }

    /// Bulk coordinator sharing the app-wide concurrency budget
    pub fn bulk(&self) -> CoreResult<BulkCoordinator> {
        self.context.bulk()
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_server(self) -> HttpServer {
        HttpServer::new(self.config.server, self.router)
    }

    /// Startup summary: bind address, collections, extensions, hook chains
    pub fn summary(&self) -> Value {
        let hooks: Vec<Value> = self
            .registry()
            .summary()
            .into_iter()
            .map(|(collection, event, handlers)| {
                json!({ "collection": collection, "event": event.as_str(), "handlers": handlers })
            })
            .collect();

        json!({
            "server": self.config.server.socket_addr(),
            "collections": self.services.schemas().len(),
            "tokens": self.config.tokens.len(),
            "extensions": {
                "hooks": self.hook_extensions,
                "endpoints": self.endpoint_extensions,
            },
            "hooks": hooks,
            "sealed": self.registry().is_sealed(),
        })
    }
}
