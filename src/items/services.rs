//! Service factory
//!
//! Owns the collaborators every `ItemsService` shares: storage, the hook
//! pipeline, declared schemas and the permission policy.

use std::fmt;
use std::sync::Arc;

use crate::core::{Accountability, CoreError, CoreResult, SchemaRegistry};
use crate::hooks::{HookRegistry, PipelineExecutor};

use super::permissions::PermissionPolicy;
use super::service::ItemsService;
use super::storage::StorageBackend;

/// Options for constructing an `ItemsService`
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub accountability: Accountability,
    /// Overrides the accountability's own bypass flag when set
    pub bypass_permissions: Option<bool>,
}

impl ServiceOptions {
    pub fn new(accountability: Accountability) -> Self {
        Self {
            accountability,
            bypass_permissions: None,
        }
    }

    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass_permissions = Some(bypass);
        self
    }

    /// Effective bypass flag
    pub fn bypassing(&self) -> bool {
        self.bypass_permissions
            .unwrap_or_else(|| self.accountability.bypass_permissions())
    }
}

/// Shared collaborators of the items layer
pub struct Services {
    storage: Arc<dyn StorageBackend>,
    executor: PipelineExecutor,
    schemas: SchemaRegistry,
    policy: Arc<dyn PermissionPolicy>,
}

impl Services {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: Arc<HookRegistry>,
        schemas: SchemaRegistry,
        policy: Arc<dyn PermissionPolicy>,
    ) -> Self {
        Self {
            storage,
            executor: PipelineExecutor::new(registry),
            schemas,
            policy,
        }
    }

    /// Items service for one collection
    pub fn items(self: &Arc<Self>, collection: &str, options: ServiceOptions) -> CoreResult<ItemsService> {
        if collection.trim().is_empty() {
            return Err(CoreError::validation("Collection name must not be empty"));
        }
        Ok(ItemsService::new(
            Arc::clone(self),
            self.schemas.get(collection),
            options,
        ))
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    pub fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        self.executor.registry()
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn policy(&self) -> &dyn PermissionPolicy {
        self.policy.as_ref()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("registry", self.registry())
            .field("schemas", &self.schemas.len())
            .finish_non_exhaustive()
    }
}
