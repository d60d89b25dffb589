//! Extension Context
//!
//! Handed to every extension at startup. Hooks live inside the registry
//! that `Services` owns, so the context keeps only a weak handle to it.

use std::sync::{Arc, Weak};

use tokio::sync::Semaphore;

use crate::bulk::BulkCoordinator;
use crate::core::{CoreError, CoreResult};
use crate::items::{ItemsService, ServiceOptions, Services};

/// Services available to extensions
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    services: Weak<Services>,
    bulk_permits: Arc<Semaphore>,
    max_concurrency: usize,
    admin_role: String,
}

impl ExtensionContext {
    pub fn new(services: &Arc<Services>, max_concurrency: usize, admin_role: impl Into<String>) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            services: Arc::downgrade(services),
            bulk_permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            admin_role: admin_role.into(),
        }
    }

    pub fn services(&self) -> CoreResult<Arc<Services>> {
        self.services
            .upgrade()
            .ok_or_else(|| CoreError::internal("items services have been shut down"))
    }

    /// Items service for `collection`
    pub fn items(&self, collection: &str, options: ServiceOptions) -> CoreResult<ItemsService> {
        self.services()?.items(collection, options)
    }

    /// Bulk coordinator sharing one concurrency budget across all callers
    pub fn bulk(&self) -> CoreResult<BulkCoordinator> {
        Ok(BulkCoordinator::with_permits(
            self.services()?,
            Arc::clone(&self.bulk_permits),
            self.max_concurrency,
        ))
    }

    /// Name of the role with unrestricted access
    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }
}
