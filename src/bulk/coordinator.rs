//! Bulk Coordinator
//!
//! Runs one `update_one` per id concurrently, bounded by a semaphore shared
//! by every batch, and settles all of them before building the result.

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::core::{Accountability, CoreError, CoreResult, Data, ItemId};
use crate::items::{ServiceOptions, Services, UpdateOptions};
use crate::observability::{log_event, Event};

use super::{BulkItemResult, BulkResult, IDS_REQUIRED};

/// Default number of item updates in flight across all batches
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Fans bulk requests out into per-item updates
#[derive(Clone)]
pub struct BulkCoordinator {
    services: Arc<Services>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

impl BulkCoordinator {
    /// `max_concurrency` of zero is treated as one
    pub fn new(services: Arc<Services>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self::with_permits(
            services,
            Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        )
    }

    /// Coordinator drawing on an existing permit pool
    pub fn with_permits(services: Arc<Services>, permits: Arc<Semaphore>, max_concurrency: usize) -> Self {
        Self {
            services,
            permits,
            max_concurrency,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Apply `data` to every id as the given caller
    ///
    /// Only request-level problems fail the call. Per-item failures,
    /// including hook aborts and permission denials, land in `results`.
    pub async fn bulk_update(
        &self,
        collection: &str,
        ids: Vec<ItemId>,
        data: Data,
        accountability: Accountability,
    ) -> CoreResult<BulkResult> {
        if ids.is_empty() {
            return Err(CoreError::validation(IDS_REQUIRED));
        }
        let service = self
            .services
            .items(collection, ServiceOptions::new(accountability))?;

        let attempts = ids.into_iter().map(|id| {
            let service = &service;
            let data = data.clone();
            let permits = &self.permits;
            async move {
                let _permit = match permits.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return BulkItemResult::failed(id, "bulk coordinator is shut down"),
                };
                match service
                    .update_one(id.clone(), data, UpdateOptions::default())
                    .await
                {
                    Ok(()) => BulkItemResult::succeeded(id),
                    Err(e) => BulkItemResult::failed(id, failure_message(&e)),
                }
            }
        });

        let result = BulkResult::from_results(join_all(attempts).await);

        let total = result.total.to_string();
        let successful = result.successful.to_string();
        let failed = result.failed.to_string();
        log_event(
            Event::BulkComplete,
            &[
                ("collection", collection),
                ("failed", failed.as_str()),
                ("successful", successful.as_str()),
                ("total", total.as_str()),
            ],
        );

        Ok(result)
    }
}

/// Hook failures report the handler's own message
fn failure_message(error: &CoreError) -> String {
    match error.hook_error() {
        Some(hook) => hook.message().to_string(),
        None => error.to_string(),
    }
}

impl fmt::Debug for BulkCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkCoordinator")
            .field("max_concurrency", &self.max_concurrency)
            .field("available", &self.permits.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CollectionSchema, ContextPatch, LifecycleEvent, OperationContext, SchemaRegistry};
    use crate::hooks::{HookFailure, HookRegistry};
    use crate::items::{AllowAll, InMemoryStorage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn setup(registry: Arc<HookRegistry>, rows: usize) -> (Arc<InMemoryStorage>, Arc<Services>) {
        let storage = Arc::new(InMemoryStorage::new());
        let schema = CollectionSchema::permissive("posts");
        storage
            .seed(&schema, (0..rows).map(|i| json!({"title": format!("post {}", i + 1)})))
            .unwrap();
        let services = Arc::new(Services::new(
            storage.clone(),
            registry,
            SchemaRegistry::new(),
            Arc::new(AllowAll),
        ));
        (storage, services)
    }

    fn status(value: &str) -> Data {
        json!({"status": value}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let (_, services) = setup(Arc::new(HookRegistry::new()), 0);
        let coordinator = BulkCoordinator::new(services, 4);

        let result = coordinator
            .bulk_update("posts", Vec::new(), status("x"), Accountability::system())
            .await;
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_item_is_a_row_failure() {
        let (storage, services) = setup(Arc::new(HookRegistry::new()), 1);
        let coordinator = BulkCoordinator::new(services, 4);

        let result = coordinator
            .bulk_update(
                "posts",
                vec![ItemId::Int(1), ItemId::Int(7)],
                status("x"),
                Accountability::system(),
            )
            .await
            .unwrap();

        assert_eq!(result.successful, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.results[1].id, ItemId::Int(7));
        assert!(result.results[1].error.is_some());
        assert_eq!(storage.rows("posts")[0]["status"], "x");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let registry = Arc::new(HookRegistry::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (current, highest) = (in_flight.clone(), peak.clone());
        registry
            .register("posts", LifecycleEvent::Update, move |_ctx: OperationContext| {
                let current = current.clone();
                let highest = highest.clone();
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    highest.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(ContextPatch::unchanged())
                }
            })
            .unwrap();

        let (_, services) = setup(registry, 8);
        let coordinator = BulkCoordinator::new(services, 2);
        let ids = (1..=8).map(ItemId::Int).collect();

        let result = coordinator
            .bulk_update("posts", ids, status("x"), Accountability::system())
            .await
            .unwrap();

        assert_eq!(result.successful, 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_veto_message_reported_verbatim() {
        let registry = Arc::new(HookRegistry::new());
        registry
            .register("posts", LifecycleEvent::Update, |_ctx: OperationContext| async move {
                Err(HookFailure::veto("locked"))
            })
            .unwrap();
        let (_, services) = setup(registry, 1);

        let result = BulkCoordinator::new(services, 1)
            .bulk_update("posts", vec![ItemId::Int(1)], status("x"), Accountability::system())
            .await
            .unwrap();

        assert_eq!(result.results[0].error.as_deref(), Some("locked"));
    }
}
