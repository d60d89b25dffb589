//! Bulk Update Tests
//!
//! One failing item never aborts the batch; results follow input order.

use std::sync::Arc;

use itemgate::bulk::BulkCoordinator;
use itemgate::core::{
    Accountability, CollectionSchema, ContextPatch, ItemId, LifecycleEvent, OperationContext,
    RoleRef, SchemaRegistry, UserRef,
};
use itemgate::hooks::{HookFailure, HookRegistry, HookResult};
use itemgate::items::{AllowAll, InMemoryStorage, Services};
use serde_json::json;
use uuid::Uuid;

async fn reject_second(ctx: OperationContext) -> HookResult {
    if ctx.id == Some(ItemId::Int(2)) {
        return Err(HookFailure::new("Cannot update item 2"));
    }
    Ok(ContextPatch::unchanged())
}

fn setup() -> (Arc<InMemoryStorage>, BulkCoordinator) {
    let schema = CollectionSchema::permissive("posts");
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .seed(
            &schema,
            (1..=3).map(|n| json!({"title": format!("post {}", n), "status": "draft"})),
        )
        .unwrap();

    let registry = Arc::new(HookRegistry::new());
    registry.register("posts", LifecycleEvent::Update, reject_second).unwrap();

    let services = Arc::new(Services::new(
        storage.clone(),
        registry,
        SchemaRegistry::new(),
        Arc::new(AllowAll),
    ));
    (storage, BulkCoordinator::new(services, 4))
}

fn editor() -> Accountability {
    Accountability::authenticated(UserRef::new(Uuid::new_v4()), RoleRef::new("editor"))
}

#[tokio::test]
async fn test_partial_failure_breakdown() {
    let (storage, bulk) = setup();
    let ids = vec![ItemId::Int(1), ItemId::Int(2), ItemId::Int(3)];
    let data = json!({"status": "published"}).as_object().cloned().unwrap();

    let result = bulk.bulk_update("posts", ids, data, editor()).await.unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 1);

    let order: Vec<ItemId> = result.results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(order, vec![ItemId::Int(1), ItemId::Int(2), ItemId::Int(3)]);

    assert!(result.results[0].success);
    assert!(!result.results[1].success);
    assert_eq!(result.results[1].error.as_deref(), Some("Cannot update item 2"));
    assert!(result.results[2].success);

    let rows = storage.rows("posts");
    assert_eq!(rows[0]["status"], "published");
    assert_eq!(rows[1]["status"], "draft");
    assert_eq!(rows[2]["status"], "published");
}

#[tokio::test]
async fn test_result_serialization_shape() {
    let (_storage, bulk) = setup();
    let data = json!({"status": "published"}).as_object().cloned().unwrap();

    let result = bulk
        .bulk_update("posts", vec![ItemId::Int(2), ItemId::Int(3)], data, editor())
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({
            "total": 2,
            "successful": 1,
            "failed": 1,
            "results": [
                {"id": 2, "success": false, "error": "Cannot update item 2"},
                {"id": 3, "success": true}
            ]
        })
    );
}
