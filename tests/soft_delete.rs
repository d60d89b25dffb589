//! Soft Delete Tests
//!
//! The bundled posts delete hook archives the post through a permission
//! bypassing update, then vetoes the hard delete. The caller sees the veto;
//! the archive write stays.

use std::sync::Arc;

use itemgate::core::{
    Accountability, CollectionSchema, CoreError, ItemId, RoleRef, UserRef,
};
use itemgate::extensions::posts_hooks::{ARCHIVED_MESSAGE, POSTS};
use itemgate::items::{InMemoryStorage, ServiceOptions, UpdateOptions};
use itemgate::{App, Config};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Helpers
// =============================================================================

/// Authors may read and delete posts but never update them directly
fn setup() -> (Arc<InMemoryStorage>, App) {
    let config = Config::from_json_str(
        r#"{
            "permissions": {
                "rules": [
                    { "collection": "posts", "role": "author", "actions": ["read", "delete"] }
                ]
            }
        }"#,
    )
    .unwrap();

    let storage = Arc::new(InMemoryStorage::new());
    storage
        .seed(
            &CollectionSchema::permissive(POSTS),
            vec![json!({"title": "Hello", "status": "published"})],
        )
        .unwrap();

    let app = App::builder(config)
        .with_storage(storage.clone())
        .with_bundled_extensions()
        .build()
        .unwrap();

    (storage, app)
}

fn author() -> Accountability {
    Accountability::authenticated(UserRef::new(Uuid::new_v4()), RoleRef::new("author"))
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_delete_is_vetoed_with_archive_message() {
    let (_storage, app) = setup();

    let result = app
        .context()
        .items(POSTS, ServiceOptions::new(author()))
        .unwrap()
        .delete_one(ItemId::Int(1))
        .await;

    match result {
        Err(CoreError::Vetoed(e)) => assert_eq!(e.message(), ARCHIVED_MESSAGE),
        other => panic!("expected veto, got {:?}", other),
    }
}

#[tokio::test]
async fn test_row_is_archived_not_removed() {
    let (storage, app) = setup();
    let acc = author();
    let user = acc.user_id().unwrap().to_string();

    let _ = app
        .context()
        .items(POSTS, ServiceOptions::new(acc))
        .unwrap()
        .delete_one(ItemId::Int(1))
        .await;

    let rows = storage.rows(POSTS);
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_eq!(row["title"], "Hello");
    assert_eq!(row["archived"], true);
    assert_eq!(row["archived_by"], user.as_str());
    assert!(row["archived_at"].is_string());
    // the archive write went through the update chain
    assert_eq!(row["updated_by"], user.as_str());
}

#[tokio::test]
async fn test_author_cannot_update_directly() {
    let (storage, app) = setup();

    let result = app
        .context()
        .items(POSTS, ServiceOptions::new(author()))
        .unwrap()
        .update_one(
            ItemId::Int(1),
            json!({"archived": true}).as_object().cloned().unwrap(),
            UpdateOptions::default(),
        )
        .await;

    assert!(matches!(result, Err(CoreError::PermissionDenied(_))));
    assert!(storage.rows(POSTS)[0].get("archived").is_none());
}

#[tokio::test]
async fn test_delete_without_grant_runs_no_hooks() {
    let (storage, app) = setup();
    let reader = Accountability::authenticated(UserRef::new(Uuid::new_v4()), RoleRef::new("reader"));

    let result = app
        .context()
        .items(POSTS, ServiceOptions::new(reader))
        .unwrap()
        .delete_one(ItemId::Int(1))
        .await;

    assert!(matches!(result, Err(CoreError::PermissionDenied(_))));
    assert!(storage.rows(POSTS)[0].get("archived").is_none());
}

#[tokio::test]
async fn test_delete_missing_post_is_not_found() {
    let (storage, app) = setup();
    let admin = Accountability::authenticated(
        UserRef::new(Uuid::new_v4()),
        RoleRef::new("administrator"),
    );

    let result = app
        .context()
        .items(POSTS, ServiceOptions::new(admin))
        .unwrap()
        .delete_one(ItemId::Int(42))
        .await;

    assert!(matches!(result, Err(CoreError::NotFound(_))));
    assert_eq!(storage.rows(POSTS).len(), 1);
}
