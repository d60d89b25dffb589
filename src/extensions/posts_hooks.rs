//! Posts hooks
//!
//! Bundled hook extension for the `posts` collection:
//!
//! - create: stamps `created_by` and `created_at`
//! - read: non-administrators only see published posts
//! - update: stamps `updated_by` and `updated_at`
//! - delete: archives the post instead, then vetoes the hard delete

use chrono::Utc;
use serde_json::Value;

use crate::core::{
    Accountability, ContextPatch, CoreError, CoreResult, Data, LifecycleEvent, OperationContext,
};
use crate::hooks::{HookFailure, HookRegistry, HookResult};
use crate::items::{ServiceOptions, UpdateOptions};
use crate::query::Filter;

use super::{ExtensionContext, HookExtension};

pub const POSTS: &str = "posts";

/// Message of the veto raised after archiving
pub const ARCHIVED_MESSAGE: &str = "Post archived instead of deleted";

/// Hook extension for `posts`
#[derive(Debug, Clone, Copy, Default)]
pub struct PostsHooks;

impl HookExtension for PostsHooks {
    fn id(&self) -> &str {
        "posts-hooks"
    }

    fn register(&self, registry: &HookRegistry, context: &ExtensionContext) -> CoreResult<()> {
        registry.register(POSTS, LifecycleEvent::Create, stamp_created)?;

        let admin_role = context.admin_role().to_string();
        registry.register(POSTS, LifecycleEvent::Read, move |ctx: OperationContext| {
            published_only(admin_role.clone(), ctx)
        })?;

        registry.register(POSTS, LifecycleEvent::Update, stamp_updated)?;

        let extensions = context.clone();
        registry.register(POSTS, LifecycleEvent::Delete, move |ctx: OperationContext| {
            archive_instead(extensions.clone(), ctx)
        })?;

        Ok(())
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn user_value(accountability: &Accountability) -> Option<Value> {
    accountability
        .user_id()
        .map(|id| Value::String(id.to_string()))
}

async fn stamp_created(ctx: OperationContext) -> HookResult {
    let mut data = ctx.data.unwrap_or_default();
    if let Some(user) = user_value(&ctx.accountability) {
        data.insert("created_by".into(), user);
    }
    data.insert("created_at".into(), now());
    Ok(ContextPatch::data(data))
}

async fn published_only(admin_role: String, ctx: OperationContext) -> HookResult {
    if ctx.accountability.has_role(&admin_role) {
        return Ok(ContextPatch::unchanged());
    }
    let mut query = ctx.query.unwrap_or_default();
    query.conjoin_filter(Filter::eq("status", "published"));
    Ok(ContextPatch::query(query))
}

async fn stamp_updated(ctx: OperationContext) -> HookResult {
    let mut data = ctx.data.unwrap_or_default();
    if let Some(user) = user_value(&ctx.accountability) {
        data.insert("updated_by".into(), user);
    }
    data.insert("updated_at".into(), now());
    Ok(ContextPatch::data(data))
}

/// Soft delete: the archive write stands even though the delete fails
async fn archive_instead(extensions: ExtensionContext, ctx: OperationContext) -> HookResult {
    let id = ctx
        .id
        .clone()
        .ok_or_else(|| HookFailure::new("delete requested without an id"))?;

    // nothing to archive; the delete itself reports the missing row
    let existing = extensions
        .services()?
        .storage()
        .read(&ctx.schema, &id)
        .await
        .map_err(CoreError::from)?;
    if existing.is_none() {
        return Ok(ContextPatch::unchanged());
    }

    let mut archive = Data::new();
    archive.insert("archived".into(), Value::Bool(true));
    archive.insert(
        "archived_by".into(),
        user_value(&ctx.accountability).unwrap_or(Value::Null),
    );
    archive.insert("archived_at".into(), now());

    extensions
        .items(POSTS, ServiceOptions::new(ctx.accountability.clone()))?
        .update_one(id, archive, UpdateOptions::bypassing())
        .await?;

    Err(HookFailure::veto(ARCHIVED_MESSAGE))
}
