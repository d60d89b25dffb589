//! # Items Service
//!
//! Collection-scoped CRUD facade and the only sanctioned path to storage.
//! Every call:
//!
//! 1. Resolves the caller's visibility filter (skipped when bypassing)
//! 2. Runs the hook pipeline for its lifecycle event
//! 3. Validates the hook-mutated payload against the schema
//! 4. Hands the final context to storage
//!
//! A pipeline failure ends the call before step 4; nothing is written.

use std::fmt;
use std::sync::Arc;

use crate::core::{
    Accountability, CoreError, CoreResult, Data, Item, ItemId, LifecycleEvent, OperationContext,
    SchemaRef,
};
use crate::observability::{log_event, Event};
use crate::query::{Filter, Query};

use super::services::{ServiceOptions, Services};

/// Per-call options for `update_one`
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Overrides the service's bypass flag for this call only
    pub bypass_permissions: Option<bool>,
}

impl UpdateOptions {
    pub fn bypassing() -> Self {
        Self {
            bypass_permissions: Some(true),
        }
    }
}

/// CRUD facade over one collection
#[derive(Clone)]
pub struct ItemsService {
    services: Arc<Services>,
    schema: SchemaRef,
    accountability: Accountability,
    bypass: bool,
}

impl ItemsService {
    pub(crate) fn new(services: Arc<Services>, schema: SchemaRef, options: ServiceOptions) -> Self {
        let bypass = options.bypassing();
        Self {
            services,
            schema,
            accountability: options.accountability,
            bypass,
        }
    }

    pub fn collection(&self) -> &str {
        &self.schema.name
    }

    pub fn accountability(&self) -> &Accountability {
        &self.accountability
    }

    pub fn bypasses_permissions(&self) -> bool {
        self.bypass
    }

    /// Rows matching `query`, after read hooks and the visibility filter
    pub async fn read_by_query(&self, query: Query) -> CoreResult<Vec<Item>> {
        query.validate()?;
        let visibility = self.visibility(LifecycleEvent::Read, self.bypass)?;

        let ctx = self
            .context(LifecycleEvent::Read, self.bypass)
            .with_query(query);
        let ctx = self.services.executor().run(ctx).await?;

        let mut query = ctx.query.unwrap_or_default();
        query.validate()?;
        if let Some(filter) = visibility {
            query.conjoin_filter(filter);
        }

        let rows = self.services.storage().query(&self.schema, &query).await?;
        Ok(rows)
    }

    /// A single row by primary key
    pub async fn read_one(&self, id: &ItemId) -> CoreResult<Item> {
        let query = Query::new()
            .with_filter(Filter::eq(self.schema.primary_key.clone(), id.to_value()))
            .with_limit(1);

        self.read_by_query(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(format!("{} {}", self.collection(), id)))
    }

    /// Insert the hook-mutated `data`, returning the new primary key
    pub async fn create_one(&self, data: Data) -> CoreResult<ItemId> {
        let visibility = self.visibility(LifecycleEvent::Create, self.bypass)?;

        let ctx = self
            .context(LifecycleEvent::Create, self.bypass)
            .with_data(data);
        let ctx = self.services.executor().run(ctx).await?;

        let data = ctx.data.unwrap_or_default();
        self.schema.validate_data(&data)?;
        if let Some(filter) = visibility {
            if !filter.matches(&data)? {
                return Err(self.deny(LifecycleEvent::Create, None));
            }
        }

        let id = self.services.storage().insert(&self.schema, data).await?;
        Ok(id)
    }

    /// Merge the hook-mutated `data` into the row keyed by the final `id`
    pub async fn update_one(&self, id: ItemId, data: Data, options: UpdateOptions) -> CoreResult<()> {
        let bypass = options.bypass_permissions.unwrap_or(self.bypass);
        let visibility = self.visibility(LifecycleEvent::Update, bypass)?;
        self.check_row(&id, LifecycleEvent::Update, visibility.as_ref())
            .await?;

        let ctx = self
            .context(LifecycleEvent::Update, bypass)
            .with_id(id.clone())
            .with_data(data);
        let ctx = self.services.executor().run(ctx).await?;

        let target = self.final_id(ctx.id)?;
        if target != id {
            self.check_row(&target, LifecycleEvent::Update, visibility.as_ref())
                .await?;
        }

        let data = ctx.data.unwrap_or_default();
        self.schema.validate_data(&data)?;

        self.services
            .storage()
            .update(&self.schema, &target, data)
            .await?;
        Ok(())
    }

    /// Delete the row keyed by the final `id`
    ///
    /// A delete hook that fails stops the hard delete; whatever the hook
    /// wrote through its own service stays written.
    pub async fn delete_one(&self, id: ItemId) -> CoreResult<()> {
        let visibility = self.visibility(LifecycleEvent::Delete, self.bypass)?;
        self.check_row(&id, LifecycleEvent::Delete, visibility.as_ref())
            .await?;

        let ctx = self
            .context(LifecycleEvent::Delete, self.bypass)
            .with_id(id.clone());
        let ctx = self.services.executor().run(ctx).await?;

        let target = self.final_id(ctx.id)?;
        if target != id {
            self.check_row(&target, LifecycleEvent::Delete, visibility.as_ref())
                .await?;
        }

        if !self.services.storage().delete(&self.schema, &target).await? {
            return Err(CoreError::not_found(format!("{} {}", self.collection(), target)));
        }
        Ok(())
    }

    fn context(&self, event: LifecycleEvent, bypass: bool) -> OperationContext {
        OperationContext::new(
            event,
            Arc::clone(&self.schema),
            self.accountability.with_bypass(bypass),
        )
    }

    fn visibility(&self, action: LifecycleEvent, bypass: bool) -> CoreResult<Option<Filter>> {
        if bypass {
            return Ok(None);
        }
        self.services
            .policy()
            .visibility_filter(self.collection(), action, &self.accountability)
    }

    fn final_id(&self, id: Option<ItemId>) -> CoreResult<ItemId> {
        id.ok_or_else(|| CoreError::internal("pipeline dropped the target id"))
    }

    /// The existing row must exist and, when filtered, match the filter
    async fn check_row(
        &self,
        id: &ItemId,
        action: LifecycleEvent,
        filter: Option<&Filter>,
    ) -> CoreResult<()> {
        let Some(filter) = filter else {
            return Ok(());
        };

        let row = self
            .services
            .storage()
            .read(&self.schema, id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("{} {}", self.collection(), id)))?;

        if filter.matches(&row)? {
            Ok(())
        } else {
            Err(self.deny(action, Some(id)))
        }
    }

    fn deny(&self, action: LifecycleEvent, id: Option<&ItemId>) -> CoreError {
        let id = id.map(ToString::to_string).unwrap_or_default();
        let role = self.accountability.role_name().unwrap_or("");
        log_event(
            Event::ItemWriteDenied,
            &[
                ("action", action.action()),
                ("collection", self.collection()),
                ("id", id.as_str()),
                ("role", role),
            ],
        );
        CoreError::permission_denied(format!("{} on {}", action.action(), self.collection()))
    }
}

impl fmt::Debug for ItemsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsService")
            .field("collection", &self.schema.name)
            .field("accountability", &self.accountability)
            .field("bypass", &self.bypass)
            .finish()
    }
}
