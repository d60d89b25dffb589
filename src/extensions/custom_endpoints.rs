//! Custom endpoints
//!
//! Bundled endpoint extension:
//!
//! - `GET  /user-profile`               the caller's user and role
//! - `GET  /stats/:collection`          item count, administrators only
//! - `POST /bulk-update/:collection`    bulk update with per-item breakdown

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::bulk::BulkRequest;
use crate::items::ServiceOptions;
use crate::query::{Aggregate, Query};
use crate::http_server::{ApiError, RequestAccountability};

use super::{EndpointExtension, ExtensionContext};

/// Endpoint extension with profile, stats and bulk update routes
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomEndpoints;

impl EndpointExtension for CustomEndpoints {
    fn id(&self) -> &str {
        "custom-endpoints"
    }

    fn routes(&self, context: &ExtensionContext) -> Router {
        Router::new()
            .route("/user-profile", get(user_profile_handler))
            .route("/stats/:collection", get(stats_handler))
            .route("/bulk-update/:collection", post(bulk_update_handler))
            .with_state(context.clone())
    }
}

async fn user_profile_handler(acc: RequestAccountability) -> Result<Json<Value>, ApiError> {
    let acc = acc.require_user()?;
    let role = acc.role().map(|r| json!({ "id": r.id, "name": r.name }));

    let data = match acc.user() {
        Some(user) => json!({
            "id": user.id,
            "email": user.email,
            "firstName": user.first_name,
            "lastName": user.last_name,
            "role": role,
        }),
        None => return Err(ApiError::unauthorized()),
    };

    Ok(Json(json!({ "success": true, "data": data })))
}

async fn stats_handler(
    State(context): State<ExtensionContext>,
    Path(collection): Path<String>,
    acc: RequestAccountability,
) -> Result<Json<Value>, ApiError> {
    let acc = acc.require_user()?;
    if !acc.has_role(context.admin_role()) {
        return Err(ApiError::forbidden());
    }

    let rows = context
        .items(&collection, ServiceOptions::new(acc.clone()))?
        .read_by_query(Query::new().with_aggregate(Aggregate::count_all()))
        .await?;

    let total = rows
        .first()
        .and_then(|row| row.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Ok(Json(json!({
        "success": true,
        "data": { "collection": collection, "totalCount": total },
    })))
}

async fn bulk_update_handler(
    State(context): State<ExtensionContext>,
    Path(collection): Path<String>,
    acc: RequestAccountability,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    // shape errors win over missing authentication
    let request = BulkRequest::from_value(&body)?;
    let acc = acc.require_user()?;

    let result = context
        .bulk()?
        .bulk_update(&collection, request.ids, request.data, acc.clone())
        .await?;

    Ok(Json(json!({ "success": true, "data": result })))
}
