//! Item HTTP Routes
//!
//! Generic CRUD over any collection, each call going through an
//! `ItemsService` built for the request's accountability.
//!
//! - `GET    /items/:collection`       rows matching query params
//! - `GET    /items/:collection/:id`   one row
//! - `POST   /items/:collection`       create
//! - `PATCH  /items/:collection/:id`   update
//! - `DELETE /items/:collection/:id`   delete

use std::sync::Arc;

use axum::{
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::{CoreResult, Data, ItemId};
use crate::items::{ItemsService, ServiceOptions, Services, UpdateOptions};
use crate::query::{Filter, Query};

use super::accountability::RequestAccountability;
use super::errors::ApiError;

/// Query string of `GET /items/:collection`
///
/// `fields` and `sort` are comma separated; `filter` is a JSON object.
#[derive(Debug, Default, Deserialize)]
pub struct ItemsQueryParams {
    pub filter: Option<String>,
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ItemsQueryParams {
    pub fn into_query(self) -> CoreResult<Query> {
        let mut query = Query::new();
        if let Some(raw) = self.filter.as_deref() {
            let filter = Filter::parse(raw)?;
            if !filter.is_empty() {
                query = query.with_filter(filter);
            }
        }
        if let Some(fields) = self.fields.as_deref() {
            query = query.with_fields(split_list(fields));
        }
        if let Some(sort) = self.sort.as_deref() {
            query = query.with_sort(split_list(sort));
        }
        query.limit = self.limit;
        query.offset = self.offset;
        Ok(query)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn items_routes(services: Arc<Services>) -> Router {
    Router::new()
        .route("/items/:collection", get(list_handler).post(create_handler))
        .route(
            "/items/:collection/:id",
            get(read_handler).patch(update_handler).delete(delete_handler),
        )
        .with_state(services)
}

fn service(
    services: &Arc<Services>,
    collection: &str,
    acc: &RequestAccountability,
) -> Result<ItemsService, ApiError> {
    Ok(services.items(collection, ServiceOptions::new(acc.or_anonymous()))?)
}

fn object_body(body: Value) -> Result<Data, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

async fn list_handler(
    State(services): State<Arc<Services>>,
    Path(collection): Path<String>,
    QueryParams(params): QueryParams<ItemsQueryParams>,
    acc: RequestAccountability,
) -> Result<Json<Value>, ApiError> {
    let query = params.into_query()?;
    let rows = service(&services, &collection, &acc)?
        .read_by_query(query)
        .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn read_handler(
    State(services): State<Arc<Services>>,
    Path((collection, id)): Path<(String, String)>,
    acc: RequestAccountability,
) -> Result<Json<Value>, ApiError> {
    let item = service(&services, &collection, &acc)?
        .read_one(&ItemId::parse(&id))
        .await?;
    Ok(Json(json!({ "data": item })))
}

async fn create_handler(
    State(services): State<Arc<Services>>,
    Path(collection): Path<String>,
    acc: RequestAccountability,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let data = object_body(body)?;
    let id = service(&services, &collection, &acc)?
        .create_one(data)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": { "id": id } }))))
}

async fn update_handler(
    State(services): State<Arc<Services>>,
    Path((collection, id)): Path<(String, String)>,
    acc: RequestAccountability,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let data = object_body(body)?;
    let id = ItemId::parse(&id);
    service(&services, &collection, &acc)?
        .update_one(id.clone(), data, UpdateOptions::default())
        .await?;
    Ok(Json(json!({ "data": { "id": id } })))
}

async fn delete_handler(
    State(services): State<Arc<Services>>,
    Path((collection, id)): Path<(String, String)>,
    acc: RequestAccountability,
) -> Result<StatusCode, ApiError> {
    service(&services, &collection, &acc)?
        .delete_one(ItemId::parse(&id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
