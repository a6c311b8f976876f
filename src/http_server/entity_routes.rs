//! Entity HTTP Routes
//!
//! Ordinary read/write traffic against the entity store. Writes go through
//! the write gate and fail with 503 outside Normal mode; reads are always
//! served.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiError, ApiHandler, ApiResult};
use crate::entity::{Entity, EntityError, EntityKind, EntityRef, NewEntity};

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub refs: Vec<EntityRef>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct EntityListResponse {
    pub entities: Vec<Entity>,
    pub total: usize,
}

pub fn entity_routes(state: Arc<ApiHandler>) -> Router {
    Router::new()
        .route("/entities/:kind", get(list_handler).post(create_handler))
        .route("/entities/:kind/:id", get(get_handler).put(update_handler))
        .with_state(state)
}

fn parse_kind(kind: &str) -> ApiResult<EntityKind> {
    kind.parse().map_err(ApiError::BadRequest)
}

async fn list_handler(
    State(api): State<Arc<ApiHandler>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<EntityListResponse>> {
    let entities = api.entities().list(parse_kind(&kind)?)?;
    Ok(Json(EntityListResponse {
        total: entities.len(),
        entities,
    }))
}

async fn get_handler(
    State(api): State<Arc<ApiHandler>>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<Entity>> {
    let kind = parse_kind(&kind)?;
    let entity = api
        .entities()
        .get(kind, &id)?
        .ok_or(EntityError::NotFound { kind, id })?;
    Ok(Json(entity))
}

async fn create_handler(
    State(api): State<Arc<ApiHandler>>,
    Path(kind): Path<String>,
    Json(request): Json<CreateEntityRequest>,
) -> ApiResult<(StatusCode, Json<Entity>)> {
    let entity = api.entities().create(NewEntity {
        kind: parse_kind(&kind)?,
        id: request.id,
        refs: request.refs,
        data: request.data,
    })?;
    Ok((StatusCode::CREATED, Json(entity)))
}

async fn update_handler(
    State(api): State<Arc<ApiHandler>>,
    Path((kind, id)): Path<(String, String)>,
    Json(request): Json<UpdateEntityRequest>,
) -> ApiResult<Json<Entity>> {
    let entity = api.entities().update(parse_kind(&kind)?, &id, request.data)?;
    Ok(Json(entity))
}
