//! Maintenance HTTP Routes
//!
//! - `GET /maintenance`: requested vs current status
//! - `PUT /maintenance`: request maintenance mode
//! - `DELETE /maintenance`: request normal mode
//! - `GET /maintenance/mode`: process-local mode details
//!
//! Enable and disable return as soon as the request is persisted; callers
//! poll the status until both sides agree.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::api::{ApiHandler, ApiResult};
use crate::maintenance::ModeSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatusResponse {
    pub requested_status: bool,
    pub current_status: bool,
}

pub fn maintenance_routes(state: Arc<ApiHandler>) -> Router {
    Router::new()
        .route(
            "/maintenance",
            get(status_handler).put(enable_handler).delete(disable_handler),
        )
        .route("/maintenance/mode", get(mode_handler))
        .with_state(state)
}

async fn status_handler(
    State(api): State<Arc<ApiHandler>>,
) -> ApiResult<Json<MaintenanceStatusResponse>> {
    let status = api.maintenance_status()?;
    Ok(Json(MaintenanceStatusResponse {
        requested_status: status.requested,
        current_status: status.current,
    }))
}

async fn enable_handler(State(api): State<Arc<ApiHandler>>) -> ApiResult<StatusCode> {
    api.set_maintenance(true)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn disable_handler(State(api): State<Arc<ApiHandler>>) -> ApiResult<StatusCode> {
    api.set_maintenance(false)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mode_handler(State(api): State<Arc<ApiHandler>>) -> Json<ModeSnapshot> {
    Json(api.controller().snapshot())
}
