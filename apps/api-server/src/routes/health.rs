//! `GET /api/health`: liveness plus a database round trip.
//!
//! ```json
//! { "success": true,
//!   "data": { "status": "serving", "database": "serving",
//!             "message": "All systems operational", "version": "0.1.0",
//!             "serverTime": "2025-03-01T08:30:00Z" } }
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::services::health_service::ServingStatus;
use crate::services::HealthService;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/health", get(health))
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let report = HealthService::new(state).check().await;
    let serving = report.status == ServingStatus::Serving;
    let status = if serving {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(json!({ "success": serving, "data": report }))).into_response()
}
