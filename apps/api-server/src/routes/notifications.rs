//! Notification inbox routes, always scoped to the caller.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::services::NotificationService;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list).delete(clear))
        .route("/api/notifications/read-all", put(mark_all_read))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/notifications/{id}", delete(remove))
}

/// GET /api/notifications
async fn list(State(state): State<Arc<AppState>>, user: CurrentUser) -> ApiResult<Json<Value>> {
    let (items, unread) = NotificationService::new(state).inbox(&user.id).await?;
    Ok(Json(json!({ "success": true, "data": items, "unreadCount": unread })))
}

/// PUT /api/notifications/{id}/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let unread = NotificationService::new(state).mark_read(&id, &user.id).await?;
    Ok(Json(json!({ "success": true, "unreadCount": unread })))
}

/// PUT /api/notifications/read-all
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> ApiResult<Json<Value>> {
    NotificationService::new(state).mark_all_read(&user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Đã đánh dấu tất cả thông báo là đã đọc",
        "unreadCount": 0,
    })))
}

/// DELETE /api/notifications/{id}
async fn remove(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let unread = NotificationService::new(state).delete(&id, &user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Đã xóa thông báo",
        "unreadCount": unread,
    })))
}

/// DELETE /api/notifications
async fn clear(State(state): State<Arc<AppState>>, user: CurrentUser) -> ApiResult<Json<Value>> {
    NotificationService::new(state).clear(&user.id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Đã xóa tất cả thông báo",
        "unreadCount": 0,
    })))
}
