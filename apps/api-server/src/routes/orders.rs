//! Order routes: checkout, listing, stats and status changes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use shopkeep_core::{OrderStatus, PageRequest};
use shopkeep_db::OrderFilter;

use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiResult;
use crate::routes::{data, date_range, non_empty, page_body, ApiJson, ApiQuery};
use crate::services::{CheckoutInput, OrderService};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/stats", get(stats))
        .route("/api/orders/{id}", get(get_by_id))
        .route("/api/orders/{id}/status", patch(update_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OrderListQuery {
    status: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    search: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatsQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

/// POST /api/orders
///
/// The order stands even when its debt could not be recorded; the body
/// then reports `debtCreated: false` with `debtError`.
async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CheckoutInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let result = OrderService::new(state).checkout(&user, input).await?;

    let mut body = json!({
        "success": true,
        "data": result.order,
        "debtCreated": result.debt_created,
    });
    if let Some(debt) = result.debt {
        body["debt"] = json!(debt);
    }
    if let Some(error) = result.debt_error {
        body["debtError"] = json!(error);
    }
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /api/orders
async fn list(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> ApiResult<Json<Value>> {
    let (start, end) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let status = non_empty(query.status.as_deref())
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let filter = OrderFilter {
        status,
        start,
        end,
        search: non_empty(query.search.as_deref()).map(str::to_string),
    };
    let page = state
        .db
        .orders()
        .list(&filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(page_body(page))
}

/// GET /api/orders/stats
async fn stats(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<StatsQuery>,
) -> ApiResult<Json<Value>> {
    let (start, end) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let stats = state.db.orders().stats(start, end).await?;
    Ok(data(stats))
}

/// GET /api/orders/{id}
async fn get_by_id(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = state.db.orders().get(&id).await?;
    Ok(data(order))
}

/// PATCH /api/orders/{id}/status
async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Json<Value>> {
    let target: OrderStatus = body.status.parse()?;
    let order = state.db.orders().update_status(&id, target).await?;
    info!(order_id = %id, status = %order.status, admin = %admin.id, "Order status changed");
    Ok(data(order))
}

#[cfg(test)]
mod tests {
    use crate::auth::Role;
    use crate::test_support::{insert_product, send, test_state, token};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_checkout_and_fetch() {
        let state = test_state().await;
        let product = insert_product(&state, "Coca-Cola 390ml", 30).await;
        let staff = token(&state, Role::Staff);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/orders",
            Some(&staff),
            Some(json!({
                "items": [{ "product": product.id, "quantity": 3 }],
                "customerPayment": 50000,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["orderNumber"], "ORD-0001");
        assert_eq!(body["data"]["total"], 30000);
        assert_eq!(body["data"]["change"], 20000);
        assert_eq!(body["debtCreated"], false);

        let id = body["data"]["id"].as_str().unwrap().to_string();
        let (status, body) =
            send(&state, Method::GET, &format!("/api/orders/{}", id), Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"][0]["quantity"], 3);

        let (_, body) = send(&state, Method::GET, "/api/orders?limit=5", Some(&staff), None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["currentPage"], 1);
        assert_eq!(body["totalPages"], 1);
    }

    #[tokio::test]
    async fn test_checkout_errors() {
        let state = test_state().await;
        let product = insert_product(&state, "Pepsi", 2).await;
        let staff = token(&state, Role::Staff);

        let (status, body) =
            send(&state, Method::POST, "/api/orders", Some(&staff), Some(json!({ "items": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "EMPTY_CART");

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/orders",
            Some(&staff),
            Some(json!({ "items": [{ "product": product.id, "quantity": 5 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INSUFFICIENT_STOCK");

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/orders",
            Some(&staff),
            Some(json!({ "items": [{ "product": "missing-id", "quantity": 1 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("missing-id"));
    }

    #[tokio::test]
    async fn test_orders_require_token() {
        let state = test_state().await;
        let (status, body) = send(&state, Method::GET, "/api/orders", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_status_change_is_admin_only_and_one_way() {
        let state = test_state().await;
        let product = insert_product(&state, "Red Bull", 10).await;
        let staff = token(&state, Role::Staff);
        let admin = token(&state, Role::Admin);

        let (_, body) = send(
            &state,
            Method::POST,
            "/api/orders",
            Some(&staff),
            Some(json!({ "items": [{ "product": product.id, "quantity": 4 }] })),
        )
        .await;
        let uri = format!("/api/orders/{}/status", body["data"]["id"].as_str().unwrap());
        let cancel = json!({ "status": "CANCELLED" });

        let (status, _) = send(&state, Method::PATCH, &uri, Some(&staff), Some(cancel.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&state, Method::PATCH, &uri, Some(&admin), Some(cancel.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "CANCELLED");
        assert_eq!(state.db.products().get(&product.id).await.unwrap().stock, 10);

        let (status, body) = send(&state, Method::PATCH, &uri, Some(&admin), Some(cancel)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_STATUS_TRANSITION");

        let (status, _) =
            send(&state, Method::PATCH, &uri, Some(&admin), Some(json!({ "status": "SHIPPED" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
