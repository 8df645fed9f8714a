//! Debt ledger routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use shopkeep_core::{DebtStatus, PageRequest};
use shopkeep_db::DebtFilter;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::routes::{data, date_range, non_empty, ApiJson, ApiQuery};
use crate::services::debt_service::{DebtUpdateInput, NewDebtInput, PaymentInput};
use crate::services::DebtService;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/debts", get(list).post(create))
        .route("/api/debts/stats", get(stats))
        .route("/api/debts/{id}", get(get_by_id).put(update))
        .route("/api/debts/{id}/payments", post(add_payment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DebtListQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    customer: Option<String>,
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// GET /api/debts
async fn list(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<DebtListQuery>,
) -> ApiResult<Json<Value>> {
    let (start, end) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let filter = DebtFilter {
        start,
        end,
        customer: non_empty(query.customer.as_deref()).map(str::to_string),
        status: non_empty(query.status.as_deref())
            .map(str::parse::<DebtStatus>)
            .transpose()?,
    };

    let page = state
        .db
        .debts()
        .list(&filter, PageRequest::new(query.page, query.limit))
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": page.items,
        "pagination": {
            "total": page.total,
            "page": page.request.page,
            "pages": page.total_pages(),
            "limit": page.request.limit,
        },
    })))
}

/// GET /api/debts/stats
async fn stats(State(state): State<Arc<AppState>>, _user: CurrentUser) -> ApiResult<Json<Value>> {
    let stats = state.db.debts().stats(Utc::now()).await?;
    Ok(data(stats))
}

/// GET /api/debts/{id}
async fn get_by_id(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let debt = state.db.debts().get(&id).await?;
    Ok(data(debt))
}

/// POST /api/debts
async fn create(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<NewDebtInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let debt = DebtService::new(state).create(&user, input).await?;
    Ok((StatusCode::CREATED, data(debt)))
}

/// PUT /api/debts/{id}
async fn update(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<DebtUpdateInput>,
) -> ApiResult<Json<Value>> {
    let debt = DebtService::new(state).update(&id, input).await?;
    Ok(data(debt))
}

/// POST /api/debts/{id}/payments
async fn add_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<PaymentInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let debt = DebtService::new(state).pay(&user, &id, input).await?;
    Ok((StatusCode::CREATED, data(debt)))
}

#[cfg(test)]
mod tests {
    use crate::auth::Role;
    use crate::test_support::{send, test_state, token};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn new_debt(amount: i64) -> Value {
        json!({
            "customerId": "c-42",
            "customerName": "Cô Ba",
            "phone": "0987654321",
            "totalAmount": amount,
            "dueDate": "2030-01-15",
            "description": "Mua chịu gạo",
        })
    }

    #[tokio::test]
    async fn test_debt_lifecycle() {
        let state = test_state().await;
        let staff = token(&state, Role::Staff);

        let (status, body) =
            send(&state, Method::POST, "/api/debts", Some(&staff), Some(new_debt(200_000))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "pending");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let pay_uri = format!("/api/debts/{}/payments", id);
        let (status, body) = send(
            &state,
            Method::POST,
            &pay_uri,
            Some(&staff),
            Some(json!({ "amount": 50000, "paymentMethod": "momo" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "partial");
        assert_eq!(body["data"]["remainingAmount"], 150000);

        let (status, body) = send(
            &state,
            Method::POST,
            &pay_uri,
            Some(&staff),
            Some(json!({ "amount": 150001 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "PAYMENT_EXCEEDS_BALANCE");

        let (status, body) = send(
            &state,
            Method::POST,
            &pay_uri,
            Some(&staff),
            Some(json!({ "amount": 150000 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "paid");
        assert_eq!(body["data"]["remainingAmount"], 0);
        assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let state = test_state().await;
        let staff = token(&state, Role::Staff);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/debts",
            Some(&staff),
            Some(json!({ "customerName": "Cô Ba", "totalAmount": 1000 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_FAILED");

        let (status, _) =
            send(&state, Method::POST, "/api/debts", Some(&staff), Some(new_debt(0))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_rejects_conflicting_status() {
        let state = test_state().await;
        let staff = token(&state, Role::Staff);
        let (_, body) =
            send(&state, Method::POST, "/api/debts", Some(&staff), Some(new_debt(90_000))).await;
        let uri = format!("/api/debts/{}", body["data"]["id"].as_str().unwrap());

        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&staff),
            Some(json!({ "description": "Hẹn trả cuối tháng", "status": "pending" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], "Hẹn trả cuối tháng");

        let (status, _) =
            send(&state, Method::PUT, &uri, Some(&staff), Some(json!({ "status": "paid" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_stats_and_missing() {
        let state = test_state().await;
        let staff = token(&state, Role::Staff);
        send(&state, Method::POST, "/api/debts", Some(&staff), Some(new_debt(120_000))).await;

        let (status, body) =
            send(&state, Method::GET, "/api/debts?customer=c%C3%B4%20ba", Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["pagination"]["pages"], 1);

        let (_, body) = send(&state, Method::GET, "/api/debts/stats", Some(&staff), None).await;
        assert_eq!(body["data"]["totalDebt"], 120000);
        assert_eq!(body["data"]["totalDebts"], 1);

        let (status, _) = send(&state, Method::GET, "/api/debts/nope", Some(&staff), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
