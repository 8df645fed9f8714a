//! HTTP routes.
//!
//! | Prefix                | Module            | Auth                         |
//! |-----------------------|-------------------|------------------------------|
//! | `/api/health`         | [`health`]        | public                       |
//! | `/api/products`       | [`products`]      | reads public, writes admin   |
//! | `/api/orders`         | [`orders`]        | user; status change admin    |
//! | `/api/inventory`      | [`inventory`]     | user                         |
//! | `/api/debts`          | [`debts`]         | user                         |
//! | `/api/notifications`  | [`notifications`] | user, scoped to the caller   |
//! | `/api/reports`        | [`reports`]       | user                         |
//!
//! Success bodies carry `success: true`; failures use the
//! [`ApiError`](crate::error::ApiError) envelope.

pub mod debts;
pub mod health;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reports;

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use shopkeep_core::dates::{end_of_day, parse_date_input};
use shopkeep_core::{Page, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// All `/api` routes.
pub fn build_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(inventory::router())
        .merge(debts::router())
        .merge(notifications::router())
        .merge(reports::router())
}

// =============================================================================
// Extractors
// =============================================================================

/// `Json` whose rejection uses the API error envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Query` whose rejection uses the API error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ApiError::from(e))?;
        Ok(ApiQuery(value))
    }
}

// =============================================================================
// Response Bodies
// =============================================================================

/// `{ success: true, data }`
pub(crate) fn data<T: Serialize>(value: T) -> Json<Value> {
    Json(json!({ "success": true, "data": value }))
}

/// `{ success, count, total, totalPages, currentPage, data }` for list pages.
pub(crate) fn page_body<T: Serialize>(page: Page<T>) -> Json<Value> {
    Json(json!({
        "success": true,
        "count": page.items.len(),
        "total": page.total,
        "totalPages": page.total_pages(),
        "currentPage": page.request.page,
        "data": page.items,
    }))
}

// =============================================================================
// Query Helpers
// =============================================================================

/// Parses `startDate`/`endDate`; the end is inclusive of its whole day.
pub(crate) fn date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ValidationError> {
    let start = non_empty(start)
        .map(|v| parse_date_input("startDate", v))
        .transpose()?;
    let end = non_empty(end)
        .map(|v| parse_date_input("endDate", v).map(end_of_day))
        .transpose()?;
    Ok((start, end))
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
