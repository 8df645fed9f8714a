//! Dashboard report routes. Only completed orders count towards sales.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use shopkeep_core::dates::{end_of_day, start_of_day};
use shopkeep_core::validation::{validate_limit, validate_non_negative};
use shopkeep_core::{ValidationError, DEFAULT_LOW_STOCK_THRESHOLD, EXPIRING_SOON_DAYS};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::routes::{data, date_range, ApiQuery};
use crate::state::AppState;

const DEFAULT_TOP_SELLING_LIMIT: u32 = 5;
const DEFAULT_SALES_WINDOW_DAYS: i64 = 30;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports/revenue/today", get(revenue_today))
        .route("/api/reports/products/low-stock", get(low_stock))
        .route("/api/reports/products/top-selling", get(top_selling))
        .route("/api/reports/products/total", get(total_products))
        .route("/api/reports/products/expiring-count", get(expiring_count))
        .route("/api/reports/sales", get(sales))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LowStockQuery {
    threshold: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TopSellingQuery {
    limit: Option<u32>,
    period: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExpiringQuery {
    days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SalesQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Look-back window of the top-selling report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    fn parse(value: Option<&str>) -> Result<Self, ValidationError> {
        match value.map(str::trim) {
            None | Some("") | Some("day") => Ok(Period::Day),
            Some("week") => Ok(Period::Week),
            Some("month") => Ok(Period::Month),
            Some(_) => Err(ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: vec!["day".to_string(), "week".to_string(), "month".to_string()],
            }),
        }
    }

    /// Start of the window ending at `now`; `Day` means since midnight.
    fn since(self, now: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
        match self {
            Period::Day => start_of_day(now),
            Period::Week => now - Duration::days(7),
            Period::Month => now - Duration::days(30),
        }
    }
}

/// GET /api/reports/revenue/today
async fn revenue_today(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (revenue, order_count) = state
        .db
        .reports()
        .revenue_between(start_of_day(now), end_of_day(now))
        .await?;
    Ok(data(json!({ "revenue": revenue, "orderCount": order_count })))
}

/// GET /api/reports/products/low-stock
async fn low_stock(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<LowStockQuery>,
) -> ApiResult<Json<Value>> {
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    validate_non_negative("threshold", threshold)?;
    let products = state.db.reports().low_stock(threshold).await?;
    Ok(data(products))
}

/// GET /api/reports/products/top-selling
async fn top_selling(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<TopSellingQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_SELLING_LIMIT);
    validate_limit(limit)?;
    let since = Period::parse(query.period.as_deref())?.since(Utc::now());

    let products = state.db.reports().top_selling(since, limit).await?;
    Ok(data(products))
}

/// GET /api/reports/products/total
async fn total_products(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let total = state.db.reports().total_products().await?;
    Ok(data(json!({ "total": total })))
}

/// GET /api/reports/products/expiring-count
async fn expiring_count(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> ApiResult<Json<Value>> {
    let days = query.days.filter(|d| *d > 0).unwrap_or(EXPIRING_SOON_DAYS);
    let count = state.db.reports().expiring_count(Utc::now(), days).await?;
    Ok(data(json!({ "count": count, "expiryDays": days })))
}

/// GET /api/reports/sales
///
/// Without dates the report covers the last 30 days up to now.
async fn sales(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (start, end) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let end = end.unwrap_or(now);
    let start = start.unwrap_or_else(|| start_of_day(end - Duration::days(DEFAULT_SALES_WINDOW_DAYS)));

    let (daily, summary) = state.db.reports().daily_sales(start, end).await?;
    Ok(data(json!({
        "summary": summary,
        "dailyData": daily,
        "startDate": start,
        "endDate": end,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::test_support::{insert_product, send, test_state, token};
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse(None).unwrap(), Period::Day);
        assert_eq!(Period::parse(Some("week")).unwrap(), Period::Week);
        assert_eq!(Period::parse(Some("month")).unwrap(), Period::Month);
        assert!(Period::parse(Some("year")).is_err());

        let now = Utc::now();
        assert_eq!(Period::Week.since(now), now - Duration::days(7));
        assert!(Period::Day.since(now) <= now);
    }

    #[tokio::test]
    async fn test_reports_reflect_sales() {
        let state = test_state().await;
        let staff = token(&state, Role::Staff);
        let tea = insert_product(&state, "Trà Lipton", 20).await;
        let coffee = insert_product(&state, "Cà phê G7", 6).await;

        for (id, qty) in [(&tea.id, 2), (&coffee.id, 3), (&tea.id, 4)] {
            let (status, _) = send(
                &state,
                Method::POST,
                "/api/orders",
                Some(&staff),
                Some(json!({ "items": [{ "product": id, "quantity": qty }] })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) =
            send(&state, Method::GET, "/api/reports/revenue/today", Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["revenue"], 90000);
        assert_eq!(body["data"]["orderCount"], 3);

        let (_, body) = send(
            &state,
            Method::GET,
            "/api/reports/products/top-selling?limit=1&period=week",
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["productId"], tea.id.as_str());
        assert_eq!(body["data"][0]["totalSold"], 6);

        let (_, body) = send(
            &state,
            Method::GET,
            "/api/reports/products/low-stock?threshold=5",
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["stock"], 3);

        let (_, body) = send(&state, Method::GET, "/api/reports/sales", Some(&staff), None).await;
        assert_eq!(body["data"]["summary"]["totalRevenue"], 90000);
        assert_eq!(body["data"]["summary"]["totalItems"], 9);
        assert_eq!(body["data"]["dailyData"].as_array().unwrap().len(), 1);

        let (_, body) =
            send(&state, Method::GET, "/api/reports/products/total", Some(&staff), None).await;
        assert_eq!(body["data"]["total"], 2);
    }

    #[tokio::test]
    async fn test_reports_validate_and_require_token() {
        let state = test_state().await;
        let staff = token(&state, Role::Staff);

        let (status, _) = send(&state, Method::GET, "/api/reports/products/total", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &state,
            Method::GET,
            "/api/reports/products/top-selling?period=decade",
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            Method::GET,
            "/api/reports/products/expiring-count",
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["count"], 0);
        assert_eq!(body["data"]["expiryDays"], 30);

        let (status, _) = send(
            &state,
            Method::GET,
            "/api/reports/sales?startDate=not-a-date",
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
