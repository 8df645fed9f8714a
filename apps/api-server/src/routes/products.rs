//! Product catalog routes.
//!
//! Reads are public so the storefront can browse without a session;
//! writes need an admin token.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use shopkeep_core::alerts::classify_expiry;
use shopkeep_core::dates::{days_until, deserialize_optional, start_of_day};
use shopkeep_core::validation::{validate_limit, validate_search_query};
use shopkeep_core::{ExpiryStatus, PageRequest, Product, ValidationError};
use shopkeep_db::{NewProduct, ProductFilter, ProductSort, ProductUpdate, StockAdjustment};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::routes::{data, non_empty, page_body, ApiJson, ApiQuery};
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route("/api/products/search", get(search))
        .route("/api/products/expiring", get(expiring))
        .route("/api/products/{id}", get(get_by_id).put(update).delete(remove))
        .route("/api/products/{id}/stock", patch(update_stock))
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProductListQuery {
    category: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<u32>,
}

/// Body of `POST /api/products`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProductInput {
    name: String,
    description: Option<String>,
    price: i64,
    cost: i64,
    stock: i64,
    barcode: Option<String>,
    category: Option<String>,
    unit: Option<String>,
    #[serde(deserialize_with = "deserialize_optional")]
    expiry_date: Option<DateTime<Utc>>,
    supplier: Option<String>,
    batch_number: Option<String>,
    images: Vec<String>,
    low_stock_threshold: Option<i64>,
}

impl From<ProductInput> for NewProduct {
    fn from(input: ProductInput) -> Self {
        NewProduct {
            name: input.name,
            description: input.description,
            price: input.price,
            cost: input.cost,
            stock: input.stock,
            barcode: input.barcode,
            category: input.category,
            unit: input.unit,
            expiry_date: input.expiry_date,
            supplier: input.supplier,
            batch_number: input.batch_number,
            images: input.images,
            low_stock_threshold: input.low_stock_threshold,
            parent_id: None,
        }
    }
}

/// Body of `PUT /api/products/{id}`; absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProductUpdateInput {
    name: Option<String>,
    description: Option<String>,
    price: Option<i64>,
    cost: Option<i64>,
    stock: Option<i64>,
    barcode: Option<String>,
    category: Option<String>,
    unit: Option<String>,
    #[serde(deserialize_with = "deserialize_optional")]
    expiry_date: Option<DateTime<Utc>>,
    supplier: Option<String>,
    batch_number: Option<String>,
    images: Option<Vec<String>>,
    low_stock_threshold: Option<i64>,
    is_active: Option<bool>,
}

impl From<ProductUpdateInput> for ProductUpdate {
    fn from(input: ProductUpdateInput) -> Self {
        ProductUpdate {
            name: input.name,
            description: input.description,
            price: input.price,
            cost: input.cost,
            stock: input.stock,
            barcode: input.barcode,
            category: input.category,
            unit: input.unit,
            expiry_date: input.expiry_date,
            supplier: input.supplier,
            batch_number: input.batch_number,
            images: input.images,
            low_stock_threshold: input.low_stock_threshold,
            is_active: input.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StockBody {
    quantity: i64,
    #[serde(rename = "type")]
    direction: String,
}

fn parse_direction(value: &str) -> Result<StockAdjustment, ValidationError> {
    match value.trim() {
        "increment" => Ok(StockAdjustment::Increment),
        "decrement" => Ok(StockAdjustment::Decrement),
        _ => Err(ValidationError::NotAllowed {
            field: "type".to_string(),
            allowed: vec!["increment".to_string(), "decrement".to_string()],
        }),
    }
}

/// A product on the expiry watch list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpiringProduct {
    #[serde(flatten)]
    product: Product,
    status: ExpiryStatus,
    remaining_days: i64,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/products
async fn list(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> ApiResult<Json<Value>> {
    let filter = ProductFilter {
        category: non_empty(query.category.as_deref()).map(str::to_string),
        search: non_empty(query.search.as_deref()).map(str::to_string),
        sort: ProductSort::parse(query.sort.as_deref()),
    };
    let page = state
        .db
        .products()
        .list(&filter, PageRequest::new(query.page, query.limit))
        .await?;
    Ok(page_body(page))
}

/// GET /api/products/search
async fn search(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Value>> {
    let q = validate_search_query(query.q.as_deref().unwrap_or_default())?;
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    validate_limit(limit)?;

    let products = state.db.products().search(&q, limit).await?;
    Ok(Json(json!({
        "success": true,
        "count": products.len(),
        "data": products,
    })))
}

/// GET /api/products/expiring
async fn expiring(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let today = start_of_day(Utc::now());
    let products: Vec<ExpiringProduct> = state
        .db
        .products()
        .expiring()
        .await?
        .into_iter()
        .filter_map(|product| {
            let remaining_days = days_until(product.expiry_date?, today);
            Some(ExpiringProduct {
                product,
                status: classify_expiry(remaining_days),
                remaining_days,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": products.len(),
        "data": products,
    })))
}

/// GET /api/products/{id}
async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let product = state.db.products().get(&id).await?;
    Ok(data(product))
}

/// POST /api/products
async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<ProductInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let product = state.db.products().insert(&input.into()).await?;
    info!(product_id = %product.id, name = %product.name, admin = %admin.id, "Product created");
    Ok((StatusCode::CREATED, data(product)))
}

/// PUT /api/products/{id}
async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProductUpdateInput>,
) -> ApiResult<Json<Value>> {
    let product = state.db.products().update(&id, &input.into()).await?;
    Ok(data(product))
}

/// DELETE /api/products/{id}
///
/// Deactivates the product; orders and ledger rows keep pointing at it.
async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.products().soft_delete(&id).await?;
    info!(product_id = %id, admin = %admin.id, "Product deactivated");
    Ok(Json(json!({ "success": true, "message": "Đã xóa sản phẩm", "data": {} })))
}

/// PATCH /api/products/{id}/stock
async fn update_stock(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StockBody>,
) -> ApiResult<Json<Value>> {
    let direction = parse_direction(&body.direction)?;
    let product = state
        .db
        .products()
        .adjust_stock(&id, body.quantity, direction)
        .await?;
    Ok(data(product))
}
