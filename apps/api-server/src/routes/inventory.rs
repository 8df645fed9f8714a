//! Inventory routes: stock import/export and the movement ledger.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use shopkeep_core::{MovementType, PageRequest};
use shopkeep_db::HistoryFilter;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::routes::{date_range, non_empty, ApiJson, ApiQuery};
use crate::services::inventory_service::{ExportInput, ImportInput};
use crate::services::InventoryService;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/inventory/import/{product_id}", post(import))
        .route("/api/inventory/export/{product_id}", post(export))
        .route("/api/inventory/history/{product_id}", get(history))
        .route("/api/inventory/{id}", delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct HistoryQuery {
    #[serde(rename = "type")]
    movement_type: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    batch_number: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

/// POST /api/inventory/import/{product_id}
async fn import(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    ApiJson(input): ApiJson<ImportInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = InventoryService::new(state)
        .import(&user, &product_id, input)
        .await?;

    let message = if outcome.is_new_product {
        "Đã tạo sản phẩm mới và nhập kho thành công"
    } else {
        "Nhập kho thành công"
    };
    let new_product = outcome.is_new_product.then_some(&outcome.product);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": outcome.movement,
            "isNewProduct": outcome.is_new_product,
            "newProduct": new_product,
            "message": message,
            "newStock": outcome.new_stock,
        })),
    ))
}

/// POST /api/inventory/export/{product_id}
async fn export(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    ApiJson(input): ApiJson<ExportInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = InventoryService::new(state)
        .export(&user, &product_id, input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": outcome.movement,
            "message": "Xuất kho thành công",
            "newStock": outcome.new_stock,
        })),
    ))
}

/// GET /api/inventory/history/{product_id}
async fn history(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(product_id): Path<String>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let (start, end) = date_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let filter = HistoryFilter {
        movement_type: non_empty(query.movement_type.as_deref())
            .map(str::parse::<MovementType>)
            .transpose()?,
        start,
        end,
        batch_number: non_empty(query.batch_number.as_deref()).map(str::to_string),
    };

    let (page, summary) = state
        .db
        .inventory()
        .history(&product_id, &filter, PageRequest::new(query.page, query.limit))
        .await?;

    let current = page.request.page as i64;
    Ok(Json(json!({
        "success": true,
        "data": {
            "docs": page.items,
            "totalDocs": page.total,
            "limit": page.request.limit,
            "page": current,
            "totalPages": page.total_pages(),
            "hasPrevPage": page.has_prev(),
            "hasNextPage": page.has_next(),
            "prevPage": page.has_prev().then_some(current - 1),
            "nextPage": page.has_next().then_some(current + 1),
        },
        "summary": summary,
    })))
}

/// DELETE /api/inventory/{id}
///
/// Removes the ledger row only; stock is left as it is.
async fn remove(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.inventory().delete(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Đã xóa lô hàng thành công" })))
}
