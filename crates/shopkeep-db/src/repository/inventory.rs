//! # Inventory Repository
//!
//! Append-only ledger of stock imports and exports.
//!
//! ## Import: in place or variant
//! ```text
//!   request.barcode differs from product's  ─┐
//!   request.expiry differs from product's   ─┴─► variant product
//!                                                (parent_id = source,
//!                                                 stock = quantity)
//!   otherwise ──► stock += quantity on the source product
//! ```
//!
//! The product write and the movement insert share one transaction.
//! Notifications are the caller's concern and happen after commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::product::{barcode_owner, fetch_product, insert_product, NewProduct};
use shopkeep_core::validation::{
    non_blank, stock_after_increment, stock_out_of_range, validate_movement_quantity,
};
use shopkeep_core::{
    CoreError, InventoryMovement, MovementType, Page, PageRequest, Product, MAX_STOCK,
};

const MOVEMENT_COLUMNS: &str = "id, product_id, quantity, movement_type, import_price, \
     expiry_date, supplier, unit, batch_number, note, created_by, created_at";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    product_id: String,
    quantity: i64,
    movement_type: MovementType,
    import_price: Option<i64>,
    expiry_date: Option<DateTime<Utc>>,
    supplier: Option<String>,
    unit: Option<String>,
    batch_number: Option<String>,
    note: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for InventoryMovement {
    fn from(row: MovementRow) -> Self {
        InventoryMovement {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            movement_type: row.movement_type,
            import_price: row.import_price,
            expiry_date: row.expiry_date,
            supplier: row.supplier,
            unit: row.unit,
            batch_number: row.batch_number,
            note: row.note,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// Goods received for a product.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub quantity: i64,
    pub note: Option<String>,
    /// Unit purchase price; defaults to the product cost.
    pub import_price: Option<i64>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub unit: Option<String>,
    pub batch_number: Option<String>,
    pub cost: Option<i64>,
    pub price: Option<i64>,
    pub barcode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub movement: InventoryMovement,
    /// The product that received the stock (the variant when one was made).
    pub product: Product,
    pub is_new_product: bool,
    pub new_stock: i64,
}

/// Goods taken out of stock.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub quantity: i64,
    pub note: Option<String>,
    /// Must match the product's batch when given.
    pub batch_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub movement: InventoryMovement,
    pub product: Product,
    pub new_stock: i64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub movement_type: Option<MovementType>,
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound (callers pass end of day).
    pub end: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementTotals {
    pub total_quantity: i64,
    pub count: i64,
}

/// Import/export totals over a filtered history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementSummary {
    pub import: MovementTotals,
    pub export: MovementTotals,
    /// Imported minus exported over the filtered set.
    pub current_stock: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    movement_type: MovementType,
    total_quantity: i64,
    count: i64,
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

async fn insert_movement(conn: &mut SqliteConnection, movement: &InventoryMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, product_id, quantity, movement_type, import_price, expiry_date,
            supplier, unit, batch_number, note, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .bind(movement.movement_type)
    .bind(movement.import_price)
    .bind(movement.expiry_date)
    .bind(&movement.supplier)
    .bind(&movement.unit)
    .bind(&movement.batch_number)
    .bind(&movement.note)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Applies an in-place import to `product` and writes it back.
async fn restock_in_place(
    conn: &mut SqliteConnection,
    mut product: Product,
    request: &ImportRequest,
    now: DateTime<Utc>,
) -> DbResult<Product> {
    product.stock = stock_after_increment(product.stock, request.quantity)?;
    if let Some(cost) = request.cost.filter(|c| *c > 0) {
        product.cost = cost;
    }
    if let Some(price) = request.price.filter(|p| *p > 0) {
        product.price = price;
    }
    if let Some(supplier) = non_blank(request.supplier.clone()) {
        product.supplier = Some(supplier);
    }
    if let Some(unit) = non_blank(request.unit.clone()) {
        product.unit = unit;
    }
    if let Some(batch) = non_blank(request.batch_number.clone()) {
        product.batch_number = Some(batch);
    }
    if request.expiry_date.is_some() {
        product.expiry_date = request.expiry_date;
    }
    product.updated_at = now;

    let updated = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?2, cost = ?3, price = ?4, supplier = ?5, unit = ?6,
            batch_number = ?7, expiry_date = ?8, updated_at = ?9
        WHERE id = ?1 AND stock <= ?10 - ?2
        "#,
    )
    .bind(&product.id)
    .bind(request.quantity)
    .bind(product.cost)
    .bind(product.price)
    .bind(&product.supplier)
    .bind(&product.unit)
    .bind(&product.batch_number)
    .bind(product.expiry_date)
    .bind(now)
    .bind(MAX_STOCK)
    .execute(&mut *conn)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(stock_out_of_range().into());
    }

    // Re-read: another import may have landed between our read and write.
    fetch_product(conn, &product.id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product.id.clone()))
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Receives goods for a product.
    ///
    /// ## Errors
    /// - `Rule(Validation)` for quantity <= 0
    /// - `NotFound` when the product does not exist
    /// - `UniqueViolation("barcode")` when a new barcode belongs to another product
    pub async fn import(
        &self,
        product_id: &str,
        request: &ImportRequest,
        created_by: Option<&str>,
    ) -> DbResult<ImportOutcome> {
        validate_movement_quantity(request.quantity)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let source = fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let new_barcode =
            non_blank(request.barcode.clone()).filter(|b| source.barcode.as_deref() != Some(b));
        if let Some(barcode) = &new_barcode {
            if barcode_owner(&mut tx, barcode).await?.is_some() {
                return Err(DbError::duplicate("barcode", barcode.clone()));
            }
        }

        let is_new_expiry = match (request.expiry_date, source.expiry_date) {
            (Some(requested), Some(current)) => requested != current,
            _ => false,
        };

        let (product, is_new_product) = if new_barcode.is_some() || is_new_expiry {
            let barcode = new_barcode.or_else(|| {
                source
                    .barcode
                    .as_ref()
                    .map(|old| format!("{}_{}", old, now.timestamp_millis()))
            });
            let variant = NewProduct {
                name: source.name.clone(),
                description: source.description.clone(),
                price: request.price.filter(|p| *p > 0).unwrap_or(source.price),
                cost: request.cost.filter(|c| *c > 0).unwrap_or(source.cost),
                stock: request.quantity,
                barcode,
                category: Some(source.category.clone()),
                unit: non_blank(request.unit.clone()).or(Some(source.unit.clone())),
                expiry_date: request.expiry_date.or(source.expiry_date),
                supplier: non_blank(request.supplier.clone()).or(source.supplier.clone()),
                batch_number: non_blank(request.batch_number.clone())
                    .or(source.batch_number.clone()),
                images: source.images.clone(),
                low_stock_threshold: Some(source.low_stock_threshold),
                parent_id: Some(source.id.clone()),
            };
            let created = insert_product(&mut tx, &variant, now).await?;
            debug!(source = %source.id, variant = %created.id, "Import created product variant");
            (created, true)
        } else {
            (restock_in_place(&mut tx, source, request, now).await?, false)
        };

        let movement = InventoryMovement {
            id: new_id(),
            product_id: product.id.clone(),
            quantity: request.quantity,
            movement_type: MovementType::Import,
            import_price: Some(request.import_price.filter(|p| *p > 0).unwrap_or(product.cost)),
            expiry_date: request.expiry_date.or(product.expiry_date),
            supplier: non_blank(request.supplier.clone()).or(product.supplier.clone()),
            unit: non_blank(request.unit.clone()).or(Some(product.unit.clone())),
            batch_number: non_blank(request.batch_number.clone()).or(product.batch_number.clone()),
            note: non_blank(request.note.clone()),
            created_by: created_by.map(str::to_string),
            created_at: now,
        };
        insert_movement(&mut tx, &movement).await?;

        tx.commit().await?;

        info!(
            product_id = %product.id,
            quantity = request.quantity,
            new_stock = product.stock,
            is_new_product,
            "Stock imported"
        );

        Ok(ImportOutcome {
            new_stock: product.stock,
            movement,
            product,
            is_new_product,
        })
    }

    /// Takes goods out of stock.
    ///
    /// ## Errors
    /// - `Rule(Validation)` for quantity <= 0
    /// - `NotFound` when the product does not exist
    /// - `Rule(InsufficientStock)` when stock < quantity
    /// - `Rule(BatchMismatch)` when the batch differs from the product's
    pub async fn export(
        &self,
        product_id: &str,
        request: &ExportRequest,
        created_by: Option<&str>,
    ) -> DbResult<ExportOutcome> {
        validate_movement_quantity(request.quantity)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let product = fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        if !product.can_sell(request.quantity) {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: request.quantity,
            }
            .into());
        }

        let requested_batch = non_blank(request.batch_number.clone());
        if let Some(batch) = &requested_batch {
            if product.batch_number.as_deref() != Some(batch.as_str()) {
                return Err(CoreError::BatchMismatch {
                    requested: batch.clone(),
                    actual: product.batch_number.clone().unwrap_or_default(),
                }
                .into());
            }
        }

        let updated = sqlx::query(
            "UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE id = ?1 AND stock >= ?2",
        )
        .bind(&product.id)
        .bind(request.quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: request.quantity,
            }
            .into());
        }

        let movement = InventoryMovement {
            id: new_id(),
            product_id: product.id.clone(),
            quantity: request.quantity,
            movement_type: MovementType::Export,
            import_price: None,
            expiry_date: None,
            supplier: None,
            unit: Some(product.unit.clone()),
            batch_number: requested_batch.or(product.batch_number.clone()),
            note: non_blank(request.note.clone()),
            created_by: created_by.map(str::to_string),
            created_at: now,
        };
        insert_movement(&mut tx, &movement).await?;

        let product = fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        tx.commit().await?;

        info!(product_id = %product.id, quantity = request.quantity, new_stock = product.stock,
            "Stock exported");

        Ok(ExportOutcome {
            new_stock: product.stock,
            movement,
            product,
        })
    }

    /// Movement history for one product, newest first, with totals over the
    /// whole filtered set.
    pub async fn history(
        &self,
        product_id: &str,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> DbResult<(Page<InventoryMovement>, MovementSummary)> {
        let movement_type = filter.movement_type.map(|t| t.as_str());
        let batch = non_blank(filter.batch_number.clone());

        let filter_sql = r#"
            WHERE product_id = ?1
              AND (?2 IS NULL OR movement_type = ?2)
              AND (?3 IS NULL OR created_at >= ?3)
              AND (?4 IS NULL OR created_at <= ?4)
              AND (?5 IS NULL OR batch_number = ?5)
        "#;

        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM inventory_movements {}",
            filter_sql
        ))
        .bind(product_id)
        .bind(movement_type)
        .bind(filter.start)
        .bind(filter.end)
        .bind(&batch)
        .fetch_one(&mut *conn)
        .await?;

        let sql = format!(
            "SELECT {} FROM inventory_movements {} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?6 OFFSET ?7",
            MOVEMENT_COLUMNS, filter_sql
        );
        let rows = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(product_id)
            .bind(movement_type)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&batch)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        let sums = sqlx::query_as::<_, SummaryRow>(&format!(
            "SELECT movement_type, COALESCE(SUM(quantity), 0) AS total_quantity, COUNT(*) AS count \
             FROM inventory_movements {} GROUP BY movement_type",
            filter_sql
        ))
        .bind(product_id)
        .bind(movement_type)
        .bind(filter.start)
        .bind(filter.end)
        .bind(&batch)
        .fetch_all(&mut *conn)
        .await?;

        let mut summary = MovementSummary::default();
        for row in sums {
            let totals = MovementTotals {
                total_quantity: row.total_quantity,
                count: row.count,
            };
            match row.movement_type {
                MovementType::Import => summary.import = totals,
                MovementType::Export => summary.export = totals,
            }
        }
        summary.current_stock = summary.import.total_quantity - summary.export.total_quantity;

        Ok((
            Page {
                items: rows.into_iter().map(InventoryMovement::from).collect(),
                total,
                request: page,
            },
            summary,
        ))
    }

    /// Deletes a movement record. Stock is left as it is.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM inventory_movements WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory record", id));
        }
        info!(id = %id, "Inventory record deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, product_with_barcode, test_db};
    use chrono::Duration;

    fn receive(quantity: i64) -> ImportRequest {
        ImportRequest {
            quantity,
            ..Default::default()
        }
    }

    fn take(quantity: i64) -> ExportRequest {
        ExportRequest {
            quantity,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_import_in_place_updates_product() {
        let db = test_db().await;
        let p = product_with_barcode(&db, "Sữa tươi", "8934563", 5).await;

        let outcome = db
            .inventory()
            .import(
                &p.id,
                &ImportRequest {
                    quantity: 20,
                    cost: Some(7_500),
                    price: Some(0),
                    supplier: Some("Vinamilk".to_string()),
                    barcode: Some("8934563".to_string()),
                    ..Default::default()
                },
                Some("user-1"),
            )
            .await
            .unwrap();

        assert!(!outcome.is_new_product);
        assert_eq!(outcome.new_stock, 25);
        assert_eq!(outcome.product.cost, 7_500);
        assert_eq!(outcome.product.price, 10_000);
        assert_eq!(outcome.movement.import_price, Some(7_500));
        assert_eq!(outcome.movement.supplier.as_deref(), Some("Vinamilk"));
        assert_eq!(outcome.movement.created_by.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_import_new_barcode_creates_variant() {
        let db = test_db().await;
        let p = product_with_barcode(&db, "Bánh quy", "111", 4).await;

        let outcome = db
            .inventory()
            .import(
                &p.id,
                &ImportRequest {
                    barcode: Some("222".to_string()),
                    ..receive(12)
                },
                None,
            )
            .await
            .unwrap();

        assert!(outcome.is_new_product);
        assert_eq!(outcome.product.parent_id.as_deref(), Some(p.id.as_str()));
        assert_eq!(outcome.product.barcode.as_deref(), Some("222"));
        assert_eq!(outcome.product.stock, 12);
        assert_eq!(outcome.product.name, "Bánh quy");
        assert_eq!(outcome.movement.product_id, outcome.product.id);
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_import_new_expiry_suffixes_barcode() {
        let db = test_db().await;
        let p = product_with_barcode(&db, "Sữa chua", "333", 4).await;
        let later = p.expiry_date.unwrap() + Duration::days(30);

        let outcome = db
            .inventory()
            .import(
                &p.id,
                &ImportRequest {
                    expiry_date: Some(later),
                    ..receive(6)
                },
                None,
            )
            .await
            .unwrap();

        assert!(outcome.is_new_product);
        assert!(outcome.product.barcode.unwrap().starts_with("333_"));
        assert_eq!(outcome.product.expiry_date, Some(later));
    }

    #[tokio::test]
    async fn test_import_taken_barcode_rejected() {
        let db = test_db().await;
        let a = product_with_barcode(&db, "A", "aaa", 1).await;
        product_with_barcode(&db, "B", "bbb", 1).await;

        let err = db
            .inventory()
            .import(
                &a.id,
                &ImportRequest {
                    barcode: Some("bbb".to_string()),
                    ..receive(1)
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "barcode"));
    }

    #[tokio::test]
    async fn test_import_rejects_bad_input() {
        let db = test_db().await;
        let p = product(&db, "Muối", 5_000, 1).await;
        let err = db.inventory().import(&p.id, &receive(0), None).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let err = db.inventory().import("missing", &receive(1), None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_import_stays_under_stock_ceiling() {
        let db = test_db().await;
        let p = product(&db, "Gạo ST25", 25_000, 10).await;

        let err = db
            .inventory()
            .import(&p.id, &receive(i64::MAX), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let err = db
            .inventory()
            .import(&p.id, &receive(MAX_STOCK), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let (page, _) = db
            .inventory()
            .history(&p.id, &HistoryFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 10);

        let outcome = db
            .inventory()
            .import(&p.id, &receive(MAX_STOCK - 10), None)
            .await
            .unwrap();
        assert_eq!(outcome.new_stock, MAX_STOCK);
    }

    #[tokio::test]
    async fn test_export_checks_stock_and_batch() {
        let db = test_db().await;
        let p = db
            .products()
            .insert(&NewProduct {
                name: "Dầu ăn".to_string(),
                price: 40_000,
                stock: 10,
                batch_number: Some("L01".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = db.inventory().export(&p.id, &take(11), None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::InsufficientStock { available: 10, .. })
        ));

        let err = db
            .inventory()
            .export(
                &p.id,
                &ExportRequest {
                    batch_number: Some("L02".to_string()),
                    ..take(1)
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::BatchMismatch { .. })));

        let (page, summary) = db
            .inventory()
            .history(&p.id, &HistoryFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(summary.export.count, 0);
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 10);

        let outcome = db.inventory().export(&p.id, &take(4), None).await.unwrap();
        assert_eq!(outcome.new_stock, 6);
        assert_eq!(outcome.movement.batch_number.as_deref(), Some("L01"));
        assert_eq!(outcome.movement.unit.as_deref(), Some("cái"));
    }

    #[tokio::test]
    async fn test_history_summary_and_delete() {
        let db = test_db().await;
        let p = product(&db, "Đường", 20_000, 0).await;
        db.inventory().import(&p.id, &receive(10), None).await.unwrap();
        db.inventory().import(&p.id, &receive(5), None).await.unwrap();
        let out = db.inventory().export(&p.id, &take(3), None).await.unwrap();

        let (page, summary) = db
            .inventory()
            .history(&p.id, &HistoryFilter::default(), PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].movement_type, MovementType::Export);
        assert_eq!(summary.import, MovementTotals { total_quantity: 15, count: 2 });
        assert_eq!(summary.export, MovementTotals { total_quantity: 3, count: 1 });
        assert_eq!(summary.current_stock, 12);

        let filter = HistoryFilter {
            movement_type: Some(MovementType::Import),
            ..Default::default()
        };
        let (page, summary) = db
            .inventory()
            .history(&p.id, &filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(summary.export.count, 0);

        db.inventory().delete(&out.movement.id).await.unwrap();
        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 12);
        let err = db.inventory().delete(&out.movement.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
