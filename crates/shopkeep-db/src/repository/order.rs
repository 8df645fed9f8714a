//! # Order Repository
//!
//! Checkout, order queries and status changes.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├── for each line:                                                    │
//! │   │     load product ──► missing?        ProductNotFound (rollback)     │
//! │   │     UPDATE stock = stock - qty WHERE stock >= qty                   │
//! │   │                 ──► 0 rows?          InsufficientStock (rollback)   │
//! │   ├── CheckoutTotals::compute (shopkeep-core)                           │
//! │   ├── next order number ──► INSERT orders (retry on UNIQUE collision)   │
//! │   └── INSERT order_items                                                │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Debt creation for deferred payment happens after commit, in
//! [`crate::repository::debt`], so a debt failure never undoes a sale.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use crate::repository::{contains_pattern, new_id, search_key};
use shopkeep_core::checkout::{
    fallback_order_number, next_order_number, plan_status_change, validate_cart, CheckoutLine,
    CheckoutTotals,
};
use shopkeep_core::validation::non_blank;
use shopkeep_core::{
    CoreError, CustomerSnapshot, Money, Order, OrderItem, OrderStatus, Page, PageRequest,
    PaymentMethod, WALK_IN_CUSTOMER_NAME,
};

/// Sequence candidates tried before falling back to random numbers.
const SEQUENCE_ATTEMPTS: usize = 3;
/// Random candidates tried after the sequence attempts.
const RANDOM_ATTEMPTS: usize = 5;

const ORDER_COLUMNS: &str = "id, order_number, subtotal, discount, total, customer_payment, \
     change_amount, payment_method, customer_name, customer_phone, customer_address, staff_id, \
     status, notes, created_at, updated_at";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    subtotal: i64,
    discount: i64,
    total: i64,
    customer_payment: i64,
    change_amount: i64,
    payment_method: PaymentMethod,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
    staff_id: Option<String>,
    status: OrderStatus,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            items,
            subtotal: self.subtotal,
            discount: self.discount,
            total: self.total,
            customer_payment: self.customer_payment,
            change: self.change_amount,
            payment_method: self.payment_method,
            customer: CustomerSnapshot {
                name: self.customer_name,
                phone: self.customer_phone,
                address: self.customer_address,
            },
            staff_id: self.staff_id,
            status: self.status,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    name: String,
    quantity: i64,
    price: i64,
    total: i64,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
        }
    }
}

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// One requested cart line.
#[derive(Debug, Clone)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price charged; the catalog price when absent.
    pub price: Option<i64>,
}

/// Everything needed to ring up a sale.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub discount: i64,
    pub customer_payment: i64,
    pub payment_method: PaymentMethod,
    pub customer: CustomerSnapshot,
    pub staff_id: Option<String>,
    pub notes: String,
}

/// Order list filters.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound (callers pass end of day).
    pub end: Option<DateTime<Utc>>,
    /// Substring of order number, customer name or phone.
    pub search: Option<String>,
}

/// Aggregates over completed orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_revenue: i64,
    pub avg_order_value: i64,
    pub total_discount: i64,
    pub total_items_sold: i64,
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT id, order_id, product_id, name, quantity, price, total \
         FROM order_items WHERE order_id = ?1 ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

async fn fetch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => {
            let items = fetch_items(conn, &row.id).await?;
            Ok(Some(row.into_order(items)))
        }
        None => Ok(None),
    }
}

async fn latest_order_number(conn: &mut SqliteConnection) -> DbResult<Option<String>> {
    let number: Option<String> = sqlx::query_scalar(
        "SELECT order_number FROM orders WHERE order_number LIKE 'ORD-%' \
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .fetch_optional(&mut *conn)
    .await?;
    Ok(number)
}

/// Inserts the order header, retrying with a new number on collision.
/// Returns the number that was stored.
async fn insert_order_header(
    conn: &mut SqliteConnection,
    order: &Order,
) -> DbResult<String> {
    let latest = latest_order_number(conn).await?;
    let mut candidate = next_order_number(latest.as_deref());

    for attempt in 0..(SEQUENCE_ATTEMPTS + RANDOM_ATTEMPTS) {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, subtotal, discount, total, customer_payment, change_amount,
                payment_method, customer_name, customer_phone, customer_address, staff_id,
                status, notes, created_at, updated_at, customer_name_key
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(&order.id)
        .bind(&candidate)
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.total)
        .bind(order.customer_payment)
        .bind(order.change)
        .bind(order.payment_method)
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(&order.staff_id)
        .bind(order.status)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(search_key(&[&order.customer.name]))
        .execute(&mut *conn)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.is_unique_violation_on("orders.order_number") => {
                warn!(order_number = %candidate, attempt, "Order number collision, retrying");
                candidate = if attempt + 1 < SEQUENCE_ATTEMPTS {
                    next_order_number(Some(&candidate))
                } else {
                    fallback_order_number(Uuid::new_v4().as_u128())
                };
            }
            Err(e) => return Err(e),
        }
    }

    Err(DbError::TransactionFailed(
        "could not allocate a unique order number".to_string(),
    ))
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Rings up a sale in one transaction.
    ///
    /// ## Errors
    /// - `Rule(EmptyCart | CartTooLarge | Validation)` for bad input
    /// - `Rule(ProductNotFound)` naming the missing id
    /// - `Rule(InsufficientStock)` naming the product and available quantity
    ///
    /// On any error no stock is touched and no order is written.
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<Order> {
        if request.items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let order_id = new_id();

        let mut lines = Vec::with_capacity(request.items.len());
        let mut items = Vec::with_capacity(request.items.len());

        // Shape checks need prices, which may come from the catalog, so
        // quantities are validated up front and prices after lookup.
        let quick: Vec<CheckoutLine> = request
            .items
            .iter()
            .map(|i| CheckoutLine::new(Money::new(i.price.unwrap_or(0)), i.quantity))
            .collect();
        validate_cart(
            &quick,
            Money::new(request.discount),
            Money::new(request.customer_payment),
        )?;

        for item in &request.items {
            let product = fetch_product(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

            if !product.can_sell(item.quantity) {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: item.quantity,
                }
                .into());
            }

            let updated = sqlx::query(
                "UPDATE products SET stock = stock - ?2, updated_at = ?3 \
                 WHERE id = ?1 AND stock >= ?2",
            )
            .bind(&product.id)
            .bind(item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(CoreError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: item.quantity,
                }
                .into());
            }

            let line = CheckoutLine::new(
                Money::new(item.price.unwrap_or(product.price)),
                item.quantity,
            );
            items.push(OrderItem {
                id: new_id(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity: line.quantity,
                price: line.price.amount(),
                total: line.total().amount(),
            });
            lines.push(line);
        }

        // Debt sales take no money at the counter.
        let payment = if request.payment_method.is_debt() {
            Money::zero()
        } else {
            Money::new(request.customer_payment)
        };
        let totals = CheckoutTotals::compute(
            &lines,
            Money::new(request.discount),
            payment,
            request.payment_method,
        );

        let customer = CustomerSnapshot {
            name: non_blank(Some(request.customer.name.clone()))
                .unwrap_or_else(|| WALK_IN_CUSTOMER_NAME.to_string()),
            phone: request.customer.phone.trim().to_string(),
            address: request.customer.address.trim().to_string(),
        };

        let mut order = Order {
            id: order_id,
            order_number: String::new(),
            items,
            subtotal: totals.subtotal.amount(),
            discount: totals.discount.amount(),
            total: totals.total.amount(),
            customer_payment: totals.customer_payment.amount(),
            change: totals.change.amount(),
            payment_method: request.payment_method,
            customer,
            staff_id: request.staff_id.clone(),
            status: OrderStatus::Completed,
            notes: request.notes.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        order.order_number = insert_order_header(&mut tx, &order).await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, name, quantity, price, total, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.total)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total = %totals.total,
            method = ?order.payment_method,
            lines = order.items.len(),
            "Checkout complete"
        );
        Ok(order)
    }

    /// Gets an order with its items.
    pub async fn get(&self, id: &str) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Lists orders newest first.
    pub async fn list(&self, filter: &OrderFilter, page: PageRequest) -> DbResult<Page<Order>> {
        let status = filter.status.map(|s| s.as_str());
        let pattern = non_blank(filter.search.clone()).map(|s| contains_pattern(&s));

        debug!(?status, start = ?filter.start, end = ?filter.end, "Listing orders");

        let filter_sql = r#"
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at <= ?3)
              AND (?4 IS NULL
                   OR order_number LIKE ?4 ESCAPE '\'
                   OR customer_name_key LIKE ?4 ESCAPE '\'
                   OR customer_phone LIKE ?4 ESCAPE '\')
        "#;

        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders {}", filter_sql))
            .bind(status)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&pattern)
            .fetch_one(&mut *conn)
            .await?;

        let sql = format!(
            "SELECT {} FROM orders {} ORDER BY created_at DESC, rowid DESC LIMIT ?5 OFFSET ?6",
            ORDER_COLUMNS, filter_sql
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&pattern)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = fetch_items(&mut conn, &row.id).await?;
            orders.push(row.into_order(items));
        }

        Ok(Page {
            items: orders,
            total,
            request: page,
        })
    }

    /// Aggregates over COMPLETED orders in an optional date range.
    pub async fn stats(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DbResult<OrderStats> {
        let mut stats: OrderStats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_orders,
                COALESCE(SUM(total), 0) AS total_revenue,
                0 AS avg_order_value,
                COALESCE(SUM(discount), 0) AS total_discount,
                COALESCE((
                    SELECT SUM(oi.quantity) FROM order_items oi
                    JOIN orders o2 ON o2.id = oi.order_id
                    WHERE o2.status = 'COMPLETED'
                      AND (?1 IS NULL OR o2.created_at >= ?1)
                      AND (?2 IS NULL OR o2.created_at <= ?2)
                ), 0) AS total_items_sold
            FROM orders
            WHERE status = 'COMPLETED'
              AND (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at <= ?2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        if stats.total_orders > 0 {
            stats.avg_order_value = stats.total_revenue / stats.total_orders;
        }
        Ok(stats)
    }

    /// Moves an order to `target`.
    ///
    /// COMPLETED → CANCELLED/REFUNDED puts every line's quantity back on its
    /// product (lines whose product no longer exists are skipped) in the
    /// same transaction as the status write.
    pub async fn update_status(&self, id: &str, target: OrderStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        let change = plan_status_change(order.status, target)?;
        let now = Utc::now();

        if change.restores_stock {
            for item in &order.items {
                let restored = sqlx::query(
                    "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
                )
                .bind(&item.product_id)
                .bind(item.quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                if restored.rows_affected() == 0 {
                    warn!(product_id = %item.product_id, order = %order.order_number,
                        "Product gone, stock not restored");
                }
            }
        }

        // Guard on the status we planned from, so two concurrent cancels
        // cannot both restore stock.
        let result = sqlx::query(
            "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(id)
        .bind(change.to)
        .bind(now)
        .bind(change.from)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidStatusTransition {
                from: change.from.to_string(),
                to: change.to.to_string(),
            }
            .into());
        }

        tx.commit().await?;

        info!(order = %order.order_number, from = %change.from, to = %change.to,
            "Order status changed");
        self.get(id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
