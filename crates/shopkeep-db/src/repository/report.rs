//! # Report Repository
//!
//! Read-only aggregates for the dashboard. Only COMPLETED orders count
//! towards revenue and sales. Days are UTC calendar days.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::product::{ProductRow, PRODUCT_COLUMNS};
use shopkeep_core::Product;

/// Products returned by the low-stock report.
const LOW_STOCK_LIMIT: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopSellingProduct {
    pub product_id: String,
    pub name: String,
    pub total_sold: i64,
    pub total_revenue: i64,
}

/// One day bucket of the sales report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    /// `YYYY-MM-DD`
    pub date: String,
    pub total_sales: i64,
    pub order_count: i64,
    pub total_items: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: i64,
    pub total_orders: i64,
    pub total_items: i64,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Revenue and order count for completed orders in `[start, end]`.
    pub async fn revenue_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total), 0), COUNT(*)
            FROM orders
            WHERE status = 'COMPLETED' AND created_at >= ?1 AND created_at <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Active products at or below `threshold`, lowest stock first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 AND stock <= ?1 \
             ORDER BY stock ASC, name ASC LIMIT ?2",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(threshold)
            .bind(LOW_STOCK_LIMIT)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Best sellers by quantity since `since`.
    pub async fn top_selling(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<TopSellingProduct>> {
        let rows = sqlx::query_as::<_, TopSellingProduct>(
            r#"
            SELECT
                oi.product_id AS product_id,
                MAX(oi.name) AS name,
                SUM(oi.quantity) AS total_sold,
                SUM(oi.total) AS total_revenue
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.status = 'COMPLETED' AND o.created_at >= ?1
            GROUP BY oi.product_id
            ORDER BY total_sold DESC, total_revenue DESC
            LIMIT ?2
            "#,
        )
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn total_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Active products whose expiry falls within the next `days` days.
    pub async fn expiring_count(&self, now: DateTime<Utc>, days: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM products
            WHERE is_active = 1 AND expiry_date IS NOT NULL
              AND expiry_date >= ?1 AND expiry_date <= ?2
            "#,
        )
        .bind(now)
        .bind(now + Duration::days(days))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Daily buckets of completed sales in `[start, end]`, oldest first.
    pub async fn daily_sales(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<(Vec<DailySales>, SalesSummary)> {
        let days = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT
                substr(o.created_at, 1, 10) AS date,
                SUM(o.total) AS total_sales,
                COUNT(*) AS order_count,
                SUM(COALESCE((SELECT SUM(quantity) FROM order_items WHERE order_id = o.id), 0))
                    AS total_items
            FROM orders o
            WHERE o.status = 'COMPLETED' AND o.created_at >= ?1 AND o.created_at <= ?2
            GROUP BY substr(o.created_at, 1, 10)
            ORDER BY date ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let summary = days.iter().fold(SalesSummary::default(), |mut acc, day| {
            acc.total_revenue += day.total_sales;
            acc.total_orders += day.order_count;
            acc.total_items += day.total_items;
            acc
        });

        Ok((days, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::{CheckoutItem, CheckoutRequest};
    use crate::repository::test_support::{product, test_db};
    use crate::repository::product::NewProduct;
    use shopkeep_core::dates::{day_key, end_of_day, start_of_day};
    use shopkeep_core::OrderStatus;

    fn cart(product_id: &str, quantity: i64) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![CheckoutItem {
                product_id: product_id.to_string(),
                quantity,
                price: None,
            }],
            customer_payment: 1_000_000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sales_reports_count_completed_only() {
        let db = test_db().await;
        let mi = product(&db, "Mì", 4_000, 50).await;
        let nuoc = product(&db, "Nước", 10_000, 50).await;

        db.orders().checkout(&cart(&mi.id, 5)).await.unwrap();
        db.orders().checkout(&cart(&nuoc.id, 1)).await.unwrap();
        let refunded = db.orders().checkout(&cart(&nuoc.id, 9)).await.unwrap();
        db.orders()
            .update_status(&refunded.id, OrderStatus::Refunded)
            .await
            .unwrap();

        let now = Utc::now();
        let (revenue, orders) = db
            .reports()
            .revenue_between(start_of_day(now), end_of_day(now))
            .await
            .unwrap();
        assert_eq!(revenue, 30_000);
        assert_eq!(orders, 2);

        let top = db
            .reports()
            .top_selling(now - Duration::days(1), 5)
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Mì");
        assert_eq!(top[0].total_sold, 5);
        assert_eq!(top[0].total_revenue, 20_000);

        let (days, summary) = db
            .reports()
            .daily_sales(now - Duration::days(30), end_of_day(now))
            .await
            .unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, day_key(now));
        assert_eq!(days[0].total_items, 6);
        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.total_revenue, 30_000);
    }

    #[tokio::test]
    async fn test_stock_reports() {
        let db = test_db().await;
        product(&db, "Nhiều", 1_000, 100).await;
        product(&db, "Ít", 1_000, 2).await;
        let gone = product(&db, "Hết", 1_000, 0).await;
        db.products()
            .insert(&NewProduct {
                name: "Sữa chua".to_string(),
                stock: 20,
                expiry_date: Some(Utc::now() + Duration::days(5)),
                ..Default::default()
            })
            .await
            .unwrap();

        let low = db.reports().low_stock(10).await.unwrap();
        assert_eq!(low.len(), 2);
        assert_eq!(low[0].id, gone.id);

        assert_eq!(db.reports().total_products().await.unwrap(), 4);
        assert_eq!(db.reports().expiring_count(Utc::now(), 30).await.unwrap(), 1);
        assert_eq!(db.reports().expiring_count(Utc::now(), 3).await.unwrap(), 0);
    }
}
