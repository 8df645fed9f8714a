//! # Debt Repository
//!
//! Customer debts and their embedded payment history.
//!
//! `remaining_amount` and `status` are stored for querying but are always
//! written from [`DebtBalance`], never from caller input.
//!
//! ## Payment Flow
//! ```text
//! BEGIN
//!  ├── load debt (paid = P)
//!  ├── DebtBalance::apply_payment(amount)  ──► exceeds? rollback
//!  ├── UPDATE debts SET paid = P + amount ... WHERE id = ? AND paid_amount = P
//!  │        └── 0 rows? someone paid concurrently, rollback
//!  ├── INSERT debt_payments
//!  └── customers.total_debt -= amount
//! COMMIT
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::customer::{adjust_total_debt, find_or_create, NewCustomer};
use crate::repository::{contains_pattern, new_id, search_key};
use shopkeep_core::debt::{default_due_date, order_debt_description, DebtBalance};
use shopkeep_core::validation::{
    non_blank, validate_phone, validate_positive, validate_required, MAX_NAME_LENGTH,
};
use shopkeep_core::{
    Debt, DebtPayment, DebtStatus, Money, Page, PageRequest, PaymentMethod, ValidationError,
    DEFAULT_DEBT_TERM_DAYS,
};

const DEBT_COLUMNS: &str = "id, customer_id, customer_name, phone, total_amount, paid_amount, \
     remaining_amount, status, due_date, description, order_number, created_by, created_at, updated_at";

/// Window used by the "due this week" statistic.
const DUE_SOON_DAYS: i64 = 7;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DebtRow {
    id: String,
    customer_id: String,
    customer_name: String,
    phone: String,
    total_amount: i64,
    paid_amount: i64,
    remaining_amount: i64,
    status: DebtStatus,
    due_date: Option<DateTime<Utc>>,
    description: String,
    order_number: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DebtRow {
    fn into_debt(self, payments: Vec<DebtPayment>) -> Debt {
        Debt {
            id: self.id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            phone: self.phone,
            total_amount: self.total_amount,
            paid_amount: self.paid_amount,
            remaining_amount: self.remaining_amount,
            status: self.status,
            due_date: self.due_date,
            description: self.description,
            order_number: self.order_number,
            created_by: self.created_by,
            payments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    debt_id: String,
    amount: i64,
    payment_method: PaymentMethod,
    note: String,
    paid_at: DateTime<Utc>,
    received_by: Option<String>,
}

impl From<PaymentRow> for DebtPayment {
    fn from(row: PaymentRow) -> Self {
        DebtPayment {
            id: row.id,
            debt_id: row.debt_id,
            amount: row.amount,
            payment_method: row.payment_method,
            note: row.note,
            paid_at: row.paid_at,
            received_by: row.received_by,
        }
    }
}

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// A manually entered debt.
#[derive(Debug, Clone, Default)]
pub struct NewDebt {
    pub customer_id: String,
    pub customer_name: String,
    pub phone: String,
    pub total_amount: i64,
    /// Defaults to now + the standard term.
    pub due_date: Option<DateTime<Utc>>,
    pub description: String,
    pub created_by: Option<String>,
}

/// A debt opened by a deferred-payment checkout.
#[derive(Debug, Clone, Default)]
pub struct OrderDebt {
    pub order_number: String,
    pub total_amount: i64,
    pub customer: NewCustomer,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DebtFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the customer name.
    pub customer: Option<String>,
    pub status: Option<DebtStatus>,
}

/// Editable debt fields. `status` is accepted only when it agrees with the
/// status derived from the amounts.
#[derive(Debug, Clone, Default)]
pub struct DebtUpdate {
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub status: Option<DebtStatus>,
}

#[derive(Debug, Clone)]
pub struct NewDebtPayment {
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub note: String,
    pub received_by: Option<String>,
}

/// Aggregates over debts that are not fully paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DebtStats {
    pub total_debt: i64,
    pub total_customers: i64,
    pub total_debts: i64,
    pub overdue_debt: i64,
    pub overdue_customers: i64,
    pub due_this_week: i64,
    pub due_this_week_customers: i64,
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

async fn fetch_payments(conn: &mut SqliteConnection, debt_id: &str) -> DbResult<Vec<DebtPayment>> {
    let rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, debt_id, amount, payment_method, note, paid_at, received_by \
         FROM debt_payments WHERE debt_id = ?1 ORDER BY paid_at, rowid",
    )
    .bind(debt_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(DebtPayment::from).collect())
}

async fn fetch_row(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<DebtRow>> {
    let sql = format!("SELECT {} FROM debts WHERE id = ?1", DEBT_COLUMNS);
    let row = sqlx::query_as::<_, DebtRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn fetch_debt(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Debt>> {
    match fetch_row(conn, id).await? {
        Some(row) => {
            let payments = fetch_payments(conn, &row.id).await?;
            Ok(Some(row.into_debt(payments)))
        }
        None => Ok(None),
    }
}

async fn insert_debt(conn: &mut SqliteConnection, debt: &Debt) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO debts (
            id, customer_id, customer_name, phone, total_amount, paid_amount, remaining_amount,
            status, due_date, description, order_number, created_by, created_at, updated_at,
            customer_name_key
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&debt.id)
    .bind(&debt.customer_id)
    .bind(&debt.customer_name)
    .bind(&debt.phone)
    .bind(debt.total_amount)
    .bind(debt.paid_amount)
    .bind(debt.remaining_amount)
    .bind(debt.status)
    .bind(debt.due_date)
    .bind(&debt.description)
    .bind(&debt.order_number)
    .bind(&debt.created_by)
    .bind(debt.created_at)
    .bind(debt.updated_at)
    .bind(search_key(&[&debt.customer_name]))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Builds an unpaid debt with status and remaining derived from the amount.
#[allow(clippy::too_many_arguments)]
fn open_debt(
    customer_id: String,
    customer_name: String,
    phone: String,
    total_amount: i64,
    due_date: Option<DateTime<Utc>>,
    description: String,
    order_number: String,
    created_by: Option<String>,
    now: DateTime<Utc>,
) -> Debt {
    let balance = DebtBalance::new(Money::new(total_amount), Money::zero());
    Debt {
        id: new_id(),
        customer_id,
        customer_name,
        phone,
        total_amount,
        paid_amount: 0,
        remaining_amount: balance.remaining().amount(),
        status: balance.status(),
        due_date: Some(due_date.unwrap_or_else(|| default_due_date(now, DEFAULT_DEBT_TERM_DAYS))),
        description,
        order_number,
        created_by,
        payments: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct DebtRepository {
    pool: SqlitePool,
}

impl DebtRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DebtRepository { pool }
    }

    /// Records a manually entered debt and adds it to the customer's running
    /// total when the customer exists.
    pub async fn create(&self, new: &NewDebt) -> DbResult<Debt> {
        let customer_id = validate_required("customerId", &new.customer_id, MAX_NAME_LENGTH)?;
        let customer_name = validate_required("customerName", &new.customer_name, MAX_NAME_LENGTH)?;
        let phone = validate_phone(&new.phone)?;
        validate_positive("totalAmount", new.total_amount)?;

        let now = Utc::now();
        let debt = open_debt(
            customer_id,
            customer_name,
            phone,
            new.total_amount,
            new.due_date,
            new.description.trim().to_string(),
            String::new(),
            new.created_by.clone(),
            now,
        );

        let mut tx = self.pool.begin().await?;
        insert_debt(&mut tx, &debt).await?;
        let linked = adjust_total_debt(&mut tx, &debt.customer_id, debt.total_amount, now).await?;
        tx.commit().await?;

        info!(id = %debt.id, amount = debt.total_amount, linked, "Debt created");
        Ok(debt)
    }

    /// Opens the debt for a deferred-payment order: finds or creates the
    /// customer by phone, records the debt and raises the customer's total.
    pub async fn create_for_order(&self, order_debt: &OrderDebt) -> DbResult<Debt> {
        validate_positive("totalAmount", order_debt.total_amount)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let customer = find_or_create(&mut tx, &order_debt.customer, now).await?;

        let debt = open_debt(
            customer.id.clone(),
            customer.name.clone(),
            customer.phone.clone(),
            order_debt.total_amount,
            order_debt.due_date,
            order_debt_description(&order_debt.order_number),
            order_debt.order_number.clone(),
            order_debt.created_by.clone(),
            now,
        );
        insert_debt(&mut tx, &debt).await?;
        adjust_total_debt(&mut tx, &customer.id, debt.total_amount, now).await?;
        tx.commit().await?;

        info!(id = %debt.id, order = %debt.order_number, customer = %customer.phone,
            amount = debt.total_amount, "Order debt created");
        Ok(debt)
    }

    /// Gets a debt with its payments.
    pub async fn get(&self, id: &str) -> DbResult<Debt> {
        let mut conn = self.pool.acquire().await?;
        fetch_debt(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Debt", id))
    }

    /// Lists debts newest first.
    pub async fn list(&self, filter: &DebtFilter, page: PageRequest) -> DbResult<Page<Debt>> {
        let status = filter.status.map(|s| s.as_str());
        let pattern = non_blank(filter.customer.clone()).map(|c| contains_pattern(&c));

        let filter_sql = r#"
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at <= ?3)
              AND (?4 IS NULL OR customer_name_key LIKE ?4 ESCAPE '\')
        "#;

        let mut conn = self.pool.acquire().await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM debts {}", filter_sql))
            .bind(status)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&pattern)
            .fetch_one(&mut *conn)
            .await?;

        let sql = format!(
            "SELECT {} FROM debts {} ORDER BY created_at DESC, rowid DESC LIMIT ?5 OFFSET ?6",
            DEBT_COLUMNS, filter_sql
        );
        let rows = sqlx::query_as::<_, DebtRow>(&sql)
            .bind(status)
            .bind(filter.start)
            .bind(filter.end)
            .bind(&pattern)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await?;

        let mut debts = Vec::with_capacity(rows.len());
        for row in rows {
            let payments = fetch_payments(&mut conn, &row.id).await?;
            debts.push(row.into_debt(payments));
        }

        Ok(Page {
            items: debts,
            total,
            request: page,
        })
    }

    /// Updates due date and description.
    pub async fn update(&self, id: &str, update: &DebtUpdate) -> DbResult<Debt> {
        let mut tx = self.pool.begin().await?;
        let row = fetch_row(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Debt", id))?;

        let derived = DebtBalance::new(Money::new(row.total_amount), Money::new(row.paid_amount))
            .status();
        if let Some(requested) = update.status {
            if requested != derived {
                return Err(ValidationError::InvalidFormat {
                    field: "status".to_string(),
                    reason: format!(
                        "status is derived from payments and is currently '{}'",
                        derived
                    ),
                }
                .into());
            }
        }

        let description = update
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .unwrap_or(row.description);

        sqlx::query(
            "UPDATE debts SET due_date = ?2, description = ?3, status = ?4, updated_at = ?5 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(update.due_date.or(row.due_date))
        .bind(&description)
        .bind(derived)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let debt = fetch_debt(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Debt", id))?;
        tx.commit().await?;

        debug!(id = %id, "Debt updated");
        Ok(debt)
    }

    /// Records a payment against a debt.
    ///
    /// ## Errors
    /// - `NotFound` when the debt does not exist
    /// - `Rule(Validation(MustBePositive))` for amount <= 0
    /// - `Rule(PaymentExceedsBalance)` when amount > remaining
    /// - `Conflict` when another payment landed first
    pub async fn add_payment(&self, id: &str, payment: &NewDebtPayment) -> DbResult<Debt> {
        let mut tx = self.pool.begin().await?;
        let row = fetch_row(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Debt", id))?;

        let before = DebtBalance::new(Money::new(row.total_amount), Money::new(row.paid_amount));
        let after = before.apply_payment(Money::new(payment.amount))?;
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE debts
            SET paid_amount = ?2, remaining_amount = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1 AND paid_amount = ?6
            "#,
        )
        .bind(id)
        .bind(after.paid.amount())
        .bind(after.remaining().amount())
        .bind(after.status())
        .bind(now)
        .bind(row.paid_amount)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::conflict("Debt", id));
        }

        sqlx::query(
            r#"
            INSERT INTO debt_payments (id, debt_id, amount, payment_method, note, paid_at, received_by)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(new_id())
        .bind(id)
        .bind(payment.amount)
        .bind(payment.payment_method)
        .bind(payment.note.trim())
        .bind(now)
        .bind(&payment.received_by)
        .execute(&mut *tx)
        .await?;

        adjust_total_debt(&mut tx, &row.customer_id, -payment.amount, now).await?;

        let debt = fetch_debt(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Debt", id))?;
        tx.commit().await?;

        info!(id = %id, amount = payment.amount, remaining = debt.remaining_amount,
            status = %debt.status, "Debt payment recorded");
        Ok(debt)
    }

    /// Aggregates over unpaid debts as of `now`.
    pub async fn stats(&self, now: DateTime<Utc>) -> DbResult<DebtStats> {
        let week_end = now + Duration::days(DUE_SOON_DAYS);
        let stats = sqlx::query_as::<_, DebtStats>(
            r#"
            SELECT
                COALESCE(SUM(remaining_amount), 0) AS total_debt,
                COUNT(DISTINCT customer_id) AS total_customers,
                COUNT(*) AS total_debts,
                COALESCE(SUM(CASE WHEN due_date < ?1 THEN remaining_amount END), 0) AS overdue_debt,
                COUNT(DISTINCT CASE WHEN due_date < ?1 THEN customer_id END) AS overdue_customers,
                COALESCE(SUM(CASE WHEN due_date >= ?1 AND due_date <= ?2
                                  THEN remaining_amount END), 0) AS due_this_week,
                COUNT(DISTINCT CASE WHEN due_date >= ?1 AND due_date <= ?2
                                    THEN customer_id END) AS due_this_week_customers
            FROM debts
            WHERE status != 'paid'
            "#,
        )
        .bind(now)
        .bind(week_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use shopkeep_core::CoreError;

    fn order_debt(phone: &str, amount: i64) -> OrderDebt {
        OrderDebt {
            order_number: "ORD-0007".to_string(),
            total_amount: amount,
            customer: NewCustomer {
                name: "Anh Minh".to_string(),
                phone: phone.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn pay(amount: i64) -> NewDebtPayment {
        NewDebtPayment {
            amount,
            payment_method: PaymentMethod::Cash,
            note: String::new(),
            received_by: Some("staff-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_order_debt_opens_customer_balance() {
        let db = test_db().await;
        let debt = db.debts().create_for_order(&order_debt("0912345678", 120_000)).await.unwrap();

        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(debt.remaining_amount, 120_000);
        assert_eq!(debt.description, "Công nợ từ đơn hàng #ORD-0007");
        assert!(debt.due_date.is_some());

        let customer = db.customers().get(&debt.customer_id).await.unwrap();
        assert_eq!(customer.total_debt, 120_000);

        // Same phone, same customer.
        let second = db.debts().create_for_order(&order_debt("0912345678", 30_000)).await.unwrap();
        assert_eq!(second.customer_id, debt.customer_id);
        let customer = db.customers().get(&debt.customer_id).await.unwrap();
        assert_eq!(customer.total_debt, 150_000);
    }

    #[tokio::test]
    async fn test_payments_derive_status() {
        let db = test_db().await;
        let debt = db.debts().create_for_order(&order_debt("0912345678", 100_000)).await.unwrap();

        let partial = db.debts().add_payment(&debt.id, &pay(40_000)).await.unwrap();
        assert_eq!(partial.status, DebtStatus::Partial);
        assert_eq!(partial.remaining_amount, 60_000);
        assert_eq!(partial.payments.len(), 1);
        assert_eq!(partial.payments[0].received_by.as_deref(), Some("staff-1"));

        let paid = db.debts().add_payment(&debt.id, &pay(60_000)).await.unwrap();
        assert_eq!(paid.status, DebtStatus::Paid);
        assert_eq!(paid.remaining_amount, 0);
        assert_eq!(paid.paid_amount, 100_000);

        let customer = db.customers().get(&debt.customer_id).await.unwrap();
        assert_eq!(customer.total_debt, 0);
    }

    #[tokio::test]
    async fn test_overpayment_rejected_without_changes() {
        let db = test_db().await;
        let debt = db.debts().create_for_order(&order_debt("0912345678", 50_000)).await.unwrap();

        let err = db.debts().add_payment(&debt.id, &pay(50_001)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::PaymentExceedsBalance {
                amount: 50_001,
                remaining: 50_000
            })
        ));
        let err = db.debts().add_payment(&debt.id, &pay(0)).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let unchanged = db.debts().get(&debt.id).await.unwrap();
        assert_eq!(unchanged.paid_amount, 0);
        assert!(unchanged.payments.is_empty());
    }

    #[tokio::test]
    async fn test_manual_debt_requires_fields() {
        let db = test_db().await;
        let err = db
            .debts()
            .create(&NewDebt {
                customer_name: "Cô Ba".to_string(),
                phone: "0988111222".to_string(),
                total_amount: 10_000,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        // Unknown customer id: debt is stored, no customer total to bump.
        let debt = db
            .debts()
            .create(&NewDebt {
                customer_id: "external-7".to_string(),
                customer_name: "Cô Ba".to_string(),
                phone: "0988111222".to_string(),
                total_amount: 10_000,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(debt.order_number, "");
        assert_eq!(debt.status, DebtStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_rejects_conflicting_status() {
        let db = test_db().await;
        let debt = db.debts().create_for_order(&order_debt("0912345678", 50_000)).await.unwrap();

        let err = db
            .debts()
            .update(
                &debt.id,
                &DebtUpdate {
                    status: Some(DebtStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        let updated = db
            .debts()
            .update(
                &debt.id,
                &DebtUpdate {
                    description: Some("  Trả cuối tháng ".to_string()),
                    status: Some(DebtStatus::Pending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Trả cuối tháng");
        assert_eq!(updated.due_date, debt.due_date);
    }

    #[tokio::test]
    async fn test_list_and_stats() {
        let db = test_db().await;
        let now = Utc::now();
        let overdue = db
            .debts()
            .create_for_order(&OrderDebt {
                due_date: Some(now - Duration::days(2)),
                ..order_debt("0911111111", 70_000)
            })
            .await
            .unwrap();
        db.debts()
            .create_for_order(&OrderDebt {
                due_date: Some(now + Duration::days(3)),
                customer: NewCustomer {
                    name: "Bà Tư".to_string(),
                    phone: "0922222222".to_string(),
                    ..Default::default()
                },
                ..order_debt("", 30_000)
            })
            .await
            .unwrap();
        let settled = db.debts().create_for_order(&order_debt("0933333333", 5_000)).await.unwrap();
        db.debts().add_payment(&settled.id, &pay(5_000)).await.unwrap();

        let stats = db.debts().stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total_debts, 2);
        assert_eq!(stats.total_debt, 100_000);
        assert_eq!(stats.total_customers, 2);
        assert_eq!(stats.overdue_debt, 70_000);
        assert_eq!(stats.overdue_customers, 1);
        assert_eq!(stats.due_this_week, 30_000);
        assert_eq!(stats.due_this_week_customers, 1);

        let filter = DebtFilter {
            customer: Some("bà".to_string()),
            ..Default::default()
        };
        let page = db.debts().list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].customer_name, "Bà Tư");

        // Non-ASCII capitals fold too.
        let filter = DebtFilter {
            customer: Some("BÀ TƯ".to_string()),
            ..Default::default()
        };
        let page = db.debts().list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].customer_name, "Bà Tư");

        let filter = DebtFilter {
            status: Some(DebtStatus::Pending),
            ..Default::default()
        };
        let page = db.debts().list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().any(|d| d.id == overdue.id));
    }
}
