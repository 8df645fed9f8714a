//! # Customer Repository
//!
//! Customers are identified by phone number. They are created on demand the
//! first time someone buys on credit, and carry a running `total_debt`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use shopkeep_core::validation::{non_blank, validate_phone, validate_required, MAX_NAME_LENGTH};
use shopkeep_core::Customer;

const CUSTOMER_COLUMNS: &str =
    "id, name, phone, email, address, total_debt, created_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: String,
    email: Option<String>,
    address: Option<String>,
    total_debt: i64,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            total_debt: row.total_debt,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Details used to find or create a customer.
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_by: Option<String>,
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

pub(crate) async fn fetch_by_phone(
    conn: &mut SqliteConnection,
    phone: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {} FROM customers WHERE phone = ?1", CUSTOMER_COLUMNS);
    let row = sqlx::query_as::<_, CustomerRow>(&sql)
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Customer::from))
}

/// Returns the customer with this phone, creating it if needed.
pub(crate) async fn find_or_create(
    conn: &mut SqliteConnection,
    new: &NewCustomer,
    now: DateTime<Utc>,
) -> DbResult<Customer> {
    let phone = validate_phone(&new.phone)?;
    if let Some(existing) = fetch_by_phone(conn, &phone).await? {
        return Ok(existing);
    }

    let customer = Customer {
        id: new_id(),
        name: validate_required("customerName", &new.name, MAX_NAME_LENGTH)?,
        phone,
        email: non_blank(new.email.clone()),
        address: non_blank(new.address.clone()),
        total_debt: 0,
        created_by: new.created_by.clone(),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO customers (id, name, phone, email, address, total_debt, created_by, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.address)
    .bind(&customer.created_by)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(&mut *conn)
    .await?;

    info!(id = %customer.id, phone = %customer.phone, "Customer created");
    Ok(customer)
}

/// Adds `delta` to a customer's running debt (never below zero).
/// Returns whether a customer row was updated.
pub(crate) async fn adjust_total_debt(
    conn: &mut SqliteConnection,
    customer_id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE customers SET total_debt = MAX(total_debt + ?2, 0), updated_at = ?3 WHERE id = ?1",
    )
    .bind(customer_id)
    .bind(delta)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Customer::from)
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_phone(&mut conn, phone.trim()).await
    }

    /// Finds a customer by phone or creates one.
    pub async fn find_or_create(&self, new: &NewCustomer) -> DbResult<Customer> {
        debug!(phone = %new.phone, "Finding or creating customer");
        let mut conn = self.pool.acquire().await?;
        find_or_create(&mut conn, new, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    fn walk_in(phone: &str) -> NewCustomer {
        NewCustomer {
            name: "Chị Lan".to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_find_or_create_is_keyed_by_phone() {
        let db = test_db().await;
        let first = db.customers().find_or_create(&walk_in("0901234567")).await.unwrap();
        let again = db
            .customers()
            .find_or_create(&NewCustomer {
                name: "Another name".to_string(),
                ..walk_in("0901234567")
            })
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.name, "Chị Lan");
        assert_eq!(db.customers().get(&first.id).await.unwrap().total_debt, 0);
    }

    #[tokio::test]
    async fn test_invalid_phone_rejected() {
        let db = test_db().await;
        let err = db.customers().find_or_create(&walk_in("abc")).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(_)));
    }

    #[tokio::test]
    async fn test_total_debt_never_negative() {
        let db = test_db().await;
        let c = db.customers().find_or_create(&walk_in("0907654321")).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(adjust_total_debt(&mut conn, &c.id, 50_000, Utc::now()).await.unwrap());
        assert!(adjust_total_debt(&mut conn, &c.id, -80_000, Utc::now()).await.unwrap());
        assert!(!adjust_total_debt(&mut conn, "missing", 1, Utc::now()).await.unwrap());
        drop(conn);

        assert_eq!(db.customers().get(&c.id).await.unwrap().total_debt, 0);
    }
}
