//! # Notification Repository
//!
//! Per-user notifications. Alert kinds carry a dedupe key, and emitting the
//! same key again refreshes the existing row instead of adding a second one:
//!
//! ```text
//! INSERT ... ON CONFLICT(dedupe_key) DO UPDATE
//!     SET title, message, metadata, updated_at     (read flag untouched)
//! ```
//!
//! Rows with a NULL key never conflict, so routine updates always insert.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use shopkeep_core::{Notification, NotificationType};

const NOTIFICATION_COLUMNS: &str = "id, notification_type, title, message, product_id, user_id, \
     is_read, metadata, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    notification_type: NotificationType,
    title: String,
    message: String,
    product_id: Option<String>,
    user_id: String,
    is_read: bool,
    metadata: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            notification_type: row.notification_type,
            title: row.title,
            message: row.message,
            product_id: row.product_id,
            user_id: row.user_id,
            read: row.is_read,
            metadata: serde_json::from_str(&row.metadata)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default())),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A notification to record for one user.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub product_id: Option<String>,
    pub user_id: String,
    pub metadata: serde_json::Value,
    /// Identity for deduplication; `None` always inserts.
    pub dedupe_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Records a notification, refreshing an existing one with the same
    /// dedupe key. Returns the stored row.
    pub async fn emit(&self, new: &NewNotification) -> DbResult<Notification> {
        let now = Utc::now();
        let metadata =
            serde_json::to_string(&new.metadata).map_err(|e| DbError::Internal(e.to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO notifications (
                id, notification_type, title, message, product_id, user_id,
                is_read, metadata, dedupe_key, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?9)
            ON CONFLICT(dedupe_key) DO UPDATE SET
                title = excluded.title,
                message = excluded.message,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(new_id())
            .bind(new.kind)
            .bind(&new.title)
            .bind(&new.message)
            .bind(&new.product_id)
            .bind(&new.user_id)
            .bind(metadata)
            .bind(&new.dedupe_key)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        debug!(id = %row.id, kind = %new.kind, user = %new.user_id, "Notification emitted");
        Ok(row.into())
    }

    /// The user's most recent notifications.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = ?1 \
             ORDER BY updated_at DESC, rowid DESC LIMIT ?2",
            NOTIFICATION_COLUMNS
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    pub async fn unread_count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Marks one of the user's notifications read.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, updated_at = ?3 WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }
        Ok(())
    }

    /// Marks every unread notification of the user read. Returns how many
    /// changed.
    pub async fn mark_all_read(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, updated_at = ?2 WHERE user_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }
        Ok(())
    }

    /// Deletes all of the user's notifications. Returns how many were removed.
    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
