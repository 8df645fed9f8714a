//! Notification emitter and per-user inbox.
//!
//! ## Emission
//! ```text
//! inventory import/export committed
//!          │
//!          ▼
//! shopkeep_core::alerts builds drafts ──► dedupe key for alert kinds
//!          │
//!          ▼
//! NotificationRepository::emit (upsert on dedupe key)
//!          │
//!          └── failure: warn! and carry on; the movement already stands
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use shopkeep_core::alerts::{self, AlertDraft};
use shopkeep_core::{InventoryMovement, MovementType, Notification, Product, NOTIFICATION_LIST_LIMIT};
use shopkeep_db::{DbResult, NewNotification};

use crate::state::AppState;

pub struct NotificationService {
    state: Arc<AppState>,
}

impl NotificationService {
    pub fn new(state: Arc<AppState>) -> Self {
        NotificationService { state }
    }

    /// Emits the notifications for a committed movement to `user_id`.
    ///
    /// Returns how many were stored. Storage failures are logged and
    /// skipped.
    pub async fn movement_alerts(
        &self,
        user_id: &str,
        product: &Product,
        movement: &InventoryMovement,
        new_stock: i64,
    ) -> usize {
        let now = Utc::now();
        let drafts = self.drafts_for(product, movement, new_stock, now);

        let mut emitted = 0;
        for draft in drafts {
            let dedupe_key = draft.dedupe_key(user_id, &product.id, now);
            let kind = draft.kind;
            let new = NewNotification {
                kind,
                title: draft.title,
                message: draft.message,
                product_id: Some(product.id.clone()),
                user_id: user_id.to_string(),
                metadata: draft.metadata,
                dedupe_key,
            };

            match self.state.db.notifications().emit(&new).await {
                Ok(_) => emitted += 1,
                Err(e) => warn!(
                    kind = %kind,
                    product_id = %product.id,
                    error = %e,
                    "Failed to store notification"
                ),
            }
        }

        debug!(product_id = %product.id, emitted, "Movement notifications emitted");
        emitted
    }

    fn drafts_for(
        &self,
        product: &Product,
        movement: &InventoryMovement,
        new_stock: i64,
        now: chrono::DateTime<Utc>,
    ) -> Vec<AlertDraft> {
        let mut drafts = vec![alerts::inventory_update(
            movement.movement_type,
            &product.name,
            movement.quantity,
            &product.unit,
            new_stock,
            &movement.id,
        )];

        drafts.extend(alerts::low_stock(
            &product.name,
            new_stock,
            product.threshold(),
            &product.unit,
        ));

        // Expiry alerts follow receipt of goods only.
        if movement.movement_type == MovementType::Import {
            if let Some(expiry_date) = product.expiry_date {
                drafts.extend(alerts::expiry(
                    &product.name,
                    expiry_date,
                    now,
                    self.state.config.alerts.expiring_soon_days,
                ));
            }
        }

        drafts
    }

    /// Latest notifications and the unread count.
    pub async fn inbox(&self, user_id: &str) -> DbResult<(Vec<Notification>, i64)> {
        let repo = self.state.db.notifications();
        let items = repo.list_for_user(user_id, NOTIFICATION_LIST_LIMIT).await?;
        let unread = repo.unread_count(user_id).await?;
        Ok((items, unread))
    }

    /// Marks one notification read and returns the remaining unread count.
    pub async fn mark_read(&self, id: &str, user_id: &str) -> DbResult<i64> {
        let repo = self.state.db.notifications();
        repo.mark_read(id, user_id).await?;
        repo.unread_count(user_id).await
    }

    pub async fn mark_all_read(&self, user_id: &str) -> DbResult<u64> {
        self.state.db.notifications().mark_all_read(user_id).await
    }

    /// Deletes one notification and returns the remaining unread count.
    pub async fn delete(&self, id: &str, user_id: &str) -> DbResult<i64> {
        let repo = self.state.db.notifications();
        repo.delete(id, user_id).await?;
        repo.unread_count(user_id).await
    }

    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        self.state.db.notifications().clear(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_product, test_state};
    use chrono::Duration;
    use shopkeep_core::NotificationType;
    use shopkeep_db::{ExportRequest, ImportRequest, NewProduct};

    #[tokio::test]
    async fn test_export_to_low_stock_emits_update_and_alert() {
        let state = test_state().await;
        let product = insert_product(&state, "Mì Hảo Hảo", 12).await;
        let outcome = state
            .db
            .inventory()
            .export(&product.id, &ExportRequest { quantity: 5, ..Default::default() }, Some("u-1"))
            .await
            .unwrap();

        let service = NotificationService::new(state.clone());
        let emitted = service
            .movement_alerts("u-1", &outcome.product, &outcome.movement, outcome.new_stock)
            .await;
        assert_eq!(emitted, 2);

        let (items, unread) = service.inbox("u-1").await.unwrap();
        assert_eq!(unread, 2);
        let kinds: Vec<_> = items.iter().map(|n| n.notification_type).collect();
        assert!(kinds.contains(&NotificationType::InventoryUpdate));
        assert!(kinds.contains(&NotificationType::LowStock));

        // Another user's inbox is untouched.
        let (other, _) = service.inbox("u-2").await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_low_stock_is_deduplicated() {
        let state = test_state().await;
        let product = insert_product(&state, "Sữa đặc", 6).await;
        let service = NotificationService::new(state.clone());

        for _ in 0..2 {
            let outcome = state
                .db
                .inventory()
                .export(&product.id, &ExportRequest { quantity: 1, ..Default::default() }, None)
                .await
                .unwrap();
            service
                .movement_alerts("u-1", &outcome.product, &outcome.movement, outcome.new_stock)
                .await;
        }

        let (items, _) = service.inbox("u-1").await.unwrap();
        let low: Vec<_> = items
            .iter()
            .filter(|n| n.notification_type == NotificationType::LowStock)
            .collect();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].metadata["currentStock"], 4);
        let updates = items
            .iter()
            .filter(|n| n.notification_type == NotificationType::InventoryUpdate)
            .count();
        assert_eq!(updates, 2);
    }

    #[tokio::test]
    async fn test_import_of_expiring_goods_raises_expiry_alert() {
        let state = test_state().await;
        let product = state
            .db
            .products()
            .insert(&NewProduct {
                name: "Sữa chua".to_string(),
                price: 7_000,
                stock: 50,
                expiry_date: Some(Utc::now() + Duration::days(5)),
                ..Default::default()
            })
            .await
            .unwrap();

        let outcome = state
            .db
            .inventory()
            .import(&product.id, &ImportRequest { quantity: 10, ..Default::default() }, None)
            .await
            .unwrap();

        let service = NotificationService::new(state.clone());
        let emitted = service
            .movement_alerts("u-1", &outcome.product, &outcome.movement, outcome.new_stock)
            .await;
        assert_eq!(emitted, 2);

        let (items, _) = service.inbox("u-1").await.unwrap();
        let expiring = items
            .iter()
            .find(|n| n.notification_type == NotificationType::ExpiringSoon)
            .unwrap();
        assert_eq!(expiring.metadata["daysUntilExpiry"], 5);
    }

    #[tokio::test]
    async fn test_mark_read_returns_remaining_unread() {
        let state = test_state().await;
        let product = insert_product(&state, "Nước mắm", 3).await;
        let outcome = state
            .db
            .inventory()
            .export(&product.id, &ExportRequest { quantity: 1, ..Default::default() }, None)
            .await
            .unwrap();

        let service = NotificationService::new(state.clone());
        service
            .movement_alerts("u-1", &outcome.product, &outcome.movement, outcome.new_stock)
            .await;

        let (items, unread) = service.inbox("u-1").await.unwrap();
        assert_eq!(unread, 2);
        assert_eq!(service.mark_read(&items[0].id, "u-1").await.unwrap(), 1);
        assert!(service.mark_read(&items[0].id, "u-2").await.is_err());

        assert_eq!(service.mark_all_read("u-1").await.unwrap(), 1);
        assert_eq!(service.clear("u-1").await.unwrap(), 2);
    }
}
