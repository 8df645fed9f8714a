//! Stock import and export.
//!
//! The repository commits the movement and the product write together;
//! notifications go out afterwards and cannot undo the movement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use shopkeep_db::{DbResult, ExportOutcome, ExportRequest, ImportOutcome, ImportRequest};

use crate::auth::CurrentUser;
use crate::services::NotificationService;
use crate::state::AppState;

/// Body of `POST /api/inventory/import/{productId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportInput {
    pub quantity: i64,
    pub note: Option<String>,
    pub import_price: Option<i64>,
    #[serde(deserialize_with = "shopkeep_core::dates::deserialize_optional")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub unit: Option<String>,
    pub batch_number: Option<String>,
    pub cost: Option<i64>,
    pub price: Option<i64>,
    pub barcode: Option<String>,
}

impl From<ImportInput> for ImportRequest {
    fn from(input: ImportInput) -> Self {
        ImportRequest {
            quantity: input.quantity,
            note: input.note,
            import_price: input.import_price,
            expiry_date: input.expiry_date,
            supplier: input.supplier,
            unit: input.unit,
            batch_number: input.batch_number,
            cost: input.cost,
            price: input.price,
            barcode: input.barcode,
        }
    }
}

/// Body of `POST /api/inventory/export/{productId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportInput {
    pub quantity: i64,
    pub note: Option<String>,
    pub batch_number: Option<String>,
}

impl From<ExportInput> for ExportRequest {
    fn from(input: ExportInput) -> Self {
        ExportRequest {
            quantity: input.quantity,
            note: input.note,
            batch_number: input.batch_number,
        }
    }
}

pub struct InventoryService {
    state: Arc<AppState>,
}

impl InventoryService {
    pub fn new(state: Arc<AppState>) -> Self {
        InventoryService { state }
    }

    pub async fn import(
        &self,
        user: &CurrentUser,
        product_id: &str,
        input: ImportInput,
    ) -> DbResult<ImportOutcome> {
        let request = ImportRequest::from(input);
        let outcome = self
            .state
            .db
            .inventory()
            .import(product_id, &request, Some(&user.id))
            .await?;

        debug!(movement_id = %outcome.movement.id, user_id = %user.id, "Import recorded");

        NotificationService::new(self.state.clone())
            .movement_alerts(&user.id, &outcome.product, &outcome.movement, outcome.new_stock)
            .await;

        Ok(outcome)
    }

    pub async fn export(
        &self,
        user: &CurrentUser,
        product_id: &str,
        input: ExportInput,
    ) -> DbResult<ExportOutcome> {
        let request = ExportRequest::from(input);
        let outcome = self
            .state
            .db
            .inventory()
            .export(product_id, &request, Some(&user.id))
            .await?;

        debug!(movement_id = %outcome.movement.id, user_id = %user.id, "Export recorded");

        NotificationService::new(self.state.clone())
            .movement_alerts(&user.id, &outcome.product, &outcome.movement, outcome.new_stock)
            .await;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_product, staff_user, test_state};
    use shopkeep_core::NotificationType;

    #[tokio::test]
    async fn test_import_notifies_acting_user() {
        let state = test_state().await;
        let product = insert_product(&state, "Bánh Oreo", 40).await;
        let service = InventoryService::new(state.clone());
        let user = staff_user();

        let outcome = service
            .import(
                &user,
                &product.id,
                ImportInput {
                    quantity: 24,
                    supplier: Some("Mondelez".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!outcome.is_new_product);
        assert_eq!(outcome.new_stock, 64);
        assert_eq!(outcome.movement.created_by.as_deref(), Some("staff-1"));

        let inbox = state.db.notifications().list_for_user(&user.id, 50).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::InventoryUpdate);
        assert_eq!(inbox[0].metadata["newStock"], 64);
    }

    #[tokio::test]
    async fn test_import_with_new_barcode_makes_variant() {
        let state = test_state().await;
        let product = insert_product(&state, "Bánh Oreo", 40).await;
        let service = InventoryService::new(state.clone());

        let outcome = service
            .import(
                &staff_user(),
                &product.id,
                ImportInput {
                    quantity: 12,
                    barcode: Some("8934567000012".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(outcome.is_new_product);
        assert_eq!(outcome.product.parent_id.as_deref(), Some(product.id.as_str()));
        assert_eq!(outcome.product.stock, 12);
        assert_eq!(state.db.products().get(&product.id).await.unwrap().stock, 40);
    }

    #[tokio::test]
    async fn test_failed_export_emits_nothing() {
        let state = test_state().await;
        let product = insert_product(&state, "Bánh Oreo", 3).await;
        let service = InventoryService::new(state.clone());
        let user = staff_user();

        let result = service
            .export(&user, &product.id, ExportInput { quantity: 5, ..Default::default() })
            .await;
        assert!(result.is_err());

        let unread = state.db.notifications().unread_count(&user.id).await.unwrap();
        assert_eq!(unread, 0);
    }
}
