//! Debt ledger requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use shopkeep_core::debt::default_due_date;
use shopkeep_core::{Debt, DebtStatus, PaymentMethod};
use shopkeep_db::{DbResult, DebtUpdate, NewDebt, NewDebtPayment};

use crate::auth::CurrentUser;
use crate::state::AppState;

/// Body of `POST /api/debts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDebtInput {
    pub customer_id: String,
    pub customer_name: String,
    pub phone: String,
    pub total_amount: i64,
    #[serde(deserialize_with = "shopkeep_core::dates::deserialize_optional")]
    pub due_date: Option<DateTime<Utc>>,
    pub description: String,
}

/// Body of `PUT /api/debts/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebtUpdateInput {
    #[serde(deserialize_with = "shopkeep_core::dates::deserialize_optional")]
    pub due_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub status: Option<DebtStatus>,
}

/// Body of `POST /api/debts/{id}/payments`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentInput {
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub note: String,
}

pub struct DebtService {
    state: Arc<AppState>,
}

impl DebtService {
    pub fn new(state: Arc<AppState>) -> Self {
        DebtService { state }
    }

    pub async fn create(&self, user: &CurrentUser, input: NewDebtInput) -> DbResult<Debt> {
        let due_date = input
            .due_date
            .unwrap_or_else(|| default_due_date(Utc::now(), self.state.config.alerts.debt_term_days));

        self.state
            .db
            .debts()
            .create(&NewDebt {
                customer_id: input.customer_id,
                customer_name: input.customer_name,
                phone: input.phone,
                total_amount: input.total_amount,
                due_date: Some(due_date),
                description: input.description,
                created_by: Some(user.id.clone()),
            })
            .await
    }

    pub async fn update(&self, id: &str, input: DebtUpdateInput) -> DbResult<Debt> {
        self.state
            .db
            .debts()
            .update(
                id,
                &DebtUpdate {
                    due_date: input.due_date,
                    description: input.description,
                    status: input.status,
                },
            )
            .await
    }

    /// Records a repayment received by `user`.
    pub async fn pay(&self, user: &CurrentUser, id: &str, input: PaymentInput) -> DbResult<Debt> {
        let debt = self
            .state
            .db
            .debts()
            .add_payment(
                id,
                &NewDebtPayment {
                    amount: input.amount,
                    payment_method: input.payment_method,
                    note: input.note,
                    received_by: Some(user.id.clone()),
                },
            )
            .await?;

        debug!(debt_id = %debt.id, received_by = %user.id, "Payment accepted");
        Ok(debt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{staff_user, test_state};
    use shopkeep_db::DbError;

    fn input(amount: i64) -> NewDebtInput {
        NewDebtInput {
            customer_id: "c-1".to_string(),
            customer_name: "Anh Tuấn".to_string(),
            phone: "0912345678".to_string(),
            total_amount: amount,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_uses_configured_term() {
        let state = test_state().await;
        let service = DebtService::new(state.clone());

        let before = Utc::now();
        let debt = service.create(&staff_user(), input(150_000)).await.unwrap();
        let due = debt.due_date.unwrap();
        let days = (due - before).num_days();
        assert!((29..=30).contains(&days));
        assert_eq!(debt.created_by.as_deref(), Some("staff-1"));
    }

    #[tokio::test]
    async fn test_payment_to_zero_marks_paid() {
        let state = test_state().await;
        let service = DebtService::new(state.clone());
        let debt = service.create(&staff_user(), input(100_000)).await.unwrap();

        let partial = service
            .pay(&staff_user(), &debt.id, PaymentInput { amount: 40_000, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(partial.status, DebtStatus::Partial);
        assert_eq!(partial.remaining_amount, 60_000);

        let paid = service
            .pay(&staff_user(), &debt.id, PaymentInput { amount: 60_000, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(paid.status, DebtStatus::Paid);
        assert_eq!(paid.remaining_amount, 0);
        assert_eq!(paid.payments.len(), 2);
        assert_eq!(paid.payments[0].received_by.as_deref(), Some("staff-1"));
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let state = test_state().await;
        let service = DebtService::new(state.clone());
        let debt = service.create(&staff_user(), input(100_000)).await.unwrap();

        let err = service
            .pay(&staff_user(), &debt.id, PaymentInput { amount: 100_001, ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(_)));
    }
}
