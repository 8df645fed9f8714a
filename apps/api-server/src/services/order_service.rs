//! Checkout workflow.
//!
//! ```text
//! POST /api/orders
//!      │
//!      ▼
//! OrderRepository::checkout ── one transaction: stock, order, lines
//!      │ committed
//!      ▼
//! payment method debt + phone given?
//!      │ yes
//!      ▼
//! DebtRepository::create_for_order ── own transaction
//!      │
//!      ├── ok:     debtCreated = true, debt
//!      └── failed: debtCreated = false, debtError (order still stands)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use shopkeep_core::debt::default_due_date;
use shopkeep_core::validation::non_blank;
use shopkeep_core::{CustomerSnapshot, Debt, Order, PaymentMethod};
use shopkeep_db::{CheckoutItem, CheckoutRequest, DbResult, NewCustomer, OrderDebt};

use crate::auth::CurrentUser;
use crate::state::AppState;

/// One cart line as sent by the dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    #[serde(alias = "productId")]
    pub product: String,
    pub quantity: i64,
    /// Unit price; the catalog price when omitted.
    #[serde(default)]
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
    #[serde(deserialize_with = "shopkeep_core::dates::deserialize_optional")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutInput {
    pub items: Vec<CartLineInput>,
    pub discount: i64,
    pub customer_payment: i64,
    pub payment_method: PaymentMethod,
    pub customer: CustomerInput,
    pub notes: String,
}

/// Checkout response; the order stands even when the debt failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub order: Order,
    pub debt_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt: Option<Debt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_error: Option<String>,
}

pub struct OrderService {
    state: Arc<AppState>,
}

impl OrderService {
    pub fn new(state: Arc<AppState>) -> Self {
        OrderService { state }
    }

    /// Rings up a sale and, for debt sales with a phone number, opens the
    /// customer's debt.
    pub async fn checkout(&self, user: &CurrentUser, input: CheckoutInput) -> DbResult<CheckoutResult> {
        let request = CheckoutRequest {
            items: input
                .items
                .iter()
                .map(|line| CheckoutItem {
                    product_id: line.product.clone(),
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
            discount: input.discount,
            customer_payment: input.customer_payment,
            payment_method: input.payment_method,
            customer: CustomerSnapshot {
                name: input.customer.name.clone(),
                phone: input.customer.phone.clone(),
                address: input.customer.address.clone(),
            },
            staff_id: Some(user.id.clone()),
            notes: input.notes.clone(),
        };

        let order = self.state.db.orders().checkout(&request).await?;

        if !order.payment_method.is_debt() {
            return Ok(CheckoutResult {
                order,
                debt_created: false,
                debt: None,
                debt_error: None,
            });
        }

        if order.customer.phone.is_empty() {
            info!(order_number = %order.order_number, "Debt sale without phone, no debt recorded");
            return Ok(CheckoutResult {
                order,
                debt_created: false,
                debt: None,
                debt_error: None,
            });
        }

        let order_debt = OrderDebt {
            order_number: order.order_number.clone(),
            total_amount: order.total,
            customer: NewCustomer {
                name: order.customer.name.clone(),
                phone: order.customer.phone.clone(),
                email: non_blank(input.customer.email),
                address: non_blank(Some(order.customer.address.clone())),
                created_by: Some(user.id.clone()),
            },
            due_date: Some(input.customer.due_date.unwrap_or_else(|| {
                default_due_date(Utc::now(), self.state.config.alerts.debt_term_days)
            })),
            created_by: Some(user.id.clone()),
        };

        match self.state.db.debts().create_for_order(&order_debt).await {
            Ok(debt) => Ok(CheckoutResult {
                order,
                debt_created: true,
                debt: Some(debt),
                debt_error: None,
            }),
            Err(e) => {
                warn!(
                    order_number = %order.order_number,
                    error = %e,
                    "Order saved but debt could not be recorded"
                );
                Ok(CheckoutResult {
                    order,
                    debt_created: false,
                    debt: None,
                    debt_error: Some(e.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_product, staff_user, test_state};
    use shopkeep_core::DebtStatus;

    fn debt_sale(product_id: &str, quantity: i64, phone: &str) -> CheckoutInput {
        CheckoutInput {
            items: vec![CartLineInput {
                product: product_id.to_string(),
                quantity,
                price: None,
            }],
            payment_method: PaymentMethod::Debt,
            customer_payment: 50_000,
            customer: CustomerInput {
                name: "Chị Hoa".to_string(),
                phone: phone.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_debt_sale_opens_debt() {
        let state = test_state().await;
        let product = insert_product(&state, "Gạo ST25", 20).await;
        let service = OrderService::new(state.clone());

        let result = service
            .checkout(&staff_user(), debt_sale(&product.id, 2, "0901234567"))
            .await
            .unwrap();

        assert!(result.debt_created);
        assert!(result.debt_error.is_none());
        assert_eq!(result.order.customer_payment, 0);
        assert_eq!(result.order.change, 0);
        assert_eq!(result.order.staff_id.as_deref(), Some("staff-1"));

        let debt = result.debt.unwrap();
        assert_eq!(debt.total_amount, 20_000);
        assert_eq!(debt.remaining_amount, 20_000);
        assert_eq!(debt.status, DebtStatus::Pending);
        assert_eq!(debt.order_number, result.order.order_number);
        assert!(debt.due_date.is_some());

        let customer = state
            .db
            .customers()
            .find_by_phone("0901234567")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.total_debt, 20_000);
    }

    #[tokio::test]
    async fn test_debt_sale_without_phone_records_no_debt() {
        let state = test_state().await;
        let product = insert_product(&state, "Gạo ST25", 20).await;
        let service = OrderService::new(state.clone());

        let result = service
            .checkout(&staff_user(), debt_sale(&product.id, 1, "  "))
            .await
            .unwrap();

        assert!(!result.debt_created);
        assert!(result.debt.is_none());
        assert!(result.debt_error.is_none());
        assert_eq!(state.db.products().get(&product.id).await.unwrap().stock, 19);
    }

    #[tokio::test]
    async fn test_failed_debt_keeps_order() {
        let state = test_state().await;
        let product = insert_product(&state, "Gạo ST25", 20).await;
        let service = OrderService::new(state.clone());

        // A zero-total order cannot open a debt.
        let mut input = debt_sale(&product.id, 1, "0901234567");
        input.discount = 10_000;

        let result = service.checkout(&staff_user(), input).await.unwrap();
        assert!(!result.debt_created);
        assert!(result.debt_error.is_some());

        let saved = state.db.orders().get(&result.order.id).await.unwrap();
        assert_eq!(saved.total, 0);
    }

    #[tokio::test]
    async fn test_cash_sale_has_no_debt_fields() {
        let state = test_state().await;
        let product = insert_product(&state, "Gạo ST25", 20).await;
        let service = OrderService::new(state.clone());

        let input = CheckoutInput {
            items: vec![CartLineInput {
                product: product.id.clone(),
                quantity: 3,
                price: None,
            }],
            customer_payment: 50_000,
            ..Default::default()
        };
        let result = service.checkout(&staff_user(), input).await.unwrap();

        assert_eq!(result.order.total, 30_000);
        assert_eq!(result.order.change, 20_000);
        assert_eq!(result.order.customer.name, "Khách lẻ");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["debtCreated"], false);
        assert!(json.get("debtError").is_none());
    }
}
