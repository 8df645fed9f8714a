//! Service layer.
//!
//! Services hold the workflows that span more than one repository call:
//! checkout plus its debt, inventory movements plus their alerts. Route
//! handlers stay thin and call either a service or a repository directly.

pub mod debt_service;
pub mod health_service;
pub mod inventory_service;
pub mod notification_service;
pub mod order_service;

pub use debt_service::DebtService;
pub use health_service::HealthService;
pub use inventory_service::InventoryService;
pub use notification_service::NotificationService;
pub use order_service::{CheckoutInput, CheckoutResult, OrderService};
