//! # Domain Types
//!
//! Core domain types used throughout Shopkeep.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │◄──│   OrderItem     │   │      Debt       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  product_id     │   │  customer_id    │       │
//! │  │  barcode        │   │  name (frozen)  │   │  total/paid     │       │
//! │  │  stock          │   │  price (frozen) │   │  payments[]     │       │
//! │  │  expiry_date    │   └────────┬────────┘   └────────▲────────┘       │
//! │  └───────▲─────────┘            │                     │                 │
//! │          │             ┌────────▼────────┐            │ (debt method)  │
//! │  ┌───────┴─────────┐   │     Order       │────────────┘                 │
//! │  │InventoryMovement│   │  order_number   │                              │
//! │  │  import/export  │   │  status         │   ┌─────────────────┐       │
//! │  └─────────────────┘   │  payment_method │   │  Notification   │       │
//! │                        └─────────────────┘   │  low_stock, ... │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (barcode, order_number) - human-readable
//!
//! JSON field names are camelCase because the dashboard is JavaScript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// A product created by an inventory import that brought in a different
/// barcode or expiry date carries `parent_id` pointing at the product it was
/// derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    pub description: Option<String>,

    /// Selling price in đồng.
    pub price: i64,

    /// Purchase cost in đồng.
    pub cost: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Barcode (EAN-13, internal code, ...). Unique when present.
    pub barcode: Option<String>,

    pub category: String,

    /// Selling unit ("cái", "hộp", "kg", ...).
    pub unit: String,

    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,

    pub supplier: Option<String>,

    pub batch_number: Option<String>,

    /// Image URLs.
    pub images: Vec<String>,

    /// Stock level at or below which a low-stock alert fires.
    pub low_stock_threshold: i64,

    /// Product this one was split from during an import, if any.
    pub parent_id: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::new(self.price)
    }

    /// Returns the purchase cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::new(self.cost)
    }

    /// Checks if `quantity` units can be taken from stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Effective low-stock threshold (falls back to the crate default when
    /// the stored value is not positive).
    pub fn threshold(&self) -> i64 {
        if self.low_stock_threshold > 0 {
            self.low_stock_threshold
        } else {
            DEFAULT_LOW_STOCK_THRESHOLD
        }
    }

    /// Checks if current stock is at or below the low-stock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.threshold()
    }
}

/// Expiry classification used by the expiring-products list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    /// Expiry date has passed.
    Expired,
    /// Expires within the warning window.
    Warning,
    /// Expires later than the warning window.
    Safe,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// Checkout always creates `Completed`; `Pending` and `Processing` exist for
/// orders imported from elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[serde(alias = "pending")]
    Pending,
    #[serde(alias = "processing")]
    Processing,
    #[serde(alias = "completed")]
    Completed,
    #[serde(alias = "cancelled")]
    Cancelled,
    #[serde(alias = "refunded")]
    Refunded,
}

impl OrderStatus {
    /// Wire/database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Completed
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse, used for query-string filters.
impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["PENDING", "PROCESSING", "COMPLETED", "CANCELLED", "REFUNDED"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer settled an order (or a debt payment).
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    #[serde(alias = "CASH")]
    Cash,
    /// MoMo e-wallet transfer.
    #[serde(alias = "MOMO")]
    Momo,
    /// Bank transfer.
    #[serde(alias = "BANKING")]
    Banking,
    /// Card on an external terminal.
    #[serde(alias = "CARD")]
    Card,
    /// Deferred payment; the order total becomes customer debt.
    #[serde(alias = "DEBT")]
    Debt,
}

impl PaymentMethod {
    /// Checks if this method defers payment into a debt record.
    #[inline]
    pub const fn is_debt(&self) -> bool {
        matches!(self, PaymentMethod::Debt)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Order
// =============================================================================

/// Customer details frozen onto an order at checkout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerSnapshot {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    pub quantity: i64,
    /// Unit price charged (frozen).
    pub price: i64,
    /// price × quantity.
    pub total: i64,
}

/// A completed (or later cancelled/refunded) sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable sequence, `ORD-0001`.
    pub order_number: String,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub discount: i64,
    /// subtotal − discount.
    pub total: i64,
    pub customer_payment: i64,
    pub change: i64,
    pub payment_method: PaymentMethod,
    pub customer: CustomerSnapshot,
    /// User who rang up the sale.
    pub staff_id: Option<String>,
    pub status: OrderStatus,
    pub notes: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer known by phone number, created the first time they buy on
/// credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Running outstanding balance across the customer's debts.
    pub total_debt: i64,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Debt
// =============================================================================

/// Repayment state of a debt. Always derived from paid vs total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// Nothing paid yet.
    Pending,
    /// Some, but not all, paid.
    Partial,
    /// Fully settled.
    Paid,
}

impl DebtStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Pending => "pending",
            DebtStatus::Partial => "partial",
            DebtStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebtStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DebtStatus::Pending),
            "partial" => Ok(DebtStatus::Partial),
            "paid" => Ok(DebtStatus::Paid),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    "pending".to_string(),
                    "partial".to_string(),
                    "paid".to_string(),
                ],
            }),
        }
    }
}

/// One repayment recorded against a debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DebtPayment {
    pub id: String,
    pub debt_id: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub note: String,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    /// User who took the payment.
    pub received_by: Option<String>,
}

/// An outstanding customer balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Debt {
    pub id: String,
    pub customer_id: String,
    /// Denormalized customer name.
    pub customer_name: String,
    /// Denormalized customer phone.
    pub phone: String,
    pub total_amount: i64,
    pub paid_amount: i64,
    /// total_amount − paid_amount.
    pub remaining_amount: i64,
    pub status: DebtStatus,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub description: String,
    /// Order this debt came from; empty for manually entered debts.
    pub order_number: String,
    pub created_by: Option<String>,
    pub payments: Vec<DebtPayment>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    /// Checks if the due date has passed while money is still owed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != DebtStatus::Paid && self.due_date.is_some_and(|due| due < now)
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Goods received into stock.
    Import,
    /// Goods taken out of stock (damage, return to supplier, internal use).
    Export,
}

impl MovementType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::Import => "import",
            MovementType::Export => "export",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "import" => Ok(MovementType::Import),
            "export" => Ok(MovementType::Export),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["import".to_string(), "export".to_string()],
            }),
        }
    }
}

/// One append-only stock movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Unit purchase price (imports only).
    pub import_price: Option<i64>,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub unit: Option<String>,
    pub batch_number: Option<String>,
    pub note: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notification
// =============================================================================

/// Kind of user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LowStock,
    ExpiringSoon,
    Expired,
    InventoryUpdate,
    Other,
}

impl NotificationType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LowStock => "low_stock",
            NotificationType::ExpiringSoon => "expiring_soon",
            NotificationType::Expired => "expired",
            NotificationType::InventoryUpdate => "inventory_update",
            NotificationType::Other => "other",
        }
    }

    /// Alerts describe a standing condition and are deduplicated per day;
    /// routine updates are not.
    pub const fn is_alert(&self) -> bool {
        matches!(
            self,
            NotificationType::LowStock | NotificationType::ExpiringSoon | NotificationType::Expired
        )
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub product_id: Option<String>,
    /// Recipient.
    pub user_id: String,
    pub read: bool,
    #[ts(type = "Record<string, unknown>")]
    pub metadata: serde_json::Value,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Pagination
// =============================================================================

/// A validated page request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Builds a page request from optional query values, falling back to
    /// page 1 and the default limit, and clamping the limit.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT);
        PageRequest { page, limit }
    }

    /// Rows to skip.
    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Number of pages needed for `total` rows.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit as i64 - 1) / self.limit as i64
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

/// One page of rows plus the unpaginated total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        self.request.total_pages(self.total)
    }

    pub fn has_next(&self) -> bool {
        (self.request.page as i64) < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.request.page > 1
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
        assert_eq!("refunded".parse::<OrderStatus>().unwrap(), OrderStatus::Refunded);
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_method_accepts_upper_case() {
        let parsed: PaymentMethod = serde_json::from_str("\"CASH\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Cash);
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Banking).unwrap(),
            "\"banking\""
        );
        assert!(PaymentMethod::Debt.is_debt());
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_notification_alert_kinds() {
        assert!(NotificationType::LowStock.is_alert());
        assert!(NotificationType::Expired.is_alert());
        assert!(!NotificationType::InventoryUpdate.is_alert());
        assert_eq!(
            serde_json::to_string(&NotificationType::ExpiringSoon).unwrap(),
            "\"expiring_soon\""
        );
    }

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let req = PageRequest::new(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(req.offset(), 0);

        let req = PageRequest::new(Some(3), Some(1000));
        assert_eq!(req.limit, MAX_PAGE_LIMIT);
        assert_eq!(req.offset(), 200);

        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!(req, PageRequest::default());
    }

    #[test]
    fn test_page_counts() {
        let req = PageRequest::new(Some(2), Some(10));
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(10), 1);
        assert_eq!(req.total_pages(21), 3);

        let page: Page<i32> = Page {
            items: vec![],
            total: 21,
            request: req,
        };
        assert!(page.has_prev());
        assert!(page.has_next());
    }

    #[test]
    fn test_debt_status_parse() {
        assert_eq!("PAID".parse::<DebtStatus>().unwrap(), DebtStatus::Paid);
        assert!("overdue".parse::<DebtStatus>().is_err());
    }
}
