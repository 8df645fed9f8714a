//! # Alert Rules
//!
//! Decides which notifications an inventory change produces. The database
//! layer stores them; this module only builds drafts.
//!
//! ## Emission Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  import / export committed                                              │
//! │        │                                                                │
//! │        ├──► inventory_update        always, never deduplicated         │
//! │        │                                                                │
//! │        ├──► low_stock               stock <= threshold                 │
//! │        │                                                                │
//! │        └──► (import only)                                               │
//! │             ├── expired             days_until_expiry <= 0             │
//! │             └── expiring_soon       0 < days_until_expiry <= window    │
//! │                                                                         │
//! │  Alerts carry a dedupe key {user}:{type}:{product}:{YYYY-MM-DD}, so     │
//! │  repeating the same condition on the same day refreshes one record.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::dates::{day_key, days_until};
use crate::types::{ExpiryStatus, MovementType, NotificationType};
use crate::EXPIRY_WARNING_DAYS;

/// A notification ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

impl AlertDraft {
    /// Dedupe key for this draft, or `None` for kinds that are never
    /// deduplicated.
    pub fn dedupe_key(&self, user_id: &str, product_id: &str, now: DateTime<Utc>) -> Option<String> {
        if self.kind.is_alert() {
            Some(dedupe_key(user_id, self.kind, product_id, now))
        } else {
            None
        }
    }
}

/// `{user}:{type}:{product}:{YYYY-MM-DD}`.
pub fn dedupe_key(
    user_id: &str,
    kind: NotificationType,
    product_id: &str,
    now: DateTime<Utc>,
) -> String {
    format!("{}:{}:{}:{}", user_id, kind.as_str(), product_id, day_key(now))
}

/// Routine record of an import or export.
pub fn inventory_update(
    action: MovementType,
    product_name: &str,
    quantity: i64,
    unit: &str,
    new_stock: i64,
    movement_id: &str,
) -> AlertDraft {
    let (title, message) = match action {
        MovementType::Import => (
            "Nhập kho thành công",
            format!("Đã nhập {} {} {} vào kho", quantity, unit, product_name),
        ),
        MovementType::Export => (
            "Xuất kho thành công",
            format!("Đã xuất {} {} {} khỏi kho", quantity, unit, product_name),
        ),
    };

    AlertDraft {
        kind: NotificationType::InventoryUpdate,
        title: title.to_string(),
        message,
        metadata: json!({
            "inventoryId": movement_id,
            "action": action.as_str(),
            "quantity": quantity,
            "newStock": new_stock,
        }),
    }
}

/// Low-stock alert when `stock <= threshold`.
pub fn low_stock(product_name: &str, stock: i64, threshold: i64, unit: &str) -> Option<AlertDraft> {
    if stock > threshold {
        return None;
    }
    Some(AlertDraft {
        kind: NotificationType::LowStock,
        title: "Cảnh báo tồn kho thấp".to_string(),
        message: format!("{} sắp hết hàng. Số lượng tồn: {} {}", product_name, stock, unit),
        metadata: json!({
            "currentStock": stock,
            "threshold": threshold,
        }),
    })
}

/// Expired or expiring-soon alert for a product with an expiry date.
///
/// `window_days` is the expiring-soon horizon (30 by default).
pub fn expiry(
    product_name: &str,
    expiry_date: DateTime<Utc>,
    now: DateTime<Utc>,
    window_days: i64,
) -> Option<AlertDraft> {
    let days = days_until(expiry_date, now);
    let expiry_iso = expiry_date.to_rfc3339();

    if days <= 0 {
        Some(AlertDraft {
            kind: NotificationType::Expired,
            title: "Sản phẩm đã hết hạn".to_string(),
            message: format!(
                "{} đã hết hạn sử dụng từ {} ngày trước",
                product_name,
                days.abs()
            ),
            metadata: json!({
                "expiryDate": expiry_iso,
                "daysOverdue": days.abs(),
            }),
        })
    } else if days <= window_days {
        Some(AlertDraft {
            kind: NotificationType::ExpiringSoon,
            title: "Sản phẩm sắp hết hạn".to_string(),
            message: format!(
                "{} sẽ hết hạn trong {} ngày ({})",
                product_name,
                days,
                expiry_date.format("%d/%m/%Y")
            ),
            metadata: json!({
                "expiryDate": expiry_iso,
                "daysUntilExpiry": days,
            }),
        })
    } else {
        None
    }
}

/// Classifies remaining days for the expiring-products list.
pub fn classify_expiry(remaining_days: i64) -> ExpiryStatus {
    if remaining_days < 0 {
        ExpiryStatus::Expired
    } else if remaining_days <= EXPIRY_WARNING_DAYS {
        ExpiryStatus::Warning
    } else {
        ExpiryStatus::Safe
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
