//! # Repository Module
//!
//! Database repository implementations for Shopkeep.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (shopkeep-api)                                                │
//! │       │                                                                 │
//! │       │  db.inventory().import(product_id, &request, user)             │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                   │
//! │  ├── begin transaction                                                 │
//! │  ├── load product, apply core rules                                    │
//! │  ├── write product + movement                                          │
//! │  └── commit                                                            │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Queries are built at runtime (`sqlx::query` / `query_as` with
//! `#[derive(sqlx::FromRow)]` row types) so the crate builds without a live
//! database. Row types convert into the `shopkeep_core` domain types.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD, search, stock adjustments
//! - [`order::OrderRepository`] - Checkout transaction, order queries, status changes
//! - [`customer::CustomerRepository`] - Customers known by phone
//! - [`debt::DebtRepository`] - Debts and payments
//! - [`inventory::InventoryRepository`] - Import/export ledger
//! - [`notification::NotificationRepository`] - Per-user notifications
//! - [`report::ReportRepository`] - Read-only aggregates

pub mod customer;
pub mod debt;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod product;
pub mod report;

use uuid::Uuid;

/// Generates a new entity ID.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lowercased text stored in the `*_key` search columns.
///
/// SQLite only folds ASCII, so Vietnamese capitals are folded here instead.
pub(crate) fn search_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds a lowercased `LIKE` pattern matching `term` anywhere, escaping
/// `%`, `_` and `\` so user input is matched literally. Use with
/// `ESCAPE '\'`, against a [`search_key`] column.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("sữa"), "%sữa%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_search_key_folds_unicode() {
        assert_eq!(search_key(&["ĐỖ THỊ HOA"]), "đỗ thị hoa");
        assert_eq!(search_key(&["Sữa Tươi", "Hộp 1L"]), "sữa tươi\nhộp 1l");
        assert_eq!(contains_pattern("ĐỖ"), "%đỗ%");
    }
}
