//! # shopkeep-core: Pure Business Logic for Shopkeep
//!
//! This crate is the **heart** of Shopkeep. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopkeep Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web Dashboard (React)                        │   │
//! │  │    Quick Sale ──► Orders ──► Inventory ──► Debts ──► Alerts    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    shopkeep-api (axum)                          │   │
//! │  │    routers ──► services (checkout, inventory, debts, alerts)   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopkeep-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types   │ │ checkout │ │   debt   │ │  alerts  │          │   │
//! │  │   │ Product  │ │ totals   │ │ balance  │ │ low stock│          │   │
//! │  │   │ Order    │ │ order no.│ │ payments │ │ expiry   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 shopkeep-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Debt, Notification, ...)
//! - [`money`] - Money type with integer arithmetic (whole đồng)
//! - [`checkout`] - Order totals, status transitions, order numbering
//! - [`debt`] - Debt balance derivation and payment rules
//! - [`alerts`] - Low-stock and expiry alert decisions
//! - [`dates`] - Date parsing and day-window helpers
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; "now" is always a parameter
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are whole đồng (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use shopkeep_core::checkout::{CheckoutLine, CheckoutTotals};
//! use shopkeep_core::{Money, PaymentMethod};
//!
//! let lines = [CheckoutLine::new(Money::new(25_000), 2)];
//! let totals = CheckoutTotals::compute(
//!     &lines,
//!     Money::zero(),
//!     Money::new(50_000),
//!     PaymentMethod::Cash,
//! );
//!
//! assert_eq!(totals.total.amount(), 50_000);
//! assert_eq!(totals.change.amount(), 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod checkout;
pub mod dates;
pub mod debt;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single checkout.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest stock a product may hold. Movement quantities are capped at the
/// same value so stock arithmetic stays within `i64`.
pub const MAX_STOCK: i64 = 1_000_000_000;

/// Stock level at or below which a low-stock alert fires, unless the product
/// carries its own threshold.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// Days before expiry at which an expiring-soon alert fires.
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Days before expiry at which the expiring-products list marks a product
/// as `warning`.
pub const EXPIRY_WARNING_DAYS: i64 = 7;

/// Default repayment term for a new debt.
pub const DEFAULT_DEBT_TERM_DAYS: i64 = 30;

/// Name written into the customer snapshot when the cashier leaves it blank.
pub const WALK_IN_CUSTOMER_NAME: &str = "Khách lẻ";

/// Unit used when a product is created without one.
pub const DEFAULT_UNIT: &str = "cái";

/// Category used when a product is created without one.
pub const DEFAULT_CATEGORY: &str = "Khác";

/// Default and maximum page sizes for list endpoints.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Number of notifications returned by the notification list.
pub const NOTIFICATION_LIST_LIMIT: u32 = 50;
