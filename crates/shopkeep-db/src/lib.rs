//! # shopkeep-db: Database Layer for Shopkeep
//!
//! This crate provides database access for Shopkeep.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopkeep Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shopkeep-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ products      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ orders        │    │ 001_initial  │  │   │
//! │  │   │               │    │ debts, ...    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopkeep_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shopkeep.db")).await?;
//! let products = db.products().search("sữa", 10).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::{CustomerRepository, NewCustomer};
pub use repository::debt::{
    DebtFilter, DebtRepository, DebtStats, DebtUpdate, NewDebt, NewDebtPayment, OrderDebt,
};
pub use repository::inventory::{
    ExportOutcome, ExportRequest, HistoryFilter, ImportOutcome, ImportRequest, InventoryRepository,
    MovementSummary, MovementTotals,
};
pub use repository::notification::{NewNotification, NotificationRepository};
pub use repository::order::{
    CheckoutItem, CheckoutRequest, OrderFilter, OrderRepository, OrderStats,
};
pub use repository::product::{
    NewProduct, ProductFilter, ProductRepository, ProductSort, ProductUpdate, StockAdjustment,
};
pub use repository::report::{DailySales, ReportRepository, SalesSummary, TopSellingProduct};
