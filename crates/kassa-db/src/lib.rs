//! # kassa-db: Database Layer and Checkout Engine for Kassa POS
//!
//! This crate provides database access for Kassa POS and owns the one
//! operation that must never go wrong: turning a cart into a sale.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa POS Data Flow                              │
//! │                                                                         │
//! │  Web handler (POST /checkout)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kassa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Register    │───►│CheckoutEngine │    │  Migrations  │   │   │
//! │  │   │ (register.rs) │    │ (checkout.rs) │    │  (embedded)  │   │   │
//! │  │   │               │    │               │    │              │   │   │
//! │  │   │ CartStore     │    │ one tx per    │    │ 001_init.sql │   │   │
//! │  │   │ ProductRepo   │    │ sale          │    │              │   │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘   │   │
//! │  │           └────────┬───────────┘                               │   │
//! │  │                    ▼                                           │   │
//! │  │           Database (pool.rs): SqlitePool, WAL, busy timeout    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kassa.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML / environment configuration and tracing setup
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, ledger, reporting and cart storage
//! - [`checkout`] - The atomic checkout transaction
//! - [`register`] - Session carts plus checkout, for the web tier
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_db::{Database, KassaConfig};
//!
//! let config = KassaConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let register = db.register(config.checkout);
//!
//! register.add_to_cart(&session_id, &product_id).await?;
//! let outcome = register.checkout(&session_id, &user_id, "cash").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod register;
pub mod repository;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutEngine;
pub use config::{init_tracing, CheckoutSettings, ConfigError, KassaConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use register::{CheckoutOutcome, Register};

// Repository re-exports for convenience
pub use repository::cart::{CartStore, MemoryCartStore, SqliteCartStore};
pub use repository::category::{CategoryDeletePolicy, CategoryRepository};
pub use repository::product::ProductRepository;
pub use repository::report::{ReportRepository, SalesReport};
pub use repository::sale::{RecordedSale, SaleRepository};
