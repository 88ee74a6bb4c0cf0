//! # kassa-core: Pure Business Logic for Kassa POS
//!
//! This crate holds every rule of the point-of-sale domain that can be
//! expressed without touching a database: money arithmetic, the session
//! cart, checkout validation and pricing, and ledger aggregation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Web tier (external collaborator)                 │   │
//! │  │   product pages ──► cart page ──► confirm ──► sale detail       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ kassa_db::Register                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kassa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │  cart   │ │ checkout │ │ report │  │   │
//! │  │   │ Product │ │  Money  │ │  Cart   │ │   Plan   │ │Summary │  │   │
//! │  │   │  Sale   │ │         │ │Snapshot │ │          │ │        │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          kassa-db (SQLite, repositories, checkout engine)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Category, Product, Sale, SaleItem, PaymentMethod)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Session cart and its catalog snapshot
//! - [`checkout`] - Checkout validation and pricing (the plan a sale is built from)
//! - [`report`] - Aggregation over recorded sales
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use kassa_core::checkout::{CheckoutLine, CheckoutPlan};
//! use kassa_core::money::Money;
//!
//! let plan = CheckoutPlan::build(vec![CheckoutLine {
//!     product_id: "p-1".to_string(),
//!     product_name: "Notebook".to_string(),
//!     unit_price: Money::from_cents(1000),
//!     quantity: 3,
//!     available: 5,
//! }])
//! .unwrap();
//!
//! assert_eq!(plan.total().cents(), 3000);
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// These allow users to do `use kassa_core::Money` instead of
// `use kassa_core::money::Money`
pub use cart::{Cart, CartEntry, CartLine, CartSnapshot, SnapshotEntry};
pub use checkout::{CheckoutLine, CheckoutPlan, PlannedItem};
pub use error::{CheckoutError, CoreError, ErrorCode, ValidationError};
pub use money::Money;
pub use report::{PaymentMethodTotal, ProductSales, SalesSummary};
pub use types::*;

/// Maximum number of distinct products in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps the checkout transaction short.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Catches accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
