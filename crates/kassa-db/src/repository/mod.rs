//! # Repository Module
//!
//! Database repository implementations for Kassa POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Web handler / Register                                                │
//! │       │                                                                 │
//! │       │  db.products().search("notebook", 20)                          │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── search(&self, query, limit)                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── create(&self, new_product)                                        │
//! │  └── restock(&self, id, qty)                                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Category CRUD with explicit delete policy
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD, search, restock
//! - [`SaleRepository`](sale::SaleRepository) - The sales ledger (read-mostly)
//! - [`ReportRepository`](report::ReportRepository) - Aggregates over the ledger
//! - [`CartStore`](cart::CartStore) - Session-keyed cart persistence
//!
//! Stock is decremented only by [`crate::checkout::CheckoutEngine`], never by a
//! repository method.

pub mod cart;
pub mod category;
pub mod product;
pub mod report;
pub mod sale;
