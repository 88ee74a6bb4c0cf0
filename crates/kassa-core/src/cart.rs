//! # Session Cart
//!
//! The per-session shopping cart and its read-time view of the catalog.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Web Action               Register method          Cart Change          │
//! │  ──────────               ───────────────          ───────────          │
//! │                                                                         │
//! │  "Add to cart" ──────────► add_to_cart() ────────► entry.qty += 1      │
//! │                                                                         │
//! │  "Remove" ───────────────► remove_from_cart() ───► entries.remove(i)   │
//! │                                                                         │
//! │  "Clear" ────────────────► clear_cart() ─────────► entries.clear()     │
//! │                                                                         │
//! │  View cart ──────────────► snapshot() ───────────► (read only)         │
//! │                                                                         │
//! │  NOTE: No stock is checked or reserved here. Stock is only checked     │
//! │        (and decremented) inside the checkout transaction.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Entries are unique by `product_id` (adding again increases quantity)
//! - Quantity is always in `1..=MAX_ITEM_QUANTITY`
//! - At most `MAX_CART_ITEMS` distinct products
//! - Insertion order is preserved; checkout processes entries in this order

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_cart_size, validate_quantity, ValidationResult};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartEntry {
    pub product_id: String,
    pub quantity: i64,
}

/// The shopping cart: an ordered list of product ids and quantities.
///
/// Holds no prices. Prices are read from the catalog when the cart is
/// displayed and again, authoritatively, at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds one unit of a product.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity + 1
    /// - Product not in cart: new entry at quantity 1, appended at the end
    ///
    /// ## Returns
    /// The entry's new quantity.
    ///
    /// ## Errors
    /// Only cart limits: more than `MAX_CART_ITEMS` distinct products or a
    /// quantity above `MAX_ITEM_QUANTITY`. Stock is not consulted.
    pub fn add(&mut self, product_id: &str) -> ValidationResult<i64> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.product_id == product_id) {
            let new_qty = entry.quantity + 1;
            validate_quantity(new_qty)?;
            entry.quantity = new_qty;
            return Ok(new_qty);
        }

        validate_cart_size(self.entries.len())?;

        self.entries.push(CartEntry {
            product_id: product_id.to_string(),
            quantity: 1,
        });
        Ok(1)
    }

    /// Removes a product's entry entirely.
    ///
    /// Returns `false` when the product was not in the cart.
    pub fn remove(&mut self, product_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.product_id != product_id);
        self.entries.len() != before
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Quantity of a product in the cart (0 when absent).
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.entries
            .iter()
            .find(|e| e.product_id == product_id)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total units across all entries.
    pub fn total_quantity(&self) -> i64 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    /// Re-checks the cart invariants.
    ///
    /// Carts come back from session storage as JSON, so anything loaded
    /// from outside is validated before a checkout trusts it.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.entries.len() > MAX_CART_ITEMS {
            return Err(ValidationError::OutOfRange {
                field: "cart items".to_string(),
                min: 0,
                max: MAX_CART_ITEMS as i64,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.entries {
            validate_quantity(entry.quantity)?;
            if !seen.insert(entry.product_id.as_str()) {
                return Err(ValidationError::InvalidFormat {
                    field: "cart".to_string(),
                    reason: format!("duplicate entry for product {}", entry.product_id),
                });
            }
        }

        Ok(())
    }

    /// Resolves the cart against catalog rows read at call time.
    ///
    /// ## Behavior
    /// ```text
    /// cart: [A×2, B×1, C×3]      catalog: {A, C}
    ///          │
    ///          ▼
    /// [Available(A, 2, 2×price_A), Unavailable(B, 1), Available(C, 3, 3×price_C)]
    /// total = subtotal_A + subtotal_C
    /// ```
    ///
    /// Missing products are reported per entry, never dropped. The cart
    /// itself is not modified.
    ///
    /// ## Errors
    /// `Overflow` when a subtotal or the total does not fit in `Money`.
    pub fn snapshot(
        &self,
        products: &HashMap<String, Product>,
    ) -> ValidationResult<CartSnapshot> {
        let entries = self
            .entries
            .iter()
            .map(|entry| match products.get(&entry.product_id) {
                Some(product) => {
                    let subtotal = product
                        .price()
                        .checked_multiply_quantity(entry.quantity)
                        .ok_or_else(|| overflow("cart line subtotal"))?;
                    Ok(SnapshotEntry::Available {
                        line: CartLine {
                            product: product.clone(),
                            quantity: entry.quantity,
                            subtotal,
                        },
                    })
                }
                None => Ok(SnapshotEntry::Unavailable {
                    product_id: entry.product_id.clone(),
                    quantity: entry.quantity,
                }),
            })
            .collect::<ValidationResult<Vec<SnapshotEntry>>>()?;

        let total = Money::checked_sum(entries.iter().filter_map(|e| match e {
            SnapshotEntry::Available { line } => Some(line.subtotal),
            SnapshotEntry::Unavailable { .. } => None,
        }))
        .ok_or_else(|| overflow("cart total"))?;

        Ok(CartSnapshot { entries, total })
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A cart entry resolved to its current catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i64,
    /// Current price × quantity. Display only; checkout re-prices.
    pub subtotal: Money,
}

/// Per-entry result of resolving a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotEntry {
    Available { line: CartLine },
    /// The product was deleted after it was added to the cart.
    Unavailable { product_id: String, quantity: i64 },
}

impl SnapshotEntry {
    pub fn product_id(&self) -> &str {
        match self {
            SnapshotEntry::Available { line } => &line.product.id,
            SnapshotEntry::Unavailable { product_id, .. } => product_id,
        }
    }

    /// The error this entry represents, if any.
    pub fn as_error(&self) -> Option<CoreError> {
        match self {
            SnapshotEntry::Available { .. } => None,
            SnapshotEntry::Unavailable { product_id, .. } => {
                Some(CoreError::ProductNotFound(product_id.clone()))
            }
        }
    }
}

/// The cart as the customer sees it right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSnapshot {
    /// Same order as the cart.
    pub entries: Vec<SnapshotEntry>,
    /// Sum of the available lines' subtotals.
    pub total: Money,
}

impl CartSnapshot {
    /// Whether any entry refers to a product that no longer exists.
    pub fn has_unavailable(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, SnapshotEntry::Unavailable { .. }))
    }

    /// One `ProductNotFound` per unavailable entry, in cart order.
    pub fn errors(&self) -> Vec<CoreError> {
        self.entries.iter().filter_map(SnapshotEntry::as_error).collect()
    }

    /// Lines that resolved to a product.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.entries.iter().filter_map(|e| match e {
            SnapshotEntry::Available { line } => Some(line),
            SnapshotEntry::Unavailable { .. } => None,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
