//! # Checkout Planning
//!
//! Pure validation and pricing for a checkout. The database engine feeds
//! this module the rows it read (and decremented) inside its transaction;
//! the returned plan is the single source of both the sale total and the
//! sale items.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CheckoutPlan::build(lines)                           │
//! │                                                                         │
//! │  lines empty? ──yes──► EmptyCart                                        │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  for each line, in cart order:                                          │
//! │    quantity in 1..=999?  ──no──► Validation                             │
//! │    requested > available? ──yes─► InsufficientStock (first one only)   │
//! │    total_price = unit_price × quantity (overflow-checked)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = Σ total_price   ──► CheckoutPlan { items, total }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariant
//! `plan.total() == Σ item.total_price` holds by construction.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CheckoutError, CheckoutResult, ValidationError};
use crate::money::Money;
use crate::validation::validate_quantity;

/// A cart entry joined with the product row as read at checkout time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub product_id: String,
    pub product_name: String,
    /// Current price of the product.
    pub unit_price: Money,
    /// Quantity requested by the cart.
    pub quantity: i64,
    /// Stock on hand before this checkout.
    pub available: i64,
}

/// A priced line, ready to be written as a sale item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlannedItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

/// Validated, priced checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutPlan {
    items: Vec<PlannedItem>,
    total: Money,
}

impl CheckoutPlan {
    /// Validates and prices a checkout.
    ///
    /// ## Errors
    /// - `EmptyCart` when there are no lines
    /// - `Validation` for a quantity outside `1..=999` or an overflowing total
    /// - `InsufficientStock` for the first line (in cart order) whose
    ///   requested quantity exceeds available stock
    pub fn build(lines: Vec<CheckoutLine>) -> CheckoutResult<CheckoutPlan> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut items = Vec::with_capacity(lines.len());
        let mut total = Money::zero();

        for line in lines {
            validate_quantity(line.quantity)?;

            if line.quantity > line.available {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    product_name: line.product_name,
                    requested: line.quantity,
                    available: line.available,
                });
            }

            let total_price = line
                .unit_price
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| overflow("line total"))?;
            total = total
                .checked_add(total_price)
                .ok_or_else(|| overflow("sale total"))?;

            items.push(PlannedItem {
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price,
            });
        }

        Ok(CheckoutPlan { items, total })
    }

    /// Planned items in cart order.
    pub fn items(&self) -> &[PlannedItem] {
        &self.items
    }

    /// Sale total: the sum of every item's total price.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Total units across all items.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn into_items(self) -> Vec<PlannedItem> {
        self.items
    }
}

fn overflow(field: &str) -> CheckoutError {
    CheckoutError::Validation(ValidationError::Overflow {
        field: field.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, price_cents: i64, quantity: i64, available: i64) -> CheckoutLine {
        CheckoutLine {
            product_id: id.to_string(),
            product_name: format!("Product {id}"),
            unit_price: Money::from_cents(price_cents),
            quantity,
            available,
        }
    }

    #[test]
    fn test_single_line_plan() {
        // P priced 10.00 with stock 5, cart {P: 3}
        let plan = CheckoutPlan::build(vec![line("p", 1000, 3, 5)]).unwrap();

        assert_eq!(plan.total(), Money::from_cents(3000));
        assert_eq!(plan.items().len(), 1);
        assert_eq!(plan.items()[0].unit_price, Money::from_cents(1000));
        assert_eq!(plan.items()[0].total_price, Money::from_cents(3000));
    }

    #[test]
    fn test_shortfall_names_product_and_counts() {
        // Same product with stock 2, cart {P: 5}
        let err = CheckoutPlan::build(vec![line("p", 1000, 5, 2)]).unwrap_err();

        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                product_id: "p".to_string(),
                product_name: "Product p".to_string(),
                requested: 5,
                available: 2,
            }
        );
    }

    #[test]
    fn test_first_shortfall_wins() {
        let err = CheckoutPlan::build(vec![
            line("a", 100, 1, 10),
            line("b", 100, 4, 3),
            line("c", 100, 9, 0),
        ])
        .unwrap_err();

        match err {
            CheckoutError::InsufficientStock { product_id, .. } => assert_eq!(product_id, "b"),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let plan = CheckoutPlan::build(vec![line("p", 250, 4, 4)]).unwrap();
        assert_eq!(plan.item_count(), 4);
    }

    #[test]
    fn test_empty_cart() {
        assert_eq!(CheckoutPlan::build(vec![]), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn test_total_matches_items() {
        let plan = CheckoutPlan::build(vec![
            line("a", 199, 3, 10),
            line("b", 1, 999, 999),
            line("c", 0, 2, 2),
        ])
        .unwrap();

        let summed: Money = plan.items().iter().map(|i| i.total_price).sum();
        assert_eq!(plan.total(), summed);
        for item in plan.items() {
            assert_eq!(item.total_price, item.unit_price * item.quantity);
        }
    }

    #[test]
    fn test_rejects_bad_quantity_and_overflow() {
        assert!(matches!(
            CheckoutPlan::build(vec![line("a", 100, 0, 10)]),
            Err(CheckoutError::Validation(_))
        ));

        assert!(matches!(
            CheckoutPlan::build(vec![line("a", i64::MAX / 2, 3, 10)]),
            Err(CheckoutError::Validation(ValidationError::Overflow { .. }))
        ));
    }
}
