//! # Sales Reporting
//!
//! Aggregation over recorded sales. Read-only: nothing here feeds back
//! into checkout.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentMethod, Sale};
use crate::validation::ValidationResult;

/// Revenue collected through one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodTotal {
    pub payment_method: PaymentMethod,
    pub sale_count: u64,
    pub total: Money,
}

/// Totals over a set of sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub sale_count: u64,
    pub total: Money,
    /// Mean sale value, rounded half away from zero to the cent.
    pub average: Money,
    /// One entry per payment method, in `PaymentMethod::ALL` order.
    pub by_method: Vec<PaymentMethodTotal>,
}

impl SalesSummary {
    /// Summarizes a slice of sales.
    ///
    /// ## Example
    /// ```rust
    /// use kassa_core::{Money, SalesSummary};
    ///
    /// let summary = SalesSummary::from_sales(&[]).unwrap();
    /// assert_eq!(summary.sale_count, 0);
    /// assert_eq!(summary.average, Money::zero());
    /// ```
    pub fn from_sales(sales: &[Sale]) -> ValidationResult<SalesSummary> {
        let totals = PaymentMethod::ALL
            .iter()
            .map(|&method| {
                let matching = sales.iter().filter(|s| s.payment_method == method);
                Ok(PaymentMethodTotal {
                    payment_method: method,
                    sale_count: matching.clone().count() as u64,
                    total: Money::checked_sum(matching.map(Sale::total))
                        .ok_or_else(|| overflow("sales total"))?,
                })
            })
            .collect::<ValidationResult<Vec<PaymentMethodTotal>>>()?;

        SalesSummary::from_method_totals(totals)
    }

    /// Builds a summary from per-method totals (e.g. a `GROUP BY` result).
    ///
    /// Methods missing from `totals` are reported with zero sales.
    ///
    /// ## Errors
    /// `Overflow` when the grand total does not fit in `Money`.
    pub fn from_method_totals(
        totals: impl IntoIterator<Item = PaymentMethodTotal>,
    ) -> ValidationResult<SalesSummary> {
        let totals: Vec<PaymentMethodTotal> = totals.into_iter().collect();

        let by_method = PaymentMethod::ALL
            .iter()
            .map(|&method| {
                let matching = totals.iter().filter(|t| t.payment_method == method);
                Ok(PaymentMethodTotal {
                    payment_method: method,
                    sale_count: matching.clone().map(|t| t.sale_count).sum(),
                    total: Money::checked_sum(matching.map(|t| t.total))
                        .ok_or_else(|| overflow("sales total"))?,
                })
            })
            .collect::<ValidationResult<Vec<PaymentMethodTotal>>>()?;

        let sale_count: u64 = by_method.iter().map(|t| t.sale_count).sum();
        let total = Money::checked_sum(by_method.iter().map(|t| t.total))
            .ok_or_else(|| overflow("sales total"))?;

        Ok(SalesSummary {
            sale_count,
            total,
            average: Money::average_of(total, sale_count),
            by_method,
        })
    }

    /// Totals for one payment method.
    pub fn for_method(&self, method: PaymentMethod) -> Option<&PaymentMethodTotal> {
        self.by_method.iter().find(|t| t.payment_method == method)
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

/// Units and revenue for one product across all sale items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    /// Current catalog name of the product.
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

impl ProductSales {
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
