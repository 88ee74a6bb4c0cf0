//! # Domain Types
//!
//! Core domain types used throughout Kassa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│    Product      │◄──│    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name (unique)  │   │  category_id    │   │  sale_id (FK)   │       │
//! │  └─────────────────┘   │  price_cents    │   │  line_no        │       │
//! │                        │  stock_quantity │   │  name_snapshot  │       │
//! │                        └─────────────────┘   │  unit_price     │       │
//! │                                              └────────┬────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐            │                │
//! │  │ PaymentMethod   │◄──│      Sale       │◄───────────┘                │
//! │  │  Cash           │   │  id (UUID)      │                             │
//! │  │  Card           │   │  user_id        │                             │
//! │  │  Other          │   │  total_cents    │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Ownership
//! `Product::stock_quantity` is the only record of stock. Checkout
//! decrements it and restock increments it; `ProductUpdate` has no stock
//! field at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_barcode, validate_category_name, validate_price_cents, validate_product_name,
    validate_stock_quantity, validate_uuid, ValidationResult, MAX_PRICE_CENTS,
};

// =============================================================================
// Category
// =============================================================================

/// A grouping of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique across categories.
    pub name: String,

    pub description: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or updating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory {
            name: name.into(),
            description: None,
        }
    }

    /// Checks the name and returns a trimmed copy.
    pub fn validate(&self) -> ValidationResult<NewCategory> {
        validate_category_name(&self.name)?;
        Ok(NewCategory {
            name: self.name.trim().to_string(),
            description: normalize_optional(&self.description),
        })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Category this product belongs to.
    pub category_id: String,

    /// Display name shown to the cashier and copied onto sale items.
    pub name: String,

    /// Current selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents (for margin reporting).
    pub cost_cents: i64,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// Barcode (EAN-13, UPC-A, etc.), unique when present.
    pub barcode: Option<String>,

    pub description: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Whether `quantity` units could be sold from current stock.
    ///
    /// Advisory only: checkout re-checks inside its transaction.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub category_id: String,
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub stock_quantity: i64,
    pub barcode: Option<String>,
    pub description: Option<String>,
}

impl NewProduct {
    /// Validates every field and returns a normalized copy.
    ///
    /// Names are trimmed; empty barcodes and descriptions become `None`.
    pub fn validate(&self) -> ValidationResult<NewProduct> {
        validate_uuid(&self.category_id).map_err(|_| ValidationError::InvalidFormat {
            field: "category_id".to_string(),
            reason: "must be a valid UUID".to_string(),
        })?;
        validate_product_name(&self.name)?;
        validate_price_cents(self.price_cents)?;
        validate_cost_cents(self.cost_cents)?;
        validate_stock_quantity(self.stock_quantity)?;

        let barcode = normalize_optional(&self.barcode);
        if let Some(code) = &barcode {
            validate_barcode(code)?;
        }

        Ok(NewProduct {
            category_id: self.category_id.clone(),
            name: self.name.trim().to_string(),
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            stock_quantity: self.stock_quantity,
            barcode,
            description: normalize_optional(&self.description),
        })
    }
}

/// Editable product details.
///
/// Deliberately has no stock field: stock changes only through checkout
/// and restock.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub category_id: String,
    pub name: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub barcode: Option<String>,
    pub description: Option<String>,
}

impl ProductUpdate {
    /// Starts an update from the product's current values.
    pub fn from_product(product: &Product) -> Self {
        ProductUpdate {
            category_id: product.category_id.clone(),
            name: product.name.clone(),
            price_cents: product.price_cents,
            cost_cents: product.cost_cents,
            barcode: product.barcode.clone(),
            description: product.description.clone(),
        }
    }

    pub fn validate(&self) -> ValidationResult<ProductUpdate> {
        let normalized = NewProduct {
            category_id: self.category_id.clone(),
            name: self.name.clone(),
            price_cents: self.price_cents,
            cost_cents: self.cost_cents,
            stock_quantity: 0,
            barcode: self.barcode.clone(),
            description: self.description.clone(),
        }
        .validate()?;

        Ok(ProductUpdate {
            category_id: normalized.category_id,
            name: normalized.name,
            price_cents: normalized.price_cents,
            cost_cents: normalized.cost_cents,
            barcode: normalized.barcode,
            description: normalized.description,
        })
    }
}

fn validate_cost_cents(cents: i64) -> ValidationResult<()> {
    validate_price_cents(cents).map_err(|_| ValidationError::OutOfRange {
        field: "cost".to_string(),
        min: 0,
        max: MAX_PRICE_CENTS,
    })
}

fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Other,
}

impl PaymentMethod {
    /// Every accepted method, in display order.
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Other,
    ];

    /// Parses a submitted payment method.
    ///
    /// Input is trimmed and matched case-insensitively. Anything outside
    /// `cash`, `card`, `other` is rejected.
    ///
    /// ## Example
    /// ```rust
    /// use kassa_core::PaymentMethod;
    ///
    /// assert_eq!(PaymentMethod::parse(" Card ").unwrap(), PaymentMethod::Card);
    /// assert!(PaymentMethod::parse("bitcoin").is_err());
    /// ```
    pub fn parse(value: &str) -> ValidationResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "other" => Ok(PaymentMethod::Other),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: Self::ALL.iter().map(|m| m.as_str().to_string()).collect(),
            }),
        }
    }

    /// The stored lowercase form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale.
///
/// Immutable once written except for `payment_method`, which may be
/// corrected administratively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Who recorded the sale.
    pub user_id: String,
    /// Equal to the sum of the sale's item totals.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Position in the cart the sale was made from (1-based).
    pub line_no: i64,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Quantity sold, always positive.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`.
    pub total_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
