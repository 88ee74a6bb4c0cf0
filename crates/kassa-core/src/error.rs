//! # Error Types
//!
//! Domain-specific error types for kassa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kassa-core errors (this file)                                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── CheckoutError    - Everything a checkout attempt can fail with    │
//! │                                                                         │
//! │  kassa-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: DbError ──► CheckoutError::Commit ──► code() + user_message()   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, quantities)
//! 3. Errors are enum variants, never String
//! 4. Each checkout error maps to a user-facing message

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - A cart references a product that was deleted after it was added
    /// - A caller passes an unknown product id
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Category cannot be found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any database work runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Value would overflow its representation.
    #[error("{field} is too large")]
    Overflow { field: String },
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Everything a checkout attempt can fail with.
///
/// ## Recovery
/// All variants are recoverable by the caller: the user adjusts the cart
/// (or simply retries, for retryable commit failures). None of them leave
/// partial state behind: the engine rolls back before returning any of
/// them.
///
/// ## User Workflow
/// ```text
/// Checkout (cart: {P: 5})
///      │
///      ▼
/// Conditional decrement: stock=2
///      │
///      ▼
/// InsufficientStock { product: P, requested: 5, available: 2 }
///      │
///      ▼
/// UI shows: "Insufficient stock for P: requested 5, only 2 available"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The cart has nothing to sell.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart entry references a product that no longer exists.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// The first cart entry whose requested quantity exceeds current stock.
    #[error("Insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        requested: i64,
        available: i64,
    },

    /// Checkout input failed validation (payment method, user, cart limits).
    #[error("Invalid checkout request: {0}")]
    Validation(#[from] ValidationError),

    /// The atomic write could not be completed.
    ///
    /// ## When This Occurs
    /// - Storage failure while writing the sale or its items
    /// - Lock contention exceeding the busy timeout or commit timeout
    ///
    /// Nothing from the attempt is visible afterwards.
    #[error("Checkout could not be committed: {reason}")]
    Commit { reason: String, retryable: bool },
}

/// Machine-readable error codes for the web tier.
///
/// ## Usage in the Web Tier
/// ```text
/// match err.code() {
///     ErrorCode::InsufficientStock => render cart with a stock notice
///     ErrorCode::CommitFailed       => offer "try again"
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmptyCart,
    ProductNotFound,
    InsufficientStock,
    ValidationError,
    CommitFailed,
}

impl CheckoutError {
    /// Builds a retryable commit error.
    pub fn retryable(reason: impl Into<String>) -> Self {
        CheckoutError::Commit {
            reason: reason.into(),
            retryable: true,
        }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckoutError::EmptyCart => ErrorCode::EmptyCart,
            CheckoutError::ProductNotFound { .. } => ErrorCode::ProductNotFound,
            CheckoutError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CheckoutError::Validation(_) => ErrorCode::ValidationError,
            CheckoutError::Commit { .. } => ErrorCode::CommitFailed,
        }
    }

    /// Whether retrying the same checkout unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Commit { retryable: true, .. })
    }

    /// Message safe to show the cashier.
    ///
    /// Commit failures never expose the underlying storage error; the
    /// `Display` impl keeps that detail for logs.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::EmptyCart => "Your cart is empty.".to_string(),
            CheckoutError::ProductNotFound { .. } => {
                "An item in your cart is no longer available. Please remove it and try again."
                    .to_string()
            }
            CheckoutError::InsufficientStock {
                product_name,
                requested,
                available,
                ..
            } => format!(
                "Insufficient stock for {}: requested {}, only {} available.",
                product_name, requested, available
            ),
            CheckoutError::Validation(e) => e.to_string(),
            CheckoutError::Commit { retryable: true, .. } => {
                "The sale could not be completed right now. Please try again.".to_string()
            }
            CheckoutError::Commit { retryable: false, .. } => {
                "The sale could not be completed.".to_string()
            }
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for checkout results.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn shortfall() -> CheckoutError {
        CheckoutError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Notebook".to_string(),
            requested: 5,
            available: 2,
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            shortfall().to_string(),
            "Insufficient stock for Notebook: requested 5, available 2"
        );
        assert_eq!(
            shortfall().user_message(),
            "Insufficient stock for Notebook: requested 5, only 2 available."
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "user_id".to_string(),
        };
        assert_eq!(err.to_string(), "user_id is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "name must be at most 100 characters");
    }

    #[test]
    fn test_commit_message_hides_internals() {
        let err = CheckoutError::retryable("database is locked");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("database is locked"));
        assert!(!err.user_message().contains("locked"));
        assert_eq!(err.code(), ErrorCode::CommitFailed);
    }

    #[test]
    fn test_codes() {
        assert_eq!(CheckoutError::EmptyCart.code(), ErrorCode::EmptyCart);
        assert_eq!(shortfall().code(), ErrorCode::InsufficientStock);
        assert!(!shortfall().is_retryable());
        assert_eq!(
            CheckoutError::ProductNotFound {
                product_id: "x".to_string()
            }
            .code(),
            ErrorCode::ProductNotFound
        );
    }

    #[test]
    fn test_validation_converts() {
        let validation_err = ValidationError::Required {
            field: "user_id".to_string(),
        };
        let core_err: CoreError = validation_err.clone().into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let checkout_err: CheckoutError = validation_err.into();
        assert_eq!(checkout_err.code(), ErrorCode::ValidationError);
    }
}
