//! # Register
//!
//! What the web tier calls: session carts plus checkout.
//!
//! ## Checkout From a Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              register.checkout(session, user, "card")                   │
//! │                                                                         │
//! │  1. PaymentMethod::parse("card")   unknown → Validation, nothing else   │
//! │  2. carts.load(session)            outside any transaction              │
//! │  3. engine.checkout(&cart, ...)    the only step holding a lock         │
//! │       │                                                                 │
//! │       ├── Err ──► cart left exactly as it was                           │
//! │       │                                                                 │
//! │       ▼ Ok(sale)                                                        │
//! │  4. carts.clear(session)           separate step                        │
//! │       ├── Ok  ──► cart_cleared = true                                   │
//! │       └── Err ──► warn!, cart_cleared = false   (the sale stands)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checkout::CheckoutEngine;
use crate::config::CheckoutSettings;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::cart::CartStore;
use crate::repository::product::ProductRepository;
use kassa_core::error::CheckoutResult;
use kassa_core::validation::validate_session_id;
use kassa_core::{
    Cart, CartSnapshot, CheckoutError, CheckoutLine, CheckoutPlan, PaymentMethod, Sale, SaleItem,
};

/// Result of a successful checkout from a session cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOutcome {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// `false` when the sale was recorded but the session cart could not
    /// be emptied. The web tier should ask the cashier to clear it.
    pub cart_cleared: bool,
}

/// Session carts and checkout behind one handle.
///
/// ## Usage
/// ```rust,ignore
/// let register = db.register(config.checkout);
///
/// register.add_to_cart(&session_id, &product_id).await?;
/// let snapshot = register.snapshot(&session_id).await?;
/// let outcome = register.checkout(&session_id, &user_id, &form.payment_method).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Register<S: CartStore> {
    products: ProductRepository,
    engine: CheckoutEngine,
    carts: S,
}

impl<S: CartStore> Register<S> {
    pub fn new(db: &Database, carts: S, settings: CheckoutSettings) -> Self {
        Register {
            products: db.products(),
            engine: db.checkout_engine(settings),
            carts,
        }
    }

    /// The underlying cart store.
    pub fn carts(&self) -> &S {
        &self.carts
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Adds one unit of a product to the session's cart.
    ///
    /// Stock is not checked here; only the product's existence and the
    /// cart limits are.
    ///
    /// ## Returns
    /// The product's new quantity in the cart.
    pub async fn add_to_cart(&self, session_id: &str, product_id: &str) -> DbResult<i64> {
        validate_session_id(session_id)?;

        if self.products.get_by_id(product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let mut cart = self.carts.load(session_id).await?;
        let quantity = cart.add(product_id)?;
        self.carts.save(session_id, &cart).await?;

        debug!(session_id = %session_id, product_id = %product_id, quantity, "Added to cart");
        Ok(quantity)
    }

    /// Removes a product's entry from the session's cart.
    ///
    /// Returns `false` when the product wasn't in the cart.
    pub async fn remove_from_cart(&self, session_id: &str, product_id: &str) -> DbResult<bool> {
        validate_session_id(session_id)?;

        let mut cart = self.carts.load(session_id).await?;
        let removed = cart.remove(product_id);
        if removed {
            self.carts.save(session_id, &cart).await?;
        }

        Ok(removed)
    }

    /// Empties the session's cart.
    pub async fn clear_cart(&self, session_id: &str) -> DbResult<()> {
        validate_session_id(session_id)?;
        self.carts.clear(session_id).await
    }

    /// The session's cart as stored.
    pub async fn cart(&self, session_id: &str) -> DbResult<Cart> {
        validate_session_id(session_id)?;
        self.carts.load(session_id).await
    }

    /// The session's cart resolved against the current catalog.
    pub async fn snapshot(&self, session_id: &str) -> DbResult<CartSnapshot> {
        let cart = self.cart(session_id).await?;
        let ids: Vec<String> = cart.entries().iter().map(|e| e.product_id.clone()).collect();
        let products = self.products.get_many(&ids).await?;

        Ok(cart.snapshot(&products)?)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Prices the session's cart for a confirmation page.
    ///
    /// Reads without locking, so stock may change before the real checkout,
    /// which repeats every check.
    pub async fn preview(&self, session_id: &str) -> CheckoutResult<CheckoutPlan> {
        let cart = self.cart(session_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let ids: Vec<String> = cart.entries().iter().map(|e| e.product_id.clone()).collect();
        let products = self.products.get_many(&ids).await?;

        let mut lines = Vec::with_capacity(cart.len());
        for entry in cart.entries() {
            let product = products.get(&entry.product_id).ok_or_else(|| {
                CheckoutError::ProductNotFound {
                    product_id: entry.product_id.clone(),
                }
            })?;
            lines.push(CheckoutLine {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                unit_price: product.price(),
                quantity: entry.quantity,
                available: product.stock_quantity,
            });
        }

        CheckoutPlan::build(lines)
    }

    /// Checks out the session's cart.
    ///
    /// ## Arguments
    /// * `payment_method` - as submitted; must be `cash`, `card` or `other`
    ///
    /// ## Returns
    /// * `Ok(CheckoutOutcome)` - the sale was recorded
    /// * `Err(CheckoutError)` - nothing was recorded and the cart is unchanged
    pub async fn checkout(
        &self,
        session_id: &str,
        user_id: &str,
        payment_method: &str,
    ) -> CheckoutResult<CheckoutOutcome> {
        let method = match PaymentMethod::parse(payment_method) {
            Ok(method) => method,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    payment_method = %payment_method,
                    "Checkout rejected: unknown payment method"
                );
                return Err(e.into());
            }
        };
        validate_session_id(session_id)?;

        let cart = self.carts.load(session_id).await?;
        let recorded = self.engine.checkout(&cart, user_id, method).await?;

        let cart_cleared = match self.carts.clear(session_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    sale_id = %recorded.sale.id,
                    error = %e,
                    "Sale recorded but the cart could not be cleared"
                );
                false
            }
        };

        info!(
            session_id = %session_id,
            sale_id = %recorded.sale.id,
            cart_cleared,
            "Register checkout complete"
        );

        Ok(CheckoutOutcome {
            sale: recorded.sale,
            items: recorded.items,
            cart_cleared,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
