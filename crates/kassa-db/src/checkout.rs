//! # Checkout Engine
//!
//! Turns a cart into a recorded sale without ever overselling.
//!
//! ## The Commit Step
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     checkout(cart, user, method)                        │
//! │                                                                         │
//! │  empty cart? ──► EmptyCart          (no transaction opened)             │
//! │  user / cart limits ──► Validation  (no transaction opened)             │
//! │       │                                                                 │
//! │       ▼  ── timeout(commit_timeout) ──────────────────────────────┐     │
//! │  BEGIN                                                            │     │
//! │   for entry in cart (in order):                                   │     │
//! │     UPDATE products                                               │     │
//! │        SET stock = stock - qty                                    │     │
//! │      WHERE id = ? AND stock >= qty                                │     │
//! │      RETURNING name, price, stock      ◄── first write takes      │     │
//! │       │                                    the SQLite write lock  │     │
//! │       ├── row ──► CheckoutLine (price as of this instant)         │     │
//! │       └── none ─► SELECT row: missing → ProductNotFound           │     │
//! │                               else    → InsufficientStock         │     │
//! │                   ROLLBACK                                        │     │
//! │   CheckoutPlan::build(lines)  ──► total = Σ item totals           │     │
//! │   INSERT sale, INSERT sale_items (line_no 1..=N)                  │     │
//! │       │                                                           │     │
//! │       └── elapsed? transaction dropped (rolled back),             │     │
//! │           Commit { retryable: true } ◄────────────────────────────┘     │
//! │  COMMIT          (outside the timeout; bounded by busy_timeout)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Concurrent Checkouts Can't Oversell
//! The stock check and the decrement are one statement. Two checkouts
//! competing for the last unit both issue the conditional `UPDATE`; SQLite
//! serializes the writers, so the second one sees the already-decremented
//! row, matches nothing, and fails with `InsufficientStock`.
//!
//! Nothing is read before the first write, so a waiting checkout never
//! holds a stale snapshot and `busy_timeout` applies to the lock wait.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CheckoutSettings;
use crate::error::DbError;
use crate::repository::sale::{self, RecordedSale};
use kassa_core::error::CheckoutResult;
use kassa_core::validation::validate_user_id;
use kassa_core::{
    Cart, CartEntry, CheckoutError, CheckoutLine, CheckoutPlan, Money, PaymentMethod, Sale,
    SaleItem,
};

const DECREMENT_STOCK: &str = r#"
    UPDATE products
    SET stock_quantity = stock_quantity - ?1, updated_at = ?2
    WHERE id = ?3 AND stock_quantity >= ?1
    RETURNING id, name, price_cents, stock_quantity
"#;

/// Runs checkouts against one database.
///
/// Cheap to clone; clones share the pool.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.checkout_engine(CheckoutSettings::default());
/// match engine.checkout(&cart, "cashier-7", PaymentMethod::Cash).await {
///     Ok(recorded) => println!("sale {} total {}", recorded.sale.id, recorded.sale.total()),
///     Err(e) if e.is_retryable() => { /* offer "try again" */ }
///     Err(e) => println!("{}", e.user_message()),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
    settings: CheckoutSettings,
}

impl CheckoutEngine {
    pub fn new(pool: SqlitePool, settings: CheckoutSettings) -> Self {
        CheckoutEngine { pool, settings }
    }

    pub fn settings(&self) -> CheckoutSettings {
        self.settings
    }

    /// Records a sale for every entry in `cart`, or nothing at all.
    ///
    /// ## Returns
    /// * `Ok(RecordedSale)` - sale committed, stock decremented
    /// * `Err(EmptyCart)` / `Err(Validation)` - rejected before any write
    /// * `Err(ProductNotFound)` / `Err(InsufficientStock)` - rolled back
    /// * `Err(Commit)` - storage failure or timeout, rolled back
    ///
    /// The cart itself is not modified; clearing it is the caller's job.
    pub async fn checkout(
        &self,
        cart: &Cart,
        user_id: &str,
        payment_method: PaymentMethod,
    ) -> CheckoutResult<RecordedSale> {
        if cart.is_empty() {
            warn!(user_id = %user_id, "Checkout rejected: cart is empty");
            return Err(CheckoutError::EmptyCart);
        }
        if let Err(e) = validate_user_id(user_id).and_then(|_| cart.validate()) {
            warn!(user_id = %user_id, error = %e, "Checkout rejected: invalid request");
            return Err(e.into());
        }

        info!(
            user_id = %user_id,
            entries = cart.len(),
            units = cart.total_quantity(),
            method = %payment_method,
            "Checkout started"
        );

        let result = self.commit(cart, user_id, payment_method).await;

        match &result {
            Ok(recorded) => info!(
                sale_id = %recorded.sale.id,
                user_id = %user_id,
                total_cents = recorded.sale.total_cents,
                items = recorded.items.len(),
                "Checkout committed"
            ),
            Err(e @ CheckoutError::Commit { .. }) => error!(
                user_id = %user_id,
                code = ?e.code(),
                retryable = e.is_retryable(),
                error = %e,
                "Checkout failed; rolled back"
            ),
            Err(e) => warn!(
                user_id = %user_id,
                code = ?e.code(),
                error = %e,
                "Checkout rejected; rolled back"
            ),
        }

        result
    }

    /// Stages the sale under the commit timeout, then commits.
    ///
    /// `COMMIT` is awaited outside the timeout. A sent `COMMIT` can land
    /// after its future is dropped, so a timeout there would report failure
    /// for a recorded sale. The write lock is already held; only
    /// `busy_timeout` bounds it.
    async fn commit(
        &self,
        cart: &Cart,
        user_id: &str,
        payment_method: PaymentMethod,
    ) -> CheckoutResult<RecordedSale> {
        let budget = self.settings.commit_timeout();
        let (tx, recorded) =
            match tokio::time::timeout(budget, self.stage(cart, user_id, payment_method)).await {
                Ok(staged) => staged?,
                // The dropped transaction rolls back; nothing was committed
                Err(_) => return Err(DbError::Timeout(budget).into()),
            };

        tx.commit().await.map_err(DbError::from)?;

        Ok(recorded)
    }

    /// Runs every write of the sale inside an open transaction.
    async fn stage(
        &self,
        cart: &Cart,
        user_id: &str,
        payment_method: PaymentMethod,
    ) -> CheckoutResult<(Transaction<'static, Sqlite>, RecordedSale)> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let now = Utc::now();

        let mut lines = Vec::with_capacity(cart.len());
        for entry in cart.entries() {
            let row: Option<(String, String, i64, i64)> = sqlx::query_as(DECREMENT_STOCK)
                .bind(entry.quantity)
                .bind(now)
                .bind(&entry.product_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::from)?;

            let Some((product_id, product_name, price_cents, stock_after)) = row else {
                let err = shortfall(&mut tx, entry).await?;
                rollback(tx).await;
                return Err(err);
            };

            debug!(
                product_id = %product_id,
                quantity = entry.quantity,
                stock_after = stock_after,
                "Stock reserved"
            );

            lines.push(CheckoutLine {
                product_id,
                product_name,
                unit_price: Money::from_cents(price_cents),
                quantity: entry.quantity,
                available: stock_after + entry.quantity,
            });
        }

        let plan = match CheckoutPlan::build(lines) {
            Ok(plan) => plan,
            Err(e) => {
                rollback(tx).await;
                return Err(e);
            }
        };

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            total_cents: plan.total().cents(),
            payment_method,
            created_at: now,
            updated_at: now,
        };
        sale::insert_sale(&mut *tx, &sale).await?;

        let mut items = Vec::with_capacity(plan.items().len());
        for (index, planned) in plan.into_items().into_iter().enumerate() {
            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: planned.product_id,
                line_no: index as i64 + 1,
                name_snapshot: planned.product_name,
                quantity: planned.quantity,
                unit_price_cents: planned.unit_price.cents(),
                total_price_cents: planned.total_price.cents(),
                created_at: now,
            };
            sale::insert_item(&mut *tx, &item).await?;
            items.push(item);
        }

        Ok((tx, RecordedSale { sale, items }))
    }
}

/// Explains why the conditional decrement matched no row.
async fn shortfall(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &CartEntry,
) -> CheckoutResult<CheckoutError> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT stock_quantity, name FROM products WHERE id = ?1")
            .bind(&entry.product_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(DbError::from)?;

    Ok(match row {
        None => CheckoutError::ProductNotFound {
            product_id: entry.product_id.clone(),
        },
        Some((available, product_name)) => CheckoutError::InsufficientStock {
            product_id: entry.product_id.clone(),
            product_name,
            requested: entry.quantity,
            available,
        },
    })
}

async fn rollback(tx: Transaction<'_, Sqlite>) {
    // Dropping the transaction rolls back as well; this just does it eagerly.
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Explicit rollback failed");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, seed_category, seed_product, TempDb};
    use crate::DbConfig;
    use kassa_core::{ErrorCode, ProductUpdate};
    use std::time::Duration;

    fn cart_of(entries: &[(&str, i64)]) -> Cart {
        let mut cart = Cart::new();
        for (product_id, quantity) in entries {
            for _ in 0..*quantity {
                cart.add(product_id).unwrap();
            }
        }
        cart
    }

    #[tokio::test]
    async fn test_successful_checkout() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let product = seed_product(&db, &category.id, "Notebook", 1000, 5).await;
        let engine = db.checkout_engine(CheckoutSettings::default());

        let recorded = engine
            .checkout(&cart_of(&[(product.id.as_str(), 3)]), "cashier-1", PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(recorded.sale.total(), Money::from_cents(3000));
        assert_eq!(recorded.sale.user_id, "cashier-1");
        assert_eq!(recorded.sale.payment_method, PaymentMethod::Cash);
        assert_eq!(recorded.items.len(), 1);
        assert_eq!(recorded.items[0].quantity, 3);
        assert_eq!(recorded.items[0].unit_price_cents, 1000);
        assert_eq!(recorded.items[0].total_price_cents, 3000);
        assert_eq!(recorded.items[0].name_snapshot, "Notebook");

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let product = seed_product(&db, &category.id, "Notebook", 1000, 2).await;
        let engine = db.checkout_engine(CheckoutSettings::default());
        let cart = cart_of(&[(product.id.as_str(), 5)]);

        let err = engine
            .checkout(&cart, "cashier-1", PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: "Notebook".to_string(),
                requested: 5,
                available: 2,
            }
        );
        assert_eq!(err.code(), ErrorCode::InsufficientStock);

        // Same failure again: nothing was consumed by the first attempt
        let again = engine
            .checkout(&cart, "cashier-1", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert_eq!(again, err);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 2);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_later_shortfall_rolls_back_earlier_lines() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let plenty = seed_product(&db, &category.id, "Pad", 300, 5).await;
        let scarce = seed_product(&db, &category.id, "Binder", 800, 1).await;
        let engine = db.checkout_engine(CheckoutSettings::default());

        let err = engine
            .checkout(
                &cart_of(&[(plenty.id.as_str(), 2), (scarce.id.as_str(), 3)]),
                "cashier-1",
                PaymentMethod::Card,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { requested: 3, available: 1, .. }
        ));

        let plenty_after = db.products().get_by_id(&plenty.id).await.unwrap().unwrap();
        let scarce_after = db.products().get_by_id(&scarce.id).await.unwrap().unwrap();
        assert_eq!(plenty_after.stock_quantity, 5);
        assert_eq!(scarce_after.stock_quantity, 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_first_shortfall_in_cart_order_is_reported() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let a = seed_product(&db, &category.id, "A", 100, 0).await;
        let b = seed_product(&db, &category.id, "B", 100, 0).await;
        let engine = db.checkout_engine(CheckoutSettings::default());

        let err = engine
            .checkout(&cart_of(&[(b.id.as_str(), 1), (a.id.as_str(), 1)]), "u", PaymentMethod::Cash)
            .await
            .unwrap_err();

        match err {
            CheckoutError::InsufficientStock { product_id, .. } => assert_eq!(product_id, b.id),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let product = seed_product(&db, &category.id, "Pad", 300, 5).await;
        let engine = db.checkout_engine(CheckoutSettings::default());
        let ghost = Uuid::new_v4().to_string();

        let err = engine
            .checkout(&cart_of(&[(product.id.as_str(), 1), (ghost.as_str(), 1)]), "u", PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::ProductNotFound { product_id: ghost });
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejections_before_any_write() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let product = seed_product(&db, &category.id, "Pad", 300, 5).await;
        let engine = db.checkout_engine(CheckoutSettings::default());

        let err = engine
            .checkout(&Cart::new(), "u", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);

        let err = engine
            .checkout(&cart_of(&[(product.id.as_str(), 1)]), "  ", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
    }

    #[tokio::test]
    async fn test_sale_keeps_price_at_time_of_sale() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let product = seed_product(&db, &category.id, "Pad", 1000, 5).await;
        let engine = db.checkout_engine(CheckoutSettings::default());

        let recorded = engine
            .checkout(&cart_of(&[(product.id.as_str(), 1)]), "u", PaymentMethod::Cash)
            .await
            .unwrap();

        let mut update = ProductUpdate::from_product(&product);
        update.price_cents = 1200;
        update.name = "Premium Pad".to_string();
        db.products().update(&product.id, &update).await.unwrap();

        let items = db.sales().get_items(&recorded.sale.id).await.unwrap();
        assert_eq!(items[0].unit_price_cents, 1000);
        assert_eq!(items[0].name_snapshot, "Pad");

        let sale = db.sales().get_by_id(&recorded.sale.id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 1000);

        // The next sale uses the new price
        let next = engine
            .checkout(&cart_of(&[(product.id.as_str(), 1)]), "u", PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(next.sale.total_cents, 1200);
    }

    #[tokio::test]
    async fn test_total_matches_items() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let a = seed_product(&db, &category.id, "A", 199, 10).await;
        let b = seed_product(&db, &category.id, "B", 1, 10).await;
        let c = seed_product(&db, &category.id, "C", 0, 10).await;
        let engine = db.checkout_engine(CheckoutSettings::default());

        let recorded = engine
            .checkout(&cart_of(&[(a.id.as_str(), 3), (b.id.as_str(), 7), (c.id.as_str(), 2)]), "u", PaymentMethod::Other)
            .await
            .unwrap();

        let sum: i64 = recorded.items.iter().map(|i| i.total_price_cents).sum();
        assert_eq!(recorded.sale.total_cents, sum);
        assert_eq!(sum, 3 * 199 + 7);
        let line_nos: Vec<i64> = recorded.items.iter().map(|i| i.line_no).collect();
        assert_eq!(line_nos, vec![1, 2, 3]);
        for item in &recorded.items {
            assert_eq!(item.total_price_cents, item.quantity * item.unit_price_cents);
        }
    }

    // =========================================================================
    // Concurrency (file-backed, several connections)
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_for_last_unit() {
        let temp = TempDb::new().await;
        let category = seed_category(&temp.db, "Paper").await;
        let product = seed_product(&temp.db, &category.id, "Last One", 500, 1).await;
        let engine = temp.db.checkout_engine(CheckoutSettings::default());

        let mut handles = Vec::new();
        for n in 0..8 {
            let engine = engine.clone();
            let cart = cart_of(&[(product.id.as_str(), 1)]);
            handles.push(tokio::spawn(async move {
                engine
                    .checkout(&cart, &format!("cashier-{n}"), PaymentMethod::Cash)
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(CheckoutError::InsufficientStock { available: 0, .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        let after = temp.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 0);
        assert_eq!(temp.db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_conserve_stock() {
        let temp = TempDb::new().await;
        let category = seed_category(&temp.db, "Paper").await;
        let a = seed_product(&temp.db, &category.id, "A", 100, 5).await;
        let b = seed_product(&temp.db, &category.id, "B", 200, 7).await;
        let engine = temp.db.checkout_engine(CheckoutSettings::default());

        let mut handles = Vec::new();
        for n in 0..10 {
            let engine = engine.clone();
            // Alternate entry order so writers touch rows in both orders
            let cart = if n % 2 == 0 {
                cart_of(&[(a.id.as_str(), 1), (b.id.as_str(), 1)])
            } else {
                cart_of(&[(b.id.as_str(), 1), (a.id.as_str(), 1)])
            };
            handles.push(tokio::spawn(async move {
                engine.checkout(&cart, "cashier", PaymentMethod::Card).await
            }));
        }

        let mut successes = 0i64;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(CheckoutError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        // A runs out first
        assert_eq!(successes, 5);

        let a_after = temp.db.products().get_by_id(&a.id).await.unwrap().unwrap();
        let b_after = temp.db.products().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(a_after.stock_quantity, 0);
        assert_eq!(b_after.stock_quantity, 2);

        let sold: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM sale_items")
            .fetch_one(temp.db.pool())
            .await
            .unwrap();
        assert_eq!(sold, (5 - 0) + (7 - 2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_for_whole_stock() {
        let temp = TempDb::new().await;
        let category = seed_category(&temp.db, "Paper").await;
        let product = seed_product(&temp.db, &category.id, "Ream", 900, 5).await;
        let engine = temp.db.checkout_engine(CheckoutSettings::default());

        let mut handles = Vec::new();
        for n in 0..8 {
            let engine = engine.clone();
            let cart = cart_of(&[(product.id.as_str(), 5)]);
            handles.push(tokio::spawn(async move {
                engine
                    .checkout(&cart, &format!("cashier-{n}"), PaymentMethod::Cash)
                    .await
            }));
        }

        let mut successes = 0;
        let mut short = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(recorded) => {
                    successes += 1;
                    assert_eq!(recorded.item_count(), 5);
                }
                Err(CheckoutError::InsufficientStock {
                    requested: 5,
                    available: 0,
                    ..
                }) => short += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!((successes, short), (1, 7));
        let after = temp.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 0);
        assert_eq!(temp.db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outcomes_match_ledger_under_tight_timeouts() {
        let temp = TempDb::new().await;
        let category = seed_category(&temp.db, "Paper").await;
        let product = seed_product(&temp.db, &category.id, "Pad", 300, 1000).await;

        let mut handles = Vec::new();
        for n in 0..40u64 {
            // 1-5ms budgets: some checkouts finish, others time out mid-flight
            let engine = temp.db.checkout_engine(CheckoutSettings::with_commit_timeout(
                Duration::from_millis(n % 5 + 1),
            ));
            let cart = cart_of(&[(product.id.as_str(), 1)]);
            handles.push(tokio::spawn(async move {
                engine.checkout(&cart, "cashier", PaymentMethod::Cash).await
            }));
        }

        let mut successes = 0i64;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        // Every reported failure left nothing behind
        assert_eq!(temp.db.sales().count().await.unwrap(), successes);
        let after = temp.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 1000 - successes);
    }

    // =========================================================================
    // Lock waits
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_commit_timeout_is_retryable_and_leaves_no_trace() {
        let temp = TempDb::with_config(|c| c.busy_timeout(Duration::from_secs(2))).await;
        let category = seed_category(&temp.db, "Paper").await;
        let product = seed_product(&temp.db, &category.id, "Pad", 300, 5).await;
        let engine = temp
            .db
            .checkout_engine(CheckoutSettings::with_commit_timeout(Duration::from_millis(200)));

        // Another writer holds the write lock
        let mut holder = temp.db.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *holder)
            .await
            .unwrap();

        let err = engine
            .checkout(&cart_of(&[(product.id.as_str(), 1)]), "u", PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(err.is_retryable(), "expected retryable, got {err:?}");
        match &err {
            CheckoutError::Commit { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }

        let after = temp.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert_eq!(temp.db.sales().count().await.unwrap(), 0);

        sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
        drop(holder);

        // Retrying once the lock is free succeeds
        temp.db
            .checkout_engine(CheckoutSettings::default())
            .checkout(&cart_of(&[(product.id.as_str(), 1)]), "u", PaymentMethod::Cash)
            .await
            .unwrap();
        let after = temp.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_busy_database_is_retryable() {
        let temp = TempDb::with_config(|c: DbConfig| c.busy_timeout(Duration::from_millis(100))).await;
        let category = seed_category(&temp.db, "Paper").await;
        let product = seed_product(&temp.db, &category.id, "Pad", 300, 5).await;
        let engine = temp.db.checkout_engine(CheckoutSettings::default());

        let mut holder = temp.db.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *holder)
            .await
            .unwrap();

        let err = engine
            .checkout(&cart_of(&[(product.id.as_str(), 2)]), "u", PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(err.is_retryable(), "expected retryable, got {err:?}");
        assert_eq!(err.code(), ErrorCode::CommitFailed);

        sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
        drop(holder);

        let after = temp.db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert_eq!(temp.db.sales().count().await.unwrap(), 0);
    }
}
