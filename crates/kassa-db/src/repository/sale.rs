//! # Sale Repository
//!
//! The sales ledger.
//!
//! ## Ledger Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         sales / sale_items                              │
//! │                                                                         │
//! │  Written ONLY inside the checkout transaction (checkout.rs)             │
//! │    insert_sale()  ──► 1 row in sales                                    │
//! │    insert_item()  ──► N rows in sale_items (line_no 1..=N, cart order)  │
//! │                                                                         │
//! │  After commit the rows are immutable, except:                           │
//! │    correct_payment_method()  (administrative correction)                │
//! │                                                                         │
//! │  sales.total_cents == Σ sale_items.total_price_cents                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kassa_core::{PaymentMethod, Sale, SaleItem};

const SALE_COLUMNS: &str = "id, user_id, total_cents, payment_method, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, line_no, name_snapshot, quantity, \
     unit_price_cents, total_price_cents, created_at";

/// A sale together with its items, as committed by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedSale {
    pub sale: Sale,
    /// Items in `line_no` order.
    pub items: Vec<SaleItem>,
}

impl RecordedSale {
    /// Total units sold.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Repository for reading the sales ledger.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets the items of a sale in cart order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY line_no"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a sale with its items.
    pub async fn get_recorded(&self, id: &str) -> DbResult<Option<RecordedSale>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(id).await?;

        Ok(Some(RecordedSale { sale, items }))
    }

    /// Lists the most recent sales, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales recorded by one user, newest first.
    pub async fn list_by_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales
            WHERE user_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Corrects the payment method of a recorded sale.
    ///
    /// Amounts and items are never changed after checkout; this is the one
    /// field an administrator may fix.
    pub async fn correct_payment_method(&self, id: &str, method: PaymentMethod) -> DbResult<Sale> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            UPDATE sales SET payment_method = ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(method)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))?;

        info!(id = %id, method = %method, "Sale payment method corrected");
        Ok(sale)
    }

    /// Counts recorded sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transactional Writes (checkout only)
// =============================================================================

/// Inserts the sale header on the checkout transaction's connection.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total_cents = sale.total_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (id, user_id, total_cents, payment_method, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.user_id)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts one sale item on the checkout transaction's connection.
pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, line_no, name_snapshot, quantity,
            unit_price_cents, total_price_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(item.line_no)
    .bind(&item.name_snapshot)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.total_price_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
