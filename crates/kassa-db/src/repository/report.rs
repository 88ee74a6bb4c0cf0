//! # Report Repository
//!
//! Aggregates over the sales ledger. Read-only.
//!
//! ```text
//! sales ──GROUP BY payment_method──► PaymentMethodTotal ──► SalesSummary
//! sale_items ──GROUP BY product_id──► ProductSales (top sellers)
//! ```

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::sale::SaleRepository;
use kassa_core::{Money, PaymentMethod, PaymentMethodTotal, ProductSales, Sale, SalesSummary};

/// Recent sales plus a summary over the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    /// Newest first.
    pub recent: Vec<Sale>,
    pub summary: SalesSummary,
}

/// Repository for sales reporting.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Summary over every recorded sale.
    pub async fn summary(&self) -> DbResult<SalesSummary> {
        let rows = sqlx::query_as::<_, (PaymentMethod, i64, i64)>(
            r#"
            SELECT payment_method, COUNT(*), COALESCE(SUM(total_cents), 0)
            FROM sales
            GROUP BY payment_method
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let totals = rows
            .into_iter()
            .map(|(payment_method, count, total_cents)| PaymentMethodTotal {
                payment_method,
                sale_count: count.max(0) as u64,
                total: Money::from_cents(total_cents),
            });

        Ok(SalesSummary::from_method_totals(totals)?)
    }

    /// The latest `limit` sales and a summary over all sales.
    pub async fn sales_report(&self, limit: u32) -> DbResult<SalesReport> {
        let recent = SaleRepository::new(self.pool.clone())
            .list_recent(limit)
            .await?;
        let summary = self.summary().await?;

        debug!(
            recent = recent.len(),
            sale_count = summary.sale_count,
            total_cents = summary.total.cents(),
            "Sales report built"
        );

        Ok(SalesReport { recent, summary })
    }

    /// Best-selling products by units sold, then by revenue.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT
                si.product_id AS product_id,
                p.name AS product_name,
                SUM(si.quantity) AS quantity_sold,
                SUM(si.total_price_cents) AS revenue_cents
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            GROUP BY si.product_id, p.name
            ORDER BY quantity_sold DESC, revenue_cents DESC, p.name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, seed_category, seed_product};
    use kassa_core::Cart;

    #[tokio::test]
    async fn test_empty_ledger() {
        let db = memory_db().await;

        let report = db.reports().sales_report(10).await.unwrap();
        assert!(report.recent.is_empty());
        assert_eq!(report.summary.sale_count, 0);
        assert_eq!(report.summary.average, Money::zero());
        assert_eq!(report.summary.by_method.len(), 3);

        assert!(db.reports().top_products(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary_and_top_products() {
        let db = memory_db().await;
        let category = seed_category(&db, "Paper").await;
        let pad = seed_product(&db, &category.id, "Pad", 250, 50).await;
        let pen = seed_product(&db, &category.id, "Pen", 100, 50).await;
        let engine = db.checkout_engine(Default::default());

        // 3 pads = 7.50 by cash
        let mut cart = Cart::new();
        for _ in 0..3 {
            cart.add(&pad.id).unwrap();
        }
        engine.checkout(&cart, "alice", PaymentMethod::Cash).await.unwrap();

        // 1 pad + 5 pens = 7.50 by card
        let mut cart = Cart::new();
        cart.add(&pad.id).unwrap();
        for _ in 0..5 {
            cart.add(&pen.id).unwrap();
        }
        engine.checkout(&cart, "bob", PaymentMethod::Card).await.unwrap();

        // 1 pen = 1.00 by card
        let mut cart = Cart::new();
        cart.add(&pen.id).unwrap();
        engine.checkout(&cart, "bob", PaymentMethod::Card).await.unwrap();

        let report = db.reports().sales_report(2).await.unwrap();
        assert_eq!(report.recent.len(), 2);

        let summary = report.summary;
        assert_eq!(summary.sale_count, 3);
        assert_eq!(summary.total, Money::from_cents(1600));
        // 16.00 / 3 = 5.333.. → 5.33
        assert_eq!(summary.average, Money::from_cents(533));

        let card = summary.for_method(PaymentMethod::Card).unwrap();
        assert_eq!(card.sale_count, 2);
        assert_eq!(card.total, Money::from_cents(850));
        let other = summary.for_method(PaymentMethod::Other).unwrap();
        assert_eq!(other.sale_count, 0);

        let top = db.reports().top_products(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, pen.id);
        assert_eq!(top[0].quantity_sold, 6);
        assert_eq!(top[0].revenue(), Money::from_cents(600));
        assert_eq!(top[1].product_name, "Pad");
        assert_eq!(top[1].quantity_sold, 4);
        assert_eq!(top[1].revenue_cents, 1000);
    }
}
