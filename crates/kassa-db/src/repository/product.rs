//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Name / barcode search
//! - Restock (the only stock increase)
//!
//! ## Who Touches Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    stock_quantity writers                               │
//! │                                                                         │
//! │  create()   ──► initial level                                           │
//! │  restock()  ──► stock = stock + n          (n > 0)                      │
//! │  checkout   ──► stock = stock - n WHERE stock >= n   (checkout.rs)      │
//! │                                                                         │
//! │  update()   ──► name, price, barcode, ... NEVER stock                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kassa_core::validation::{validate_restock_quantity, validate_search_query};
use kassa_core::{NewProduct, Product, ProductUpdate};

pub(crate) const PRODUCT_COLUMNS: &str = "id, category_id, name, price_cents, cost_cents, \
     stock_quantity, barcode, description, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let results = repo.search("notebook", 20).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::Validation)` - Invalid name, price, stock, or barcode
    /// * `Err(DbError::NotFound)` - Category doesn't exist
    /// * `Err(DbError::UniqueViolation)` - Barcode already used
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        let input = input.validate()?;
        let now = Utc::now();

        let product = Product {
            id: Uuid::new_v4().to_string(),
            category_id: input.category_id,
            name: input.name,
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            stock_quantity: input.stock_quantity,
            barcode: input.barcode,
            description: input.description,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %product.name, category_id = %product.category_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, category_id, name, price_cents, cost_cents,
                stock_quantity, barcode, description, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity)
        .bind(&product.barcode)
        .bind(&product.description)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, &product.category_id, product.barcode.as_deref()))?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Loads several products at once, keyed by id.
    ///
    /// Unknown ids are simply absent from the map.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Gets a product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1"
        ))
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products ordered by name, optionally within one category.
    pub async fn list(&self, category_id: Option<&str>, limit: u32) -> DbResult<Vec<Product>> {
        let products = match category_id {
            Some(category_id) => {
                sqlx::query_as::<_, Product>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE category_id = ?1 ORDER BY name LIMIT ?2"
                ))
                .bind(category_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Product>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name LIMIT ?1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(products)
    }

    /// Searches products by name substring or barcode prefix.
    ///
    /// ## Arguments
    /// * `query` - Search term (can be partial, case-insensitive for ASCII)
    /// * `limit` - Maximum results to return
    ///
    /// An empty query lists products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(None, limit).await;
        }

        let escaped = escape_like(&query);
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name LIKE '%' || ?1 || '%' ESCAPE '\'
               OR barcode LIKE ?1 || '%' ESCAPE '\'
            ORDER BY name
            LIMIT ?2
            "#
        ))
        .bind(&escaped)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Updates a product's details and price.
    ///
    /// Stock is not part of [`ProductUpdate`] and is left as it is.
    /// Past sale items keep the price they were sold at.
    pub async fn update(&self, id: &str, input: &ProductUpdate) -> DbResult<Product> {
        let input = input.validate()?;

        debug!(id = %id, "Updating product");

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                category_id = ?2,
                name = ?3,
                price_cents = ?4,
                cost_cents = ?5,
                barcode = ?6,
                description = ?7,
                updated_at = ?8
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.category_id)
        .bind(&input.name)
        .bind(input.price_cents)
        .bind(input.cost_cents)
        .bind(&input.barcode)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, &input.category_id, input.barcode.as_deref()))?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Adds `quantity` units to stock.
    ///
    /// ## Returns
    /// The product with its new stock level.
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<Product> {
        validate_restock_quantity(quantity)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        info!(id = %id, added = quantity, stock = product.stock_quantity, "Product restocked");
        Ok(product)
    }

    /// Deletes a product that has never been sold.
    ///
    /// Products referenced by sale items are kept so the ledger stays
    /// intact; deleting one fails with `InUse`.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let sold: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if sold > 0 {
            return Err(DbError::in_use("Product", id, sold));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                // Sold between the count and the delete.
                DbError::ForeignKeyViolation { .. } => DbError::in_use("Product", id, 1),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Maps constraint failures on product writes to domain errors.
fn classify_write_error(err: sqlx::Error, category_id: &str, barcode: Option<&str>) -> DbError {
    match DbError::from(err) {
        DbError::ForeignKeyViolation { .. } => DbError::not_found("Category", category_id),
        DbError::UniqueViolation { .. } => DbError::duplicate("barcode", barcode.unwrap_or("")),
        other => other,
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// =============================================================================
// Unit Tests
// =============================================================================
