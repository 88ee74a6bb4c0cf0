//! # Category Repository
//!
//! Database operations for categories.
//!
//! ## Deleting a Category
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 delete(id, policy)                                      │
//! │                                                                         │
//! │  Restrict                         ReassignTo(target)                    │
//! │  ────────                         ──────────────────                    │
//! │  products in category?            target exists? (else NotFound)        │
//! │    yes → InUse { dependents }     UPDATE products SET category = target │
//! │    no  → DELETE                   DELETE category                       │
//! │                                   (one transaction)                     │
//! │                                                                         │
//! │  Products are never deleted as a side effect of deleting a category.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kassa_core::{Category, NewCategory, ValidationError};

const CATEGORY_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// What to do with a category's products when it is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryDeletePolicy {
    /// Refuse while any product references the category.
    Restrict,
    /// Move every product to another category first.
    ReassignTo(String),
}

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Ok(Category)` - The stored category
    /// * `Err(DbError::Validation)` - Empty or overlong name
    /// * `Err(DbError::UniqueViolation)` - Name already taken
    pub async fn create(&self, input: &NewCategory) -> DbResult<Category> {
        let input = input.validate()?;
        let now = Utc::now();

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %category.name, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category name", &category.name),
            other => other,
        })?;

        Ok(category)
    }

    /// Gets a category by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Gets a category by its (unique) name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Lists all categories ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Renames a category or changes its description.
    pub async fn update(&self, id: &str, input: &NewCategory) -> DbResult<Category> {
        let input = input.validate()?;

        debug!(id = %id, "Updating category");

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name = ?2, description = ?3, updated_at = ?4
            WHERE id = ?1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("category name", &input.name),
            other => other,
        })?;

        category.ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Number of products in a category.
    pub async fn count_products(&self, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes a category according to `policy`.
    ///
    /// ## Errors
    /// * `NotFound` - the category (or the reassignment target) doesn't exist
    /// * `InUse` - `Restrict` and products still reference the category
    /// * `Validation` - reassigning a category to itself
    pub async fn delete(&self, id: &str, policy: CategoryDeletePolicy) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<String> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Category", id));
        }

        let dependents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        match &policy {
            CategoryDeletePolicy::Restrict => {
                if dependents > 0 {
                    return Err(DbError::in_use("Category", id, dependents));
                }
            }
            CategoryDeletePolicy::ReassignTo(target) => {
                if target == id {
                    return Err(ValidationError::InvalidFormat {
                        field: "target category".to_string(),
                        reason: "must differ from the category being deleted".to_string(),
                    }
                    .into());
                }

                let target_exists: Option<String> =
                    sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1")
                        .bind(target)
                        .fetch_optional(&mut *tx)
                        .await?;
                if target_exists.is_none() {
                    return Err(DbError::not_found("Category", target));
                }

                sqlx::query(
                    "UPDATE products SET category_id = ?2, updated_at = ?3 WHERE category_id = ?1",
                )
                .bind(id)
                .bind(target)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                // A product was added concurrently; RESTRICT caught it.
                DbError::ForeignKeyViolation { .. } => DbError::in_use("Category", id, dependents),
                other => other,
            })?;

        tx.commit().await?;

        info!(id = %id, policy = ?policy, moved = dependents, "Category deleted");
        Ok(())
    }

    /// Counts categories.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_db, seed_product};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = memory_db().await;
        let repo = db.categories();

        let created = repo.create(&NewCategory::new("  Stationery ")).await.unwrap();
        assert_eq!(created.name, "Stationery");

        let by_id = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        let by_name = repo.get_by_name("Stationery").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = memory_db().await;
        let repo = db.categories();

        repo.create(&NewCategory::new("Drinks")).await.unwrap();
        let err = repo.create(&NewCategory::new("Drinks")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let err = repo.create(&NewCategory::new("")).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_and_list() {
        let db = memory_db().await;
        let repo = db.categories();

        let b = repo.create(&NewCategory::new("Books")).await.unwrap();
        repo.create(&NewCategory::new("Art")).await.unwrap();

        let renamed = repo.update(&b.id, &NewCategory::new("Zines")).await.unwrap();
        assert_eq!(renamed.name, "Zines");

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Art", "Zines"]);

        let err = repo.update("missing", &NewCategory::new("X")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_restrict() {
        let db = memory_db().await;
        let repo = db.categories();

        let category = repo.create(&NewCategory::new("Paper")).await.unwrap();
        let product = seed_product(&db, &category.id, "A4 Ream", 599, 10).await;

        let err = repo
            .delete(&category.id, CategoryDeletePolicy::Restrict)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InUse { dependents: 1, .. }));

        // Nothing changed
        assert!(repo.get_by_id(&category.id).await.unwrap().is_some());
        assert!(db.products().get_by_id(&product.id).await.unwrap().is_some());

        let empty = repo.create(&NewCategory::new("Empty")).await.unwrap();
        repo.delete(&empty.id, CategoryDeletePolicy::Restrict).await.unwrap();
        assert!(repo.get_by_id(&empty.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reassign() {
        let db = memory_db().await;
        let repo = db.categories();

        let old = repo.create(&NewCategory::new("Old")).await.unwrap();
        let new = repo.create(&NewCategory::new("New")).await.unwrap();
        let product = seed_product(&db, &old.id, "Stapler", 1250, 3).await;

        repo.delete(&old.id, CategoryDeletePolicy::ReassignTo(new.id.clone()))
            .await
            .unwrap();

        assert!(repo.get_by_id(&old.id).await.unwrap().is_none());
        let moved = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(moved.category_id, new.id);
        assert_eq!(moved.stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_delete_reassign_errors() {
        let db = memory_db().await;
        let repo = db.categories();

        let category = repo.create(&NewCategory::new("Solo")).await.unwrap();

        let err = repo
            .delete(&category.id, CategoryDeletePolicy::ReassignTo("nowhere".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo
            .delete(&category.id, CategoryDeletePolicy::ReassignTo(category.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let err = repo
            .delete("missing", CategoryDeletePolicy::Restrict)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
