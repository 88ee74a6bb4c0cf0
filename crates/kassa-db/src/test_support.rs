//! Shared fixtures for this crate's tests.

use tempfile::TempDir;

use crate::pool::{Database, DbConfig};
use kassa_core::{Category, NewCategory, NewProduct, Product};

/// Fresh in-memory database with migrations applied.
pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) async fn seed_category(db: &Database, name: &str) -> Category {
    db.categories().create(&NewCategory::new(name)).await.unwrap()
}

pub(crate) async fn seed_product(
    db: &Database,
    category_id: &str,
    name: &str,
    price_cents: i64,
    stock_quantity: i64,
) -> Product {
    let input = NewProduct {
        category_id: category_id.to_string(),
        name: name.to_string(),
        price_cents,
        stock_quantity,
        ..NewProduct::default()
    };
    db.products().create(&input).await.unwrap()
}

/// File-backed database for tests that need several connections.
///
/// Lives in its own temporary directory, which is removed (WAL files
/// included) when the `TempDb` is dropped.
pub(crate) struct TempDb {
    pub db: Database,
    // Dropped after `db`
    _dir: TempDir,
}

impl TempDb {
    pub async fn new() -> TempDb {
        TempDb::with_config(|config| config).await
    }

    pub async fn with_config(configure: impl FnOnce(DbConfig) -> DbConfig) -> TempDb {
        let dir = TempDir::new().unwrap();
        let db = Database::new(configure(DbConfig::new(dir.path().join("kassa.db"))))
            .await
            .unwrap();
        TempDb { db, _dir: dir }
    }
}
