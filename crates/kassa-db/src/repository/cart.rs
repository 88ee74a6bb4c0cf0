//! # Session Cart Store
//!
//! Carts live per browser session, outside any checkout transaction.
//!
//! ## Request Boundaries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  One request, one load / one save                       │
//! │                                                                         │
//! │  request ──► store.load(session) ──► Cart (owned, plain value)          │
//! │                                        │                                │
//! │                                        │ add / remove / checkout        │
//! │                                        ▼                                │
//! │             store.save(session, &cart) or store.clear(session)          │
//! │                                                                         │
//! │  Unknown session ──► empty cart                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::DbResult;
use kassa_core::Cart;

/// Session-keyed cart persistence.
pub trait CartStore: Send + Sync {
    /// Loads a session's cart. Unknown sessions get an empty cart.
    fn load(&self, session_id: &str) -> impl Future<Output = DbResult<Cart>> + Send;

    /// Stores a session's cart, replacing any previous one.
    fn save(&self, session_id: &str, cart: &Cart) -> impl Future<Output = DbResult<()>> + Send;

    /// Forgets a session's cart.
    fn clear(&self, session_id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

// =============================================================================
// SQLite
// =============================================================================

/// Carts stored as JSON in the `cart_sessions` table.
#[derive(Debug, Clone)]
pub struct SqliteCartStore {
    pool: SqlitePool,
}

impl SqliteCartStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCartStore { pool }
    }
}

impl CartStore for SqliteCartStore {
    async fn load(&self, session_id: &str) -> DbResult<Cart> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM cart_sessions WHERE session_id = ?1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(Cart::new()),
        }
    }

    async fn save(&self, session_id: &str, cart: &Cart) -> DbResult<()> {
        let payload = serde_json::to_string(cart)?;

        debug!(session_id = %session_id, entries = cart.len(), "Saving cart");

        sqlx::query(
            r#"
            INSERT INTO cart_sessions (session_id, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(&payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self, session_id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM cart_sessions WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        debug!(session_id = %session_id, "Cart cleared");
        Ok(())
    }
}

// =============================================================================
// In-Memory
// =============================================================================

/// Carts held in process memory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    carts: Arc<RwLock<HashMap<String, Cart>>>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        MemoryCartStore::default()
    }

    /// Number of sessions holding a cart.
    pub async fn session_count(&self) -> usize {
        self.carts.read().await.len()
    }
}

impl CartStore for MemoryCartStore {
    async fn load(&self, session_id: &str) -> DbResult<Cart> {
        Ok(self
            .carts
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, session_id: &str, cart: &Cart) -> DbResult<()> {
        self.carts
            .write()
            .await
            .insert(session_id.to_string(), cart.clone());
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> DbResult<()> {
        self.carts.write().await.remove(session_id);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
