//! # Store Repository
//!
//! The tenant directory. This is the one repository that is not tenant
//! scoped: it is how a request's `X-Store` slug becomes a [`TenantId`].
//!
//! [`TenantId`]: storefront_core::TenantId

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use storefront_core::Store;

#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    /// Resolves an active store by slug. Inactive stores resolve to `None`.
    pub async fn find_active_by_slug(&self, slug: &str) -> DbResult<Option<Store>> {
        debug!(slug = %slug, "Resolving store");

        let store = sqlx::query_as::<_, Store>(
            r#"
            SELECT id, slug, name, is_active, created_at
            FROM stores
            WHERE slug = ?1 AND is_active = 1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(store)
    }

    pub async fn insert(&self, store: &Store) -> DbResult<()> {
        debug!(slug = %store.slug, "Inserting store");

        sqlx::query(
            r#"
            INSERT INTO stores (id, slug, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&store.id)
        .bind(&store.slug)
        .bind(&store.name)
        .bind(store.is_active)
        .bind(store.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
