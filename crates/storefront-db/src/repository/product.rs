//! # Product Repository
//!
//! Catalog products for one tenant. Digital products carry the asset locator
//! and per-purchase download limit that entitlements are checked against.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::contains_pattern;
use storefront_core::{Product, TenantId};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.scoped(tenant).products();
///
/// let results = repo.search("guide", 20).await?;
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    tenant: TenantId,
}

impl ProductRepository {
    pub(crate) fn new(pool: SqlitePool, tenant: TenantId) -> Self {
        ProductRepository { pool, tenant }
    }

    /// Searches products by name (case-insensitive substring), ordered by name.
    ///
    /// An empty query lists every product up to `limit`, inactive ones
    /// included, since this is the admin view.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        debug!(tenant = %self.tenant, query = %query, limit = %limit, "Searching products");

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, description, price_cents, is_digital,
                   download_limit, asset_locator, is_active, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1
              AND (?2 = '' OR name LIKE ?3 ESCAPE '\')
            ORDER BY name
            LIMIT ?4
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(query)
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found in this tenant
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, name, description, price_cents, is_digital,
                   download_limit, asset_locator, is_active, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product (id generated beforehand).
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(tenant = %self.tenant, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, description, price_cents, is_digital,
                download_limit, asset_locator, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(self.tenant.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.is_digital)
        .bind(product.download_limit)
        .bind(&product.asset_locator)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            tenant_id: self.tenant.to_string(),
            ..product.clone()
        })
    }

    /// Updates an existing product's editable fields.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist in this tenant
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(tenant = %self.tenant, id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                description = ?4,
                price_cents = ?5,
                is_digital = ?6,
                download_limit = ?7,
                asset_locator = ?8,
                is_active = ?9,
                updated_at = ?10
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.is_digital)
        .bind(product.download_limit)
        .bind(&product.asset_locator)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
