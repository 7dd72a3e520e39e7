//! # Coupon Repository
//!
//! Coupons for one tenant. Codes are unique per tenant ignoring case, backed
//! by `UNIQUE (tenant_id, code COLLATE NOCASE)`.
//!
//! ## Use Counter
//! ```text
//! UPDATE coupons SET current_uses = current_uses + 1
//! WHERE tenant_id = ? AND code = ? COLLATE NOCASE
//!   AND (max_uses IS NULL OR current_uses < max_uses)
//! ```
//! Two fulfillments racing for the last use of a coupon cannot both succeed.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repo::CouponStore;
use crate::repository::contains_pattern;
use storefront_core::{Coupon, TenantId};

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
    tenant: TenantId,
}

impl CouponRepository {
    pub(crate) fn new(pool: SqlitePool, tenant: TenantId) -> Self {
        CouponRepository { pool, tenant }
    }
}

fn map_duplicate(err: sqlx::Error, code: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("coupons.code", code),
        other => other,
    }
}

#[async_trait]
impl CouponStore for CouponRepository {
    async fn find_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        debug!(tenant = %self.tenant, code = %code, "Looking up coupon");

        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, tenant_id, code, description, discount_kind, discount_value,
                   minimum_order_cents, max_uses, current_uses, starts_at, expires_at,
                   is_active, created_at, updated_at
            FROM coupons
            WHERE tenant_id = ?1 AND code = ?2 COLLATE NOCASE
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn find_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let coupon = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, tenant_id, code, description, discount_kind, discount_value,
                   minimum_order_cents, max_uses, current_uses, starts_at, expires_at,
                   is_active, created_at, updated_at
            FROM coupons
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(coupon)
    }

    async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Coupon>> {
        let query = query.trim();
        debug!(tenant = %self.tenant, query = %query, limit = %limit, "Searching coupons");

        let coupons = sqlx::query_as::<_, Coupon>(
            r#"
            SELECT id, tenant_id, code, description, discount_kind, discount_value,
                   minimum_order_cents, max_uses, current_uses, starts_at, expires_at,
                   is_active, created_at, updated_at
            FROM coupons
            WHERE tenant_id = ?1
              AND (?2 = '' OR code LIKE ?3 ESCAPE '\' OR description LIKE ?3 ESCAPE '\')
            ORDER BY created_at DESC
            LIMIT ?4
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(query)
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }

    async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(tenant = %self.tenant, code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, tenant_id, code, description, discount_kind, discount_value,
                minimum_order_cents, max_uses, current_uses, starts_at, expires_at,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&coupon.id)
        .bind(self.tenant.as_str())
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.discount_kind)
        .bind(coupon.discount_value)
        .bind(coupon.minimum_order_cents)
        .bind(coupon.max_uses)
        .bind(coupon.current_uses)
        .bind(coupon.starts_at)
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_duplicate(e, &coupon.code))?;

        Ok(())
    }

    async fn update(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(tenant = %self.tenant, id = %coupon.id, "Updating coupon");

        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                code = ?3,
                description = ?4,
                discount_kind = ?5,
                discount_value = ?6,
                minimum_order_cents = ?7,
                max_uses = ?8,
                starts_at = ?9,
                expires_at = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.discount_kind)
        .bind(coupon.discount_value)
        .bind(coupon.minimum_order_cents)
        .bind(coupon.max_uses)
        .bind(coupon.starts_at)
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_duplicate(e, &coupon.code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", &coupon.id));
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(tenant = %self.tenant, id = %id, "Deleting coupon");

        let result = sqlx::query("DELETE FROM coupons WHERE tenant_id = ?1 AND id = ?2")
            .bind(self.tenant.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        Ok(())
    }

    async fn record_use(&self, code: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET current_uses = current_uses + 1, updated_at = ?3
            WHERE tenant_id = ?1 AND code = ?2 COLLATE NOCASE
              AND (max_uses IS NULL OR current_uses < max_uses)
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(tenant = %self.tenant, code = %code, applied, "Recorded coupon use");
        Ok(applied)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
