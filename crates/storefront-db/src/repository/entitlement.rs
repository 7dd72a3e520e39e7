//! # Entitlement Repository
//!
//! Download entitlements: order items looked up by capability token. Order
//! items have no tenant column of their own; every query reaches the tenant
//! through the parent order.
//!
//! ## Guarded Increment
//! ```text
//! UPDATE order_items SET download_count = download_count + 1
//! WHERE id = ? AND download_count = ?            ← expected count
//!   AND order_id IN (SELECT id FROM orders WHERE tenant_id = ?)
//! ```

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repo::EntitlementStore;
use storefront_core::{DownloadEntitlement, TenantId};

#[derive(Debug, Clone)]
pub struct EntitlementRepository {
    pool: SqlitePool,
    tenant: TenantId,
}

impl EntitlementRepository {
    pub(crate) fn new(pool: SqlitePool, tenant: TenantId) -> Self {
        EntitlementRepository { pool, tenant }
    }
}

#[async_trait]
impl EntitlementStore for EntitlementRepository {
    async fn find_by_token(&self, token: &str) -> DbResult<Option<DownloadEntitlement>> {
        let entitlement = sqlx::query_as::<_, DownloadEntitlement>(
            r#"
            SELECT oi.id AS order_item_id,
                   oi.order_id,
                   oi.product_id,
                   oi.download_count,
                   p.download_limit,
                   p.asset_locator
            FROM order_items oi
            INNER JOIN orders o ON o.id = oi.order_id
            INNER JOIN products p ON p.id = oi.product_id AND p.tenant_id = o.tenant_id
            WHERE oi.download_token = ?1 AND o.tenant_id = ?2
            "#,
        )
        .bind(token)
        .bind(self.tenant.as_str())
        .fetch_optional(&self.pool)
        .await?;

        debug!(tenant = %self.tenant, found = entitlement.is_some(), "Resolved download token");
        Ok(entitlement)
    }

    async fn current_count(&self, order_item_id: &str) -> DbResult<Option<i64>> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT oi.download_count
            FROM order_items oi
            INNER JOIN orders o ON o.id = oi.order_id
            WHERE oi.id = ?1 AND o.tenant_id = ?2
            "#,
        )
        .bind(order_item_id)
        .bind(self.tenant.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(count)
    }

    async fn compare_and_increment(&self, order_item_id: &str, expected: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE order_items
            SET download_count = download_count + 1
            WHERE id = ?1
              AND download_count = ?2
              AND order_id IN (SELECT id FROM orders WHERE tenant_id = ?3)
            "#,
        )
        .bind(order_item_id)
        .bind(expected)
        .bind(self.tenant.as_str())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(
            tenant = %self.tenant,
            order_item_id = %order_item_id,
            expected,
            applied,
            "Download counter CAS"
        );
        Ok(applied)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::order::tests::seed_digital_order;
    use crate::repository::test_support::{add_store, setup_store};

    #[tokio::test]
    async fn test_find_by_token_joins_product_settings() {
        let (_db, scope) = setup_store("acme").await;
        let token = seed_digital_order(&scope, "pay_1", Some(2), Some("ebooks/guide.pdf")).await;

        let entitlement = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(entitlement.download_count, 0);
        assert_eq!(entitlement.download_limit, Some(2));
        assert_eq!(entitlement.asset_locator.as_deref(), Some("ebooks/guide.pdf"));

        assert!(scope.downloads().find_by_token("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_invisible_to_other_tenant() {
        let (db, acme) = setup_store("acme").await;
        let globex = add_store(&db, "globex").await;
        let token = seed_digital_order(&acme, "pay_1", None, Some("a.zip")).await;

        let item = acme.downloads().find_by_token(&token).await.unwrap().unwrap();

        assert!(globex.downloads().find_by_token(&token).await.unwrap().is_none());
        assert!(globex.downloads().current_count(&item.order_item_id).await.unwrap().is_none());
        assert!(!globex
            .downloads()
            .compare_and_increment(&item.order_item_id, 0)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_increment() {
        let (_db, scope) = setup_store("acme").await;
        let token = seed_digital_order(&scope, "pay_1", Some(5), Some("a.zip")).await;
        let repo = scope.downloads();
        let item = repo.find_by_token(&token).await.unwrap().unwrap();

        assert!(repo.compare_and_increment(&item.order_item_id, 0).await.unwrap());
        // A second writer still holding count = 0 loses
        assert!(!repo.compare_and_increment(&item.order_item_id, 0).await.unwrap());
        assert!(repo.compare_and_increment(&item.order_item_id, 1).await.unwrap());

        assert_eq!(repo.current_count(&item.order_item_id).await.unwrap(), Some(2));
    }
}
