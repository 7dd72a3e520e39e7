//! # Order Repository
//!
//! Orders recorded after the payment processor reports success, with their
//! line items. Digital line items carry the download capability token.
//!
//! An order and its items are written in one transaction: an entitlement
//! never exists without its order, and a retried webhook either finds the
//! whole order or none of it.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use storefront_core::{Order, OrderItem, TenantId};

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    tenant: TenantId,
}

impl OrderRepository {
    pub(crate) fn new(pool: SqlitePool, tenant: TenantId) -> Self {
        OrderRepository { pool, tenant }
    }

    /// Inserts an order and all of its items atomically.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` on `orders.payment_ref` - already fulfilled
    /// * `Err(DbError::ForeignKeyViolation)` - an item names an unknown product
    pub async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> DbResult<()> {
        debug!(
            tenant = %self.tenant,
            payment_ref = %order.payment_ref,
            items = items.len(),
            "Inserting order"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, payment_ref, customer_email, subtotal_cents,
                discount_cents, gift_card_cents, total_cents, coupon_code,
                gift_card_code, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&order.id)
        .bind(self.tenant.as_str())
        .bind(&order.payment_ref)
        .bind(&order.customer_email)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.gift_card_cents)
        .bind(order.total_cents)
        .bind(&order.coupon_code)
        .bind(&order.gift_card_code)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("orders.payment_ref", &order.payment_ref)
            }
            other => other,
        })?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name_snapshot, unit_price_cents,
                    quantity, download_token, download_count, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(&item.download_token)
            .bind(item.download_count)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            tenant = %self.tenant,
            order_id = %order.id,
            total_cents = order.total_cents,
            "Order recorded"
        );
        Ok(())
    }

    /// Finds an order by the payment processor's reference.
    pub async fn find_by_payment_ref(&self, payment_ref: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, tenant_id, payment_ref, customer_email, subtotal_cents,
                   discount_cents, gift_card_cents, total_cents, coupon_code,
                   gift_card_code, created_at
            FROM orders
            WHERE tenant_id = ?1 AND payment_ref = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(payment_ref)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets the items of an order in this tenant.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.name_snapshot,
                   oi.unit_price_cents, oi.quantity, oi.download_token,
                   oi.download_count, oi.created_at
            FROM order_items oi
            INNER JOIN orders o ON o.id = oi.order_id
            WHERE oi.order_id = ?1 AND o.tenant_id = ?2
            ORDER BY oi.created_at, oi.id
            "#,
        )
        .bind(order_id)
        .bind(self.tenant.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::product::tests::product;
    use crate::repository::test_support::setup_store;
    use crate::scope::TenantScope;
    use chrono::Utc;
    use uuid::Uuid;

    fn order(payment_ref: &str) -> Order {
        Order {
            id: Uuid::new_v4().to_string(),
            tenant_id: String::new(),
            payment_ref: payment_ref.to_string(),
            customer_email: "buyer@example.com".to_string(),
            subtotal_cents: 1999,
            discount_cents: 0,
            gift_card_cents: 0,
            total_cents: 1999,
            coupon_code: None,
            gift_card_code: None,
            created_at: Utc::now(),
        }
    }

    fn item(order_id: &str, product_id: &str, token: Option<String>) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            name_snapshot: "Field Guide".to_string(),
            unit_price_cents: 1999,
            quantity: 1,
            download_token: token,
            download_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Inserts a digital product and a one-item order for it; returns the
    /// item's download token.
    pub(crate) async fn seed_digital_order(
        scope: &TenantScope,
        payment_ref: &str,
        limit: Option<i64>,
        locator: Option<&str>,
    ) -> String {
        let product_id = format!("prod-{payment_ref}");
        let mut p = product(&product_id, "Field Guide");
        p.is_digital = true;
        p.download_limit = limit;
        p.asset_locator = locator.map(str::to_string);
        scope.products().insert(&p).await.unwrap();

        let token = format!("tok-{payment_ref}");
        let o = order(payment_ref);
        let items = vec![item(&o.id, &product_id, Some(token.clone()))];
        scope.orders().insert_with_items(&o, &items).await.unwrap();
        token
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (_db, scope) = setup_store("acme").await;
        seed_digital_order(&scope, "pay_1", Some(3), Some("a.zip")).await;

        let stored = scope.orders().find_by_payment_ref("pay_1").await.unwrap().unwrap();
        assert_eq!(stored.tenant_id, "store-acme");

        let items = scope.orders().get_items(&stored.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].download_token.as_deref(), Some("tok-pay_1"));
    }

    #[tokio::test]
    async fn test_duplicate_payment_ref_is_rejected() {
        let (_db, scope) = setup_store("acme").await;
        seed_digital_order(&scope, "pay_1", None, Some("a.zip")).await;

        let err = scope
            .orders()
            .insert_with_items(&order("pay_1"), &[])
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("orders.payment_ref"));
    }

    #[tokio::test]
    async fn test_failed_item_rolls_back_order() {
        let (_db, scope) = setup_store("acme").await;
        let o = order("pay_2");
        let items = vec![item(&o.id, "no-such-product", None)];

        let err = scope.orders().insert_with_items(&o, &items).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(scope.orders().find_by_payment_ref("pay_2").await.unwrap().is_none());
    }
}
