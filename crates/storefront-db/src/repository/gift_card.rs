//! # Gift Card Repository
//!
//! Gift cards for one tenant.
//!
//! ## Balance Compare-and-Swap
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Request A (debit 30)           Request B (debit 50)                   │
//! │  read balance = 100             read balance = 100                     │
//! │  SET balance = 70               SET balance = 50                       │
//! │  WHERE balance = 100  ✓ 1 row   WHERE balance = 100  ✗ 0 rows          │
//! │                                 re-read → 70 → caller decides          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The balance column is its own version marker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repo::GiftCardStore;
use crate::repository::contains_pattern;
use storefront_core::{GiftCard, GiftCardStatus, TenantId};

#[derive(Debug, Clone)]
pub struct GiftCardRepository {
    pool: SqlitePool,
    tenant: TenantId,
}

impl GiftCardRepository {
    pub(crate) fn new(pool: SqlitePool, tenant: TenantId) -> Self {
        GiftCardRepository { pool, tenant }
    }
}

#[async_trait]
impl GiftCardStore for GiftCardRepository {
    async fn find_by_code(&self, code: &str) -> DbResult<Option<GiftCard>> {
        debug!(tenant = %self.tenant, "Looking up gift card by code");

        let card = sqlx::query_as::<_, GiftCard>(
            r#"
            SELECT id, tenant_id, code, original_amount_cents, current_balance_cents,
                   status, recipient_email, recipient_name, sender_name, message,
                   issued_at, email_sent_at
            FROM gift_cards
            WHERE tenant_id = ?1 AND code = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn find_by_id(&self, id: &str) -> DbResult<Option<GiftCard>> {
        let card = sqlx::query_as::<_, GiftCard>(
            r#"
            SELECT id, tenant_id, code, original_amount_cents, current_balance_cents,
                   status, recipient_email, recipient_name, sender_name, message,
                   issued_at, email_sent_at
            FROM gift_cards
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(card)
    }

    async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<GiftCard>> {
        let query = query.trim();

        let cards = sqlx::query_as::<_, GiftCard>(
            r#"
            SELECT id, tenant_id, code, original_amount_cents, current_balance_cents,
                   status, recipient_email, recipient_name, sender_name, message,
                   issued_at, email_sent_at
            FROM gift_cards
            WHERE tenant_id = ?1
              AND (?2 = '' OR code LIKE ?3 ESCAPE '\' OR recipient_email LIKE ?3 ESCAPE '\')
            ORDER BY issued_at DESC
            LIMIT ?4
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(query)
        .bind(contains_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(tenant = %self.tenant, count = cards.len(), "Listed gift cards");
        Ok(cards)
    }

    async fn insert(&self, card: &GiftCard) -> DbResult<()> {
        debug!(tenant = %self.tenant, id = %card.id, "Inserting gift card");

        sqlx::query(
            r#"
            INSERT INTO gift_cards (
                id, tenant_id, code, original_amount_cents, current_balance_cents,
                status, recipient_email, recipient_name, sender_name, message,
                issued_at, email_sent_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&card.id)
        .bind(self.tenant.as_str())
        .bind(&card.code)
        .bind(card.original_amount_cents)
        .bind(card.current_balance_cents)
        .bind(card.status)
        .bind(&card.recipient_email)
        .bind(&card.recipient_name)
        .bind(&card.sender_name)
        .bind(&card.message)
        .bind(card.issued_at)
        .bind(card.email_sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn compare_and_set_balance(&self, id: &str, expected: i64, new: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE gift_cards
            SET current_balance_cents = ?4
            WHERE tenant_id = ?1 AND id = ?2
              AND current_balance_cents = ?3
              AND status = 'active'
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(tenant = %self.tenant, id = %id, expected, new, applied, "Gift card balance CAS");
        Ok(applied)
    }

    async fn restore_balance(&self, id: &str, amount: i64) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE gift_cards
            SET current_balance_cents = current_balance_cents + ?3
            WHERE tenant_id = ?1 AND id = ?2
              AND ?3 > 0
              AND current_balance_cents + ?3 <= original_amount_cents
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(tenant = %self.tenant, id = %id, amount, applied, "Gift card balance restore");
        Ok(applied)
    }

    async fn set_status(&self, id: &str, status: GiftCardStatus) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE gift_cards
            SET status = ?3
            WHERE tenant_id = ?1 AND id = ?2
              AND (?3 = 'disabled' OR current_balance_cents > 0)
            "#,
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_email_sent(&self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE gift_cards SET email_sent_at = ?3 WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(self.tenant.as_str())
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("GiftCard", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{add_store, setup_store};

    fn card(id: &str, code: &str, balance: i64) -> GiftCard {
        GiftCard {
            id: id.to_string(),
            tenant_id: String::new(),
            code: code.to_string(),
            original_amount_cents: 5000,
            current_balance_cents: balance,
            status: GiftCardStatus::Active,
            recipient_email: "ada@example.com".to_string(),
            recipient_name: Some("Ada".to_string()),
            sender_name: None,
            message: None,
            issued_at: Utc::now(),
            email_sent_at: None,
        }
    }

    #[tokio::test]
    async fn test_code_lookup_is_case_sensitive() {
        let (_db, scope) = setup_store("acme").await;
        let repo = scope.gift_cards();
        repo.insert(&card("g1", "ABCD-EFGH-JKLM-NPQR", 5000)).await.unwrap();

        assert!(repo.find_by_code("ABCD-EFGH-JKLM-NPQR").await.unwrap().is_some());
        assert!(repo.find_by_code("abcd-efgh-jklm-npqr").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_is_globally_unique() {
        let (db, acme) = setup_store("acme").await;
        let globex = add_store(&db, "globex").await;

        acme.gift_cards().insert(&card("g1", "SAME-CODE-XXXX-YYYY", 5000)).await.unwrap();
        let err = globex
            .gift_cards()
            .insert(&card("g2", "SAME-CODE-XXXX-YYYY", 5000))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("gift_cards.code"));

        // Other tenant cannot see the card
        assert!(globex.gift_cards().find_by_code("SAME-CODE-XXXX-YYYY").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_compare_and_set_balance() {
        let (_db, scope) = setup_store("acme").await;
        let repo = scope.gift_cards();
        repo.insert(&card("g1", "CODE-0001-AAAA-BBBB", 5000)).await.unwrap();

        assert!(repo.compare_and_set_balance("g1", 5000, 3000).await.unwrap());
        // Stale expectation loses
        assert!(!repo.compare_and_set_balance("g1", 5000, 1000).await.unwrap());

        let stored = repo.find_by_id("g1").await.unwrap().unwrap();
        assert_eq!(stored.current_balance_cents, 3000);
    }

    #[tokio::test]
    async fn test_cas_refused_on_disabled_card() {
        let (_db, scope) = setup_store("acme").await;
        let repo = scope.gift_cards();
        repo.insert(&card("g1", "CODE-0001-AAAA-BBBB", 5000)).await.unwrap();
        assert!(repo.set_status("g1", GiftCardStatus::Disabled).await.unwrap());

        assert!(!repo.compare_and_set_balance("g1", 5000, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_balance_is_additive() {
        let (_db, scope) = setup_store("acme").await;
        let repo = scope.gift_cards();
        repo.insert(&card("g1", "CODE-0001-AAAA-BBBB", 5000)).await.unwrap();
        assert!(repo.compare_and_set_balance("g1", 5000, 4300).await.unwrap());
        assert!(repo.compare_and_set_balance("g1", 4300, 4200).await.unwrap());

        // Lands on top of the later debit
        assert!(repo.restore_balance("g1", 700).await.unwrap());
        assert_eq!(repo.find_by_id("g1").await.unwrap().unwrap().current_balance_cents, 4900);

        // Never above the original amount
        assert!(!repo.restore_balance("g1", 200).await.unwrap());
        assert!(!repo.restore_balance("g1", 0).await.unwrap());

        // Disabled cards still get their money back
        assert!(repo.set_status("g1", GiftCardStatus::Disabled).await.unwrap());
        assert!(repo.restore_balance("g1", 100).await.unwrap());
        let stored = repo.find_by_id("g1").await.unwrap().unwrap();
        assert_eq!(stored.current_balance_cents, 5000);
        assert_eq!(stored.status, GiftCardStatus::Disabled);
    }

    #[tokio::test]
    async fn test_set_status_guard() {
        let (_db, scope) = setup_store("acme").await;
        let repo = scope.gift_cards();
        repo.insert(&card("empty", "CODE-0000-AAAA-BBBB", 0)).await.unwrap();
        repo.insert(&card("funded", "CODE-0500-AAAA-BBBB", 500)).await.unwrap();

        assert!(repo.set_status("empty", GiftCardStatus::Disabled).await.unwrap());
        assert!(!repo.set_status("empty", GiftCardStatus::Active).await.unwrap());

        assert!(repo.set_status("funded", GiftCardStatus::Disabled).await.unwrap());
        assert!(repo.set_status("funded", GiftCardStatus::Active).await.unwrap());

        let empty = repo.find_by_id("empty").await.unwrap().unwrap();
        assert_eq!(empty.status, GiftCardStatus::Disabled);
    }

    #[tokio::test]
    async fn test_mark_email_sent_and_search() {
        let (_db, scope) = setup_store("acme").await;
        let repo = scope.gift_cards();
        repo.insert(&card("g1", "CODE-0001-AAAA-BBBB", 5000)).await.unwrap();

        repo.mark_email_sent("g1", Utc::now()).await.unwrap();
        assert!(repo.find_by_id("g1").await.unwrap().unwrap().email_sent_at.is_some());
        assert!(repo.mark_email_sent("missing", Utc::now()).await.is_err());

        assert_eq!(repo.search("ada@", 10).await.unwrap().len(), 1);
        assert_eq!(repo.search("0001", 10).await.unwrap().len(), 1);
        assert!(repo.search("nobody", 10).await.unwrap().is_empty());
    }
}
