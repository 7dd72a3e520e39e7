//! Digital download counter.
//!
//! ## Registering a Download
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ 1. token → order item (through its order's tenant)    ✗ NotFound       │
//! │ 2. product asset locator                              ✗ AssetUnavail.  │
//! │ 3. count c                                                              │
//! │ 4. c >= limit                                         ✗ LimitReached   │
//! │ 5. UPDATE count = c + 1 WHERE count = c                                │
//! │      0 rows → re-read → at limit                      ✗ LimitReached   │
//! │                       → under limit                   ✗ Retryable      │
//! │ 6. sign a short-lived URL for the asset               ✓ SignedUrl      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A URL is only signed after the increment applied, and an increment is
//! never applied without the URL being returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use storefront_core::entitlement::{check_download, resolve_contention};
use storefront_core::DownloadError;
use storefront_db::EntitlementStore;

use crate::error::ServiceResult;
use crate::signer::{AssetSigner, SignedUrl};

pub struct DownloadCounter<S> {
    store: S,
    signer: Arc<dyn AssetSigner>,
}

impl<S: EntitlementStore> DownloadCounter<S> {
    pub fn new(store: S, signer: Arc<dyn AssetSigner>) -> Self {
        DownloadCounter { store, signer }
    }

    pub async fn register_download(&self, token: &str) -> ServiceResult<SignedUrl> {
        self.register_download_at(token, Utc::now()).await
    }

    pub async fn register_download_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<SignedUrl> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DownloadError::NotFound.into());
        }

        let entitlement = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(DownloadError::NotFound)?;

        let locator = entitlement
            .asset_locator
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .ok_or(DownloadError::AssetUnavailable)?;

        let count = entitlement.download_count;
        let limit = entitlement.download_limit;
        check_download(count, limit)?;

        let applied = self
            .store
            .compare_and_increment(&entitlement.order_item_id, count)
            .await?;

        if !applied {
            let fresh = self
                .store
                .current_count(&entitlement.order_item_id)
                .await?
                .ok_or(DownloadError::NotFound)?;
            let refusal = resolve_contention(fresh, limit);
            warn!(
                order_item_id = %entitlement.order_item_id,
                expected = count,
                fresh,
                retryable = refusal.is_retryable(),
                "Download counter contention"
            );
            return Err(refusal.into());
        }

        info!(
            order_item_id = %entitlement.order_item_id,
            count = count + 1,
            limit = ?limit,
            "Download registered"
        );

        let signed = self.signer.sign_url(locator, now);
        debug!(expires_at = %signed.expires_at, "Signed download URL");
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::signer::tests::parse;
    use crate::test_support::{add_store, product, setup_store, signer, ASSET_BASE};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storefront_core::{DownloadEntitlement, Order, OrderItem};
    use storefront_db::{DbResult, EntitlementRepository, TenantScope};
    use uuid::Uuid;

    /// Digital product plus a paid order for it; returns the download token.
    async fn purchase(scope: &TenantScope, limit: Option<i64>, locator: Option<&str>) -> String {
        let product_id = Uuid::new_v4().to_string();
        let mut p = product(&product_id, 900, locator.map(|l| (l, limit)));
        p.is_digital = true;
        p.download_limit = limit;
        scope.products().insert(&p).await.unwrap();

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            tenant_id: String::new(),
            payment_ref: format!("pay-{product_id}"),
            customer_email: "buyer@example.com".to_string(),
            subtotal_cents: 900,
            discount_cents: 0,
            gift_card_cents: 0,
            total_cents: 900,
            coupon_code: None,
            gift_card_code: None,
            created_at: now,
        };
        let token = format!("tok-{product_id}");
        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            product_id,
            name_snapshot: p.name.clone(),
            unit_price_cents: 900,
            quantity: 1,
            download_token: Some(token.clone()),
            download_count: 0,
            created_at: now,
        };
        scope.orders().insert_with_items(&order, &[item]).await.unwrap();
        token
    }

    fn counter<S: EntitlementStore>(store: S) -> DownloadCounter<S> {
        DownloadCounter::new(store, signer())
    }

    #[tokio::test]
    async fn test_sequential_limit() {
        let (_db, scope) = setup_store("acme").await;
        let token = purchase(&scope, Some(2), Some("guides/field-guide.pdf")).await;
        let counter = counter(scope.downloads());

        let now = Utc::now();
        let first = counter.register_download_at(&token, now).await.unwrap();
        assert!(first.url.starts_with("https://cdn.example.com/guides/field-guide.pdf?"));
        let (_, expires, signature) = parse(&first.url, ASSET_BASE);
        assert!(signer()
            .verify("guides/field-guide.pdf", expires, &signature, now)
            .is_ok());

        counter.register_download(&token).await.unwrap();
        let third = counter.register_download(&token).await.unwrap_err();
        assert!(matches!(
            third,
            ServiceError::Download(DownloadError::LimitReached { limit: 2 })
        ));

        let item = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(item.download_count, 2);
    }

    #[tokio::test]
    async fn test_unlimited_downloads() {
        let (_db, scope) = setup_store("acme").await;
        let token = purchase(&scope, None, Some("packs/sample.zip")).await;
        let counter = counter(scope.downloads());

        for _ in 0..10 {
            counter.register_download(&token).await.unwrap();
        }
        let item = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(item.download_count, 10);
    }

    #[tokio::test]
    async fn test_permanent_refusals() {
        let (db, scope) = setup_store("acme").await;
        let other = add_store(&db, "globex").await;
        let no_asset = purchase(&scope, Some(3), None).await;
        let token = purchase(&scope, Some(3), Some("a.zip")).await;

        let err = counter(scope.downloads()).register_download(&no_asset).await.unwrap_err();
        assert!(matches!(err, ServiceError::Download(DownloadError::AssetUnavailable)));

        let err = counter(scope.downloads()).register_download("unknown").await.unwrap_err();
        assert!(matches!(err, ServiceError::Download(DownloadError::NotFound)));

        let err = counter(scope.downloads()).register_download("  ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Download(DownloadError::NotFound)));

        // Another store's token is simply unknown
        let err = counter(other.downloads()).register_download(&token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Download(DownloadError::NotFound)));

        // Refusals leave the counter alone
        let item = scope.downloads().find_by_token(&no_asset).await.unwrap().unwrap();
        assert_eq!(item.download_count, 0);
    }

    /// Store where another request increments the counter between our read
    /// and our conditional update.
    struct Interleaved {
        inner: EntitlementRepository,
        fired: AtomicBool,
    }

    #[async_trait]
    impl EntitlementStore for Interleaved {
        async fn find_by_token(&self, token: &str) -> DbResult<Option<DownloadEntitlement>> {
            self.inner.find_by_token(token).await
        }
        async fn current_count(&self, order_item_id: &str) -> DbResult<Option<i64>> {
            self.inner.current_count(order_item_id).await
        }
        async fn compare_and_increment(&self, order_item_id: &str, expected: i64) -> DbResult<bool> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                assert!(self.inner.compare_and_increment(order_item_id, expected).await?);
            }
            self.inner.compare_and_increment(order_item_id, expected).await
        }
    }

    fn interleaved(scope: &TenantScope) -> DownloadCounter<Interleaved> {
        counter(Interleaved {
            inner: scope.downloads(),
            fired: AtomicBool::new(false),
        })
    }

    #[tokio::test]
    async fn test_lost_race_at_limit_is_limit_reached() {
        let (_db, scope) = setup_store("acme").await;
        let token = purchase(&scope, Some(1), Some("a.zip")).await;

        let err = interleaved(&scope).register_download(&token).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Download(DownloadError::LimitReached { limit: 1 })
        ));

        let item = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(item.download_count, 1);
    }

    #[tokio::test]
    async fn test_lost_race_under_limit_is_retryable() {
        let (_db, scope) = setup_store("acme").await;
        let token = purchase(&scope, Some(5), Some("a.zip")).await;
        let counter = interleaved(&scope);

        let err = counter.register_download(&token).await.unwrap_err();
        assert!(err.is_retryable());

        // The caller's retry succeeds
        counter.register_download(&token).await.unwrap();
        let item = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(item.download_count, 2);
    }

    #[tokio::test]
    async fn test_two_simultaneous_requests_at_last_download() {
        let (_db, scope) = setup_store("acme").await;
        let token = purchase(&scope, Some(1), Some("a.zip")).await;
        let a = counter(scope.downloads());
        let b = counter(scope.downloads());

        let (ra, rb) = tokio::join!(a.register_download(&token), b.register_download(&token));

        let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        for refused in [ra, rb].into_iter().filter_map(Result::err) {
            assert!(matches!(
                refused,
                ServiceError::Download(DownloadError::LimitReached { .. } | DownloadError::Retryable)
            ));
        }

        let item = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert_eq!(item.download_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_exceed_limit() {
        let (_db, scope) = setup_store("acme").await;
        let token = purchase(&scope, Some(3), Some("a.zip")).await;
        let counter = Arc::new(counter(scope.downloads()));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let counter = Arc::clone(&counter);
                let token = token.clone();
                tokio::spawn(async move { counter.register_download(&token).await })
            })
            .collect();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        let item = scope.downloads().find_by_token(&token).await.unwrap().unwrap();
        assert!(granted <= 3);
        assert_eq!(item.download_count, granted);
    }
}
