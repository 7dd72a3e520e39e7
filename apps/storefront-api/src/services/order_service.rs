//! Order fulfillment.
//!
//! Turns a payment-succeeded report from the payment processor into an order,
//! its line items and their download entitlements.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate report                                  ✗ 400             │
//! │  2. payment_ref already recorded?                    ✗ 409 conflict    │
//! │  3. load products, price items, draw download tokens ✗ 400             │
//! │  4. debit gift card (CAS)                            ✗ 409 / 422       │
//! │  5. insert order + items (one transaction)                              │
//! │        └─ failed → put the gift card debit back                        │
//! │  6. record coupon use (guarded increment, best effort)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The gift card is debited before the order exists so that losing the
//! balance race leaves nothing behind and the processor's re-delivery can
//! simply try again. Once the order is committed, re-delivery is a conflict.

use std::collections::HashMap;

use chrono::Utc;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use storefront_core::entitlement::generate_download_token;
use storefront_core::validation::{
    validate_email, validate_lookup_code, validate_name, validate_non_negative_cents,
    validate_quantity,
};
use storefront_core::{GiftCardDebit, Money, Order, OrderItem, Product, ValidationError};
use storefront_db::{CouponStore, GiftCardRepository, GiftCardStore, TenantScope};

use crate::error::{ServiceError, ServiceResult};
use crate::services::gift_card_service::{GiftCardLedger, Redemption};

/// A line item as reported by the payment processor.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportedItem {
    pub product_id: String,
    pub quantity: i64,
    /// Price charged; the catalog price when absent
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
}

/// Payment-succeeded report.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentReport {
    pub payment_ref: String,
    pub customer_email: String,
    pub items: Vec<ReportedItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub discount_cents: i64,
    #[serde(default)]
    pub gift_card_code: Option<String>,
    #[serde(default)]
    pub gift_card_cents: i64,
}

/// A recorded order.
#[derive(Debug, Clone, Serialize)]
pub struct FulfilledOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// `None` when no coupon was used, `Some(false)` when its limit was
    /// already reached
    pub coupon_use_recorded: Option<bool>,
    pub gift_card_debit: Option<GiftCardDebit>,
}

pub struct OrderFulfillment<G = GiftCardRepository> {
    scope: TenantScope,
    ledger: GiftCardLedger<G>,
}

impl<G> OrderFulfillment<G>
where
    G: GiftCardStore + Clone + 'static,
{
    pub fn new(scope: TenantScope, ledger: GiftCardLedger<G>) -> Self {
        OrderFulfillment { scope, ledger }
    }

    pub async fn fulfill<R>(&self, report: PaymentReport, rng: &mut R) -> ServiceResult<FulfilledOrder>
    where
        R: RngCore + CryptoRng,
    {
        let payment_ref = validate_name("payment_ref", &report.payment_ref, 255)?;
        let customer_email = validate_email(&report.customer_email)?;
        if report.items.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        for item in &report.items {
            validate_quantity(item.quantity)?;
            if let Some(price) = item.unit_price_cents {
                validate_non_negative_cents("unit_price_cents", price)?;
            }
        }
        validate_non_negative_cents("discount_cents", report.discount_cents)?;
        validate_non_negative_cents("gift_card_cents", report.gift_card_cents)?;
        let coupon_code = report
            .coupon_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| validate_lookup_code("coupon_code", c))
            .transpose()?;
        let gift_card_code = report
            .gift_card_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| validate_lookup_code("gift_card_code", c))
            .transpose()?;

        let orders = self.scope.orders();
        if orders.find_by_payment_ref(&payment_ref).await?.is_some() {
            info!(payment_ref = %payment_ref, "Payment already fulfilled");
            return Err(ServiceError::Conflict("Order already fulfilled".to_string()));
        }

        let products = self.load_products(&report.items).await?;

        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();
        let items: Vec<OrderItem> = report
            .items
            .iter()
            .filter_map(|reported| products.get(&reported.product_id).map(|p| (reported, p)))
            .map(|(reported, product)| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                unit_price_cents: reported.unit_price_cents.unwrap_or(product.price_cents),
                quantity: reported.quantity,
                download_token: product.is_digital.then(|| generate_download_token(&mut *rng)),
                download_count: 0,
                created_at: now,
            })
            .collect();

        let subtotal = items
            .iter()
            .try_fold(Money::zero(), |acc, i| {
                Money::from_cents(i.unit_price_cents)
                    .checked_mul(i.quantity)
                    .and_then(|line| acc.checked_add(line))
            })
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "subtotal_cents".to_string(),
                min: 0,
                max: i64::MAX,
            })?;
        let deductions =
            Money::from_cents(report.discount_cents.saturating_add(report.gift_card_cents));
        if deductions > subtotal {
            return Err(ValidationError::OutOfRange {
                field: "discount_cents + gift_card_cents".to_string(),
                min: 0,
                max: subtotal.cents(),
            }
            .into());
        }

        let redemption = match (&gift_card_code, report.gift_card_cents) {
            (Some(code), cents) if cents > 0 => Some(self.debit_gift_card(code, cents).await?),
            _ => None,
        };

        let order = Order {
            id: order_id,
            tenant_id: self.scope.tenant().to_string(),
            payment_ref,
            customer_email,
            subtotal_cents: subtotal.cents(),
            discount_cents: report.discount_cents,
            gift_card_cents: report.gift_card_cents,
            total_cents: (subtotal - deductions).cents(),
            coupon_code: coupon_code.clone(),
            gift_card_code,
            created_at: now,
        };

        if let Err(e) = orders.insert_with_items(&order, &items).await {
            if let Some(redemption) = &redemption {
                self.undo_debit(redemption).await;
            }
            return Err(e.into());
        }

        let coupon_use_recorded = match &coupon_code {
            Some(code) => Some(self.record_coupon_use(code).await),
            None => None,
        };

        info!(
            order_id = %order.id,
            payment_ref = %order.payment_ref,
            total = %Money::from_cents(order.total_cents),
            downloads = items.iter().filter(|i| i.download_token.is_some()).count(),
            "Order fulfilled"
        );

        Ok(FulfilledOrder {
            order,
            items,
            coupon_use_recorded,
            gift_card_debit: redemption.map(|r| r.debit),
        })
    }

    async fn load_products(&self, items: &[ReportedItem]) -> ServiceResult<HashMap<String, Product>> {
        let repo = self.scope.products();
        let mut products = HashMap::new();

        for item in items {
            if products.contains_key(&item.product_id) {
                continue;
            }
            let product = repo.get_by_id(&item.product_id).await?.ok_or_else(|| {
                ValidationError::InvalidFormat {
                    field: "product_id".to_string(),
                    reason: format!("unknown product {}", item.product_id),
                }
            })?;
            products.insert(product.id.clone(), product);
        }

        Ok(products)
    }

    /// Debits exactly the reported amount, or nothing.
    async fn debit_gift_card(&self, code: &str, cents: i64) -> ServiceResult<Redemption> {
        let redemption = self.ledger.redeem(code, cents).await?;

        if redemption.debit.amount.cents() < cents {
            self.undo_debit(&redemption).await;
            return Err(ServiceError::Rejected(format!(
                "Gift card balance does not cover {}",
                Money::from_cents(cents)
            )));
        }

        Ok(redemption)
    }

    async fn undo_debit(&self, redemption: &Redemption) {
        match self.ledger.reverse(redemption).await {
            Ok(true) => {}
            Ok(false) => error!(
                gift_card_id = %redemption.card.id,
                amount = %redemption.debit.amount,
                "Could not restore gift card debit, balance would exceed original amount"
            ),
            Err(e) => error!(
                gift_card_id = %redemption.card.id,
                amount = %redemption.debit.amount,
                error = %e,
                "Could not restore gift card debit"
            ),
        }
    }

    /// The order is paid for either way; a coupon at its limit is only logged.
    async fn record_coupon_use(&self, code: &str) -> bool {
        match self.scope.coupons().record_use(code).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(code = %code, "Coupon use not recorded, limit reached or coupon gone");
                false
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Coupon use not recorded");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::services::download_service::DownloadCounter;
    use crate::test_support::{coupon, gift_card, product, setup_store, signer};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use storefront_core::{Denominations, DiscountKind, GiftCard, GiftCardStatus};
    use storefront_db::{Database, DbResult};

    async fn shop() -> (Database, TenantScope, OrderFulfillment) {
        let (db, scope) = setup_store("acme").await;
        scope.products().insert(&product("mug", 1800, None)).await.unwrap();
        scope
            .products()
            .insert(&product("guide", 1200, Some(("guides/field-guide.pdf", Some(2)))))
            .await
            .unwrap();

        let mut once = coupon("LAUNCH", DiscountKind::Fixed, 500);
        once.max_uses = Some(1);
        scope.coupons().insert(&once).await.unwrap();
        scope
            .gift_cards()
            .insert(&gift_card("g1", "GIFT-AAAA-BBBB-CCCC", 2000))
            .await
            .unwrap();

        let ledger = GiftCardLedger::new(
            scope.gift_cards(),
            Arc::new(LogNotifier),
            Denominations::default(),
        );
        let fulfillment = OrderFulfillment::new(scope.clone(), ledger);
        (db, scope, fulfillment)
    }

    fn report(payment_ref: &str) -> PaymentReport {
        PaymentReport {
            payment_ref: payment_ref.to_string(),
            customer_email: "buyer@example.com".to_string(),
            items: vec![
                ReportedItem {
                    product_id: "mug".to_string(),
                    quantity: 2,
                    unit_price_cents: None,
                },
                ReportedItem {
                    product_id: "guide".to_string(),
                    quantity: 1,
                    unit_price_cents: None,
                },
            ],
            coupon_code: Some("launch".to_string()),
            discount_cents: 500,
            gift_card_code: Some("GIFT-AAAA-BBBB-CCCC".to_string()),
            gift_card_cents: 1500,
        }
    }

    async fn balance(scope: &TenantScope) -> i64 {
        scope
            .gift_cards()
            .find_by_id("g1")
            .await
            .unwrap()
            .unwrap()
            .current_balance_cents
    }

    #[tokio::test]
    async fn test_fulfill_records_everything() {
        let (_db, scope, fulfillment) = shop().await;
        let mut rng = StdRng::seed_from_u64(5);

        let done = fulfillment.fulfill(report("pay_1"), &mut rng).await.unwrap();

        assert_eq!(done.order.subtotal_cents, 4800);
        assert_eq!(done.order.total_cents, 4800 - 500 - 1500);
        assert_eq!(done.coupon_use_recorded, Some(true));
        assert_eq!(done.gift_card_debit.unwrap().amount.cents(), 1500);
        assert_eq!(balance(&scope).await, 500);

        let tokens: Vec<_> = done.items.iter().filter_map(|i| i.download_token.clone()).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].len(), 43);

        let stored = scope.orders().find_by_payment_ref("pay_1").await.unwrap().unwrap();
        assert_eq!(scope.orders().get_items(&stored.id).await.unwrap().len(), 2);

        let launch = scope.coupons().find_by_code("LAUNCH").await.unwrap().unwrap();
        assert_eq!(launch.current_uses, 1);

        // The token is a working entitlement
        let counter = DownloadCounter::new(scope.downloads(), signer());
        counter.register_download(&tokens[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_redelivery_is_a_conflict_and_changes_nothing() {
        let (_db, scope, fulfillment) = shop().await;
        let mut rng = StdRng::seed_from_u64(6);
        fulfillment.fulfill(report("pay_1"), &mut rng).await.unwrap();

        let err = fulfillment.fulfill(report("pay_1"), &mut rng).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(balance(&scope).await, 500);

        let launch = scope.coupons().find_by_code("LAUNCH").await.unwrap().unwrap();
        assert_eq!(launch.current_uses, 1);
    }

    #[tokio::test]
    async fn test_coupon_at_limit_does_not_block_paid_order() {
        let (_db, scope, fulfillment) = shop().await;
        let mut rng = StdRng::seed_from_u64(7);
        let mut first = report("pay_1");
        first.gift_card_code = None;
        first.gift_card_cents = 0;
        fulfillment.fulfill(first.clone(), &mut rng).await.unwrap();

        first.payment_ref = "pay_2".to_string();
        let done = fulfillment.fulfill(first, &mut rng).await.unwrap();
        assert_eq!(done.coupon_use_recorded, Some(false));
        assert!(done.gift_card_debit.is_none());
        assert!(scope.orders().find_by_payment_ref("pay_2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insufficient_gift_card_leaves_no_trace() {
        let (_db, scope, fulfillment) = shop().await;
        let mut rng = StdRng::seed_from_u64(8);
        let mut too_much = report("pay_1");
        too_much.gift_card_cents = 2500;
        too_much.discount_cents = 0;

        let err = fulfillment.fulfill(too_much, &mut rng).await.unwrap_err();
        assert!(matches!(err, ServiceError::Rejected(_)));
        assert_eq!(balance(&scope).await, 2000);
        assert!(scope.orders().find_by_payment_ref("pay_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_reports() {
        let (_db, scope, fulfillment) = shop().await;
        let mut rng = StdRng::seed_from_u64(9);

        let mut unknown = report("pay_1");
        unknown.items[0].product_id = "nope".to_string();
        assert!(matches!(
            fulfillment.fulfill(unknown, &mut rng).await,
            Err(ServiceError::Validation(_))
        ));

        let mut empty = report("pay_1");
        empty.items.clear();
        assert!(matches!(
            fulfillment.fulfill(empty, &mut rng).await,
            Err(ServiceError::Validation(_))
        ));

        let mut overdrawn = report("pay_1");
        overdrawn.discount_cents = 4000;
        assert!(matches!(
            fulfillment.fulfill(overdrawn, &mut rng).await,
            Err(ServiceError::Validation(_))
        ));

        let mut zero_qty = report("pay_1");
        zero_qty.items[1].quantity = 0;
        assert!(matches!(
            fulfillment.fulfill(zero_qty, &mut rng).await,
            Err(ServiceError::Validation(_))
        ));

        // Nothing was debited by any of the rejected reports
        assert_eq!(balance(&scope).await, 2000);
    }

    #[tokio::test]
    async fn test_undo_debit_restores_balance() {
        let (_db, scope, fulfillment) = shop().await;

        let redemption = fulfillment.ledger.redeem("GIFT-AAAA-BBBB-CCCC", 700).await.unwrap();
        assert_eq!(balance(&scope).await, 1300);

        fulfillment.undo_debit(&redemption).await;
        assert_eq!(balance(&scope).await, 2000);
    }

    #[tokio::test]
    async fn test_overflowing_subtotal_is_rejected() {
        let (_db, scope, fulfillment) = shop().await;
        let mut rng = StdRng::seed_from_u64(10);
        let mut huge = report("pay_1");
        for item in &mut huge.items {
            item.quantity = 1;
            item.unit_price_cents = Some(i64::MAX / 2 + 1);
        }

        let err = fulfillment.fulfill(huge, &mut rng).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(balance(&scope).await, 2000);
        assert!(scope.orders().find_by_payment_ref("pay_1").await.unwrap().is_none());
    }

    /// Store where, right after the first successful debit, another checkout
    /// takes 100 cents from the same card and records an order under the
    /// same payment reference.
    #[derive(Clone)]
    struct CompetingCheckout {
        inner: GiftCardRepository,
        scope: TenantScope,
        payment_ref: String,
        fired: Arc<AtomicBool>,
    }

    #[async_trait]
    impl GiftCardStore for CompetingCheckout {
        async fn find_by_code(&self, code: &str) -> DbResult<Option<GiftCard>> {
            self.inner.find_by_code(code).await
        }
        async fn find_by_id(&self, id: &str) -> DbResult<Option<GiftCard>> {
            self.inner.find_by_id(id).await
        }
        async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<GiftCard>> {
            self.inner.search(query, limit).await
        }
        async fn insert(&self, card: &GiftCard) -> DbResult<()> {
            self.inner.insert(card).await
        }
        async fn compare_and_set_balance(&self, id: &str, expected: i64, new: i64) -> DbResult<bool> {
            let applied = self.inner.compare_and_set_balance(id, expected, new).await?;
            if applied && !self.fired.swap(true, Ordering::SeqCst) {
                assert!(self.inner.compare_and_set_balance(id, new, new - 100).await?);
                let order = Order {
                    id: "competitor".to_string(),
                    tenant_id: self.scope.tenant().to_string(),
                    payment_ref: self.payment_ref.clone(),
                    customer_email: "other@example.com".to_string(),
                    subtotal_cents: 100,
                    discount_cents: 0,
                    gift_card_cents: 100,
                    total_cents: 0,
                    coupon_code: None,
                    gift_card_code: None,
                    created_at: Utc::now(),
                };
                self.scope.orders().insert_with_items(&order, &[]).await?;
            }
            Ok(applied)
        }
        async fn restore_balance(&self, id: &str, amount: i64) -> DbResult<bool> {
            self.inner.restore_balance(id, amount).await
        }
        async fn set_status(&self, id: &str, status: GiftCardStatus) -> DbResult<bool> {
            self.inner.set_status(id, status).await
        }
        async fn mark_email_sent(&self, id: &str, at: DateTime<Utc>) -> DbResult<()> {
            self.inner.mark_email_sent(id, at).await
        }
    }

    #[tokio::test]
    async fn test_failed_insert_after_competing_debit_restores_balance() {
        let (_db, scope, _) = shop().await;
        let store = CompetingCheckout {
            inner: scope.gift_cards(),
            scope: scope.clone(),
            payment_ref: "pay_1".to_string(),
            fired: Arc::default(),
        };
        let ledger = GiftCardLedger::new(store, Arc::new(LogNotifier), Denominations::default());
        let fulfillment = OrderFulfillment::new(scope.clone(), ledger);
        let mut rng = StdRng::seed_from_u64(11);

        let err = fulfillment.fulfill(report("pay_1"), &mut rng).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Our 1500 is back; only the competitor's 100 stays spent
        assert_eq!(balance(&scope).await, 1900);

        let stored = scope.orders().find_by_payment_ref("pay_1").await.unwrap().unwrap();
        assert_eq!(stored.id, "competitor");
        let launch = scope.coupons().find_by_code("LAUNCH").await.unwrap().unwrap();
        assert_eq!(launch.current_uses, 0);
    }
}
