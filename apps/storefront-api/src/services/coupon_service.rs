//! Coupon evaluator.
//!
//! ```text
//! evaluate(code, cart_total)
//!   │
//!   ├── validate input ─────────────► ValidationError (400)
//!   ├── find_by_code (NOCASE) ──────► storage error  (503)
//!   └── evaluate_coupon(...) ───────► Valid { discount } | Invalid(reason)
//! ```
//!
//! Evaluation never touches the use counter. Uses are recorded when an order
//! is fulfilled, so repeated price checks cannot burn a limited coupon.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use storefront_core::coupon::{validate_coupon_draft, CouponDraft};
use storefront_core::validation::{
    clamp_list_limit, validate_cart_total, validate_lookup_code, validate_search_query,
};
use storefront_core::{evaluate_coupon, Coupon, CouponOutcome, Money};
use storefront_db::CouponStore;

use crate::error::{ServiceError, ServiceResult};

pub struct CouponEvaluator<S> {
    store: S,
}

impl<S: CouponStore> CouponEvaluator<S> {
    pub fn new(store: S) -> Self {
        CouponEvaluator { store }
    }

    /// Decides whether `code` applies to a cart of `cart_total_cents`.
    pub async fn evaluate(&self, code: &str, cart_total_cents: i64) -> ServiceResult<CouponOutcome> {
        self.evaluate_at(code, cart_total_cents, Utc::now()).await
    }

    pub async fn evaluate_at(
        &self,
        code: &str,
        cart_total_cents: i64,
        now: DateTime<Utc>,
    ) -> ServiceResult<CouponOutcome> {
        let code = validate_lookup_code("code", code)?;
        validate_cart_total(cart_total_cents)?;

        let coupon = self.store.find_by_code(&code).await?;
        let outcome = evaluate_coupon(coupon.as_ref(), Money::from_cents(cart_total_cents), now);

        debug!(valid = outcome.is_valid(), discount = %outcome.discount(), "Evaluated coupon");
        Ok(outcome)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub async fn create(&self, draft: CouponDraft) -> ServiceResult<Coupon> {
        let draft = validate_coupon_draft(draft)?;
        let coupon = draft.into_coupon(Uuid::new_v4().to_string(), String::new(), Utc::now());

        self.store.insert(&coupon).await?;
        info!(id = %coupon.id, code = %coupon.code, "Coupon created");

        self.reload(&coupon.id).await
    }

    pub async fn update(&self, id: &str, draft: CouponDraft) -> ServiceResult<Coupon> {
        let draft = validate_coupon_draft(draft)?;
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        let updated = draft.apply_to(&existing, Utc::now());
        self.store.update(&updated).await?;
        info!(id = %id, code = %updated.code, "Coupon updated");

        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.store.delete(id).await?;
        info!(id = %id, "Coupon deleted");
        Ok(())
    }

    pub async fn list(&self, query: &str, limit: Option<u32>) -> ServiceResult<Vec<Coupon>> {
        let query = validate_search_query(query)?;
        Ok(self.store.search(&query, clamp_list_limit(limit)).await?)
    }

    async fn reload(&self, id: &str) -> ServiceResult<Coupon> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))
    }
}
