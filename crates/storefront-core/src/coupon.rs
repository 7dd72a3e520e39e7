//! # Coupon Evaluation
//!
//! Decides whether a discount code applies to a cart and how much it takes off.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate_coupon(coupon, cart_total, now)   first failing check wins   │
//! │                                                                         │
//! │  1. not found                     → "Invalid coupon code"              │
//! │  2. is_active = false             → "This coupon is not active"        │
//! │  3. expires_at < now              → "This coupon has expired"          │
//! │  4. starts_at  > now              → "This coupon is not yet valid"     │
//! │  5. current_uses >= max_uses      → "...reached its usage limit"       │
//! │  6. cart_total < minimum          → "Minimum order of $25.00 required" │
//! │  7. Valid:                                                              │
//! │       percentage → round(cart_total × value / 100)                     │
//! │       fixed      → min(value, cart_total)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Evaluation never mutates anything. The use counter moves only when an order
//! that applied the coupon is fulfilled, so repeated price checks cannot burn
//! through a limited coupon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Coupon, DiscountKind};
use crate::validation::{
    validate_amount_cents, validate_coupon_code, validate_max_uses, validate_non_negative_cents,
    validate_optional_text, validate_percentage, ValidationResult,
};

// =============================================================================
// Outcome
// =============================================================================

/// Result of evaluating a coupon against a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponOutcome {
    Valid { discount: Money },
    Invalid(CouponRejection),
}

impl CouponOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CouponOutcome::Valid { .. })
    }

    /// Discount to apply; zero when the coupon was rejected.
    pub fn discount(&self) -> Money {
        match self {
            CouponOutcome::Valid { discount } => *discount,
            CouponOutcome::Invalid(_) => Money::zero(),
        }
    }
}

/// Why a coupon was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    InvalidCode,
    NotActive,
    Expired,
    NotYetValid,
    UsageLimitReached,
    MinimumNotMet { minimum: Money },
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponRejection::InvalidCode => f.write_str("Invalid coupon code"),
            CouponRejection::NotActive => f.write_str("This coupon is not active"),
            CouponRejection::Expired => f.write_str("This coupon has expired"),
            CouponRejection::NotYetValid => f.write_str("This coupon is not yet valid"),
            CouponRejection::UsageLimitReached => {
                f.write_str("This coupon has reached its usage limit")
            }
            CouponRejection::MinimumNotMet { minimum } => {
                write!(f, "Minimum order of {} required", minimum)
            }
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates a looked-up coupon (or its absence) against a cart total.
///
/// ## Example
/// ```rust,ignore
/// let outcome = evaluate_coupon(store.find_by_code("SAVE10").await?.as_ref(),
///                               Money::from_cents(5000), Utc::now());
/// assert_eq!(outcome.discount().cents(), 500);
/// ```
pub fn evaluate_coupon(
    coupon: Option<&Coupon>,
    cart_total: Money,
    now: DateTime<Utc>,
) -> CouponOutcome {
    let Some(coupon) = coupon else {
        return CouponOutcome::Invalid(CouponRejection::InvalidCode);
    };

    if !coupon.is_active {
        return CouponOutcome::Invalid(CouponRejection::NotActive);
    }

    if matches!(coupon.expires_at, Some(expires_at) if expires_at < now) {
        return CouponOutcome::Invalid(CouponRejection::Expired);
    }

    if matches!(coupon.starts_at, Some(starts_at) if starts_at > now) {
        return CouponOutcome::Invalid(CouponRejection::NotYetValid);
    }

    if coupon.is_exhausted() {
        return CouponOutcome::Invalid(CouponRejection::UsageLimitReached);
    }

    if cart_total < coupon.minimum_order() {
        return CouponOutcome::Invalid(CouponRejection::MinimumNotMet {
            minimum: coupon.minimum_order(),
        });
    }

    CouponOutcome::Valid {
        discount: compute_discount(coupon.discount_kind, coupon.discount_value, cart_total),
    }
}

/// Computes the discount for a coupon value, bounded to `0..=cart_total`.
///
/// ## Example
/// ```rust
/// use storefront_core::coupon::compute_discount;
/// use storefront_core::money::Money;
/// use storefront_core::types::DiscountKind;
///
/// // $20 off a $15 cart takes off $15, not $20
/// let d = compute_discount(DiscountKind::Fixed, 2000, Money::from_cents(1500));
/// assert_eq!(d.cents(), 1500);
/// ```
pub fn compute_discount(kind: DiscountKind, value: i64, cart_total: Money) -> Money {
    if !cart_total.is_positive() || value <= 0 {
        return Money::zero();
    }

    let raw = match kind {
        DiscountKind::Percentage => cart_total.percentage_of(value),
        DiscountKind::Fixed => Money::from_cents(value),
    };

    raw.min(cart_total)
}

// =============================================================================
// Admin Input
// =============================================================================

fn default_true() -> bool {
    true
}

/// Coupon fields supplied by the store operator when creating or editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponDraft {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_value: i64,
    #[serde(default)]
    pub minimum_order_cents: i64,
    #[serde(default)]
    pub max_uses: Option<i64>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Checks the coupon invariants and normalizes the code.
///
/// ## Rules
/// - code: see [`validate_coupon_code`]
/// - percentage: 1..=100; fixed: > 0 cents
/// - minimum order >= 0, max uses > 0 when set
/// - starts_at < expires_at when both are set
pub fn validate_coupon_draft(mut draft: CouponDraft) -> ValidationResult<CouponDraft> {
    draft.code = validate_coupon_code(&draft.code)?;
    draft.description = validate_optional_text("description", draft.description.as_deref(), 500)?;

    match draft.discount_kind {
        DiscountKind::Percentage => validate_percentage(draft.discount_value)?,
        DiscountKind::Fixed => validate_amount_cents("discount_value", draft.discount_value)?,
    }

    validate_non_negative_cents("minimum_order_cents", draft.minimum_order_cents)?;
    validate_max_uses(draft.max_uses)?;

    if let (Some(starts_at), Some(expires_at)) = (draft.starts_at, draft.expires_at) {
        if starts_at >= expires_at {
            return Err(ValidationError::InvalidFormat {
                field: "expires_at".to_string(),
                reason: "must be after starts_at".to_string(),
            });
        }
    }

    Ok(draft)
}

impl CouponDraft {
    /// Builds a new coupon from a validated draft.
    pub fn into_coupon(self, id: String, tenant_id: String, now: DateTime<Utc>) -> Coupon {
        Coupon {
            id,
            tenant_id,
            code: self.code,
            description: self.description,
            discount_kind: self.discount_kind,
            discount_value: self.discount_value,
            minimum_order_cents: self.minimum_order_cents,
            max_uses: self.max_uses,
            current_uses: 0,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated draft over an existing coupon. The use counter and
    /// identity are preserved.
    pub fn apply_to(self, existing: &Coupon, now: DateTime<Utc>) -> Coupon {
        Coupon {
            current_uses: existing.current_uses,
            created_at: existing.created_at,
            ..self.into_coupon(existing.id.clone(), existing.tenant_id.clone(), now)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: DiscountKind, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c1".to_string(),
            tenant_id: "t1".to_string(),
            code: "SAVE".to_string(),
            description: None,
            discount_kind: kind,
            discount_value: value,
            minimum_order_cents: 0,
            max_uses: None,
            current_uses: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn test_percentage_coupon() {
        let c = coupon(DiscountKind::Percentage, 10);
        let outcome = evaluate_coupon(Some(&c), cents(5000), Utc::now());
        assert_eq!(outcome, CouponOutcome::Valid { discount: cents(500) });
    }

    #[test]
    fn test_fixed_coupon_capped_at_cart_total() {
        let c = coupon(DiscountKind::Fixed, 2000);
        let outcome = evaluate_coupon(Some(&c), cents(1500), Utc::now());
        assert_eq!(outcome.discount(), cents(1500));
    }

    #[test]
    fn test_missing_coupon_is_invalid_code() {
        let outcome = evaluate_coupon(None, cents(5000), Utc::now());
        assert_eq!(outcome, CouponOutcome::Invalid(CouponRejection::InvalidCode));
    }

    #[test]
    fn test_minimum_order_message_mentions_amount() {
        let mut c = coupon(DiscountKind::Percentage, 10);
        c.minimum_order_cents = 2500;

        let outcome = evaluate_coupon(Some(&c), cents(2000), Utc::now());
        let CouponOutcome::Invalid(rejection) = outcome else {
            panic!("expected rejection");
        };
        assert!(rejection.to_string().contains("$25.00"));

        // Exactly the minimum is enough
        assert!(evaluate_coupon(Some(&c), cents(2500), Utc::now()).is_valid());
    }

    #[test]
    fn test_usage_limit_reached() {
        let mut c = coupon(DiscountKind::Fixed, 100);
        c.max_uses = Some(1);
        c.current_uses = 1;
        assert_eq!(
            evaluate_coupon(Some(&c), cents(10_000), Utc::now()),
            CouponOutcome::Invalid(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_check_order_first_failure_wins() {
        let now = Utc::now();
        let mut c = coupon(DiscountKind::Fixed, 100);
        c.is_active = false;
        c.expires_at = Some(now - Duration::days(1));
        c.max_uses = Some(1);
        c.current_uses = 1;

        assert_eq!(
            evaluate_coupon(Some(&c), cents(0), now),
            CouponOutcome::Invalid(CouponRejection::NotActive)
        );

        c.is_active = true;
        assert_eq!(
            evaluate_coupon(Some(&c), cents(0), now),
            CouponOutcome::Invalid(CouponRejection::Expired)
        );

        c.expires_at = None;
        c.starts_at = Some(now + Duration::days(1));
        assert_eq!(
            evaluate_coupon(Some(&c), cents(0), now),
            CouponOutcome::Invalid(CouponRejection::NotYetValid)
        );

        c.starts_at = Some(now - Duration::days(1));
        assert_eq!(
            evaluate_coupon(Some(&c), cents(0), now),
            CouponOutcome::Invalid(CouponRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_zero_cart_gets_zero_discount() {
        let c = coupon(DiscountKind::Percentage, 50);
        assert_eq!(evaluate_coupon(Some(&c), cents(0), Utc::now()).discount(), cents(0));
    }

    #[test]
    fn test_draft_validation() {
        let draft = CouponDraft {
            code: " spring ".to_string(),
            description: Some("  ".to_string()),
            discount_kind: DiscountKind::Percentage,
            discount_value: 15,
            minimum_order_cents: 0,
            max_uses: Some(10),
            starts_at: None,
            expires_at: None,
            is_active: true,
        };

        let valid = validate_coupon_draft(draft.clone()).unwrap();
        assert_eq!(valid.code, "SPRING");
        assert_eq!(valid.description, None);

        let over = CouponDraft { discount_value: 101, ..draft.clone() };
        assert!(validate_coupon_draft(over).is_err());

        let zero_fixed = CouponDraft {
            discount_kind: DiscountKind::Fixed,
            discount_value: 0,
            ..draft.clone()
        };
        assert!(validate_coupon_draft(zero_fixed).is_err());

        let now = Utc::now();
        let backwards = CouponDraft {
            starts_at: Some(now),
            expires_at: Some(now - Duration::hours(1)),
            ..draft
        };
        assert!(validate_coupon_draft(backwards).is_err());
    }

    #[test]
    fn test_apply_to_keeps_use_count() {
        let mut existing = coupon(DiscountKind::Percentage, 10);
        existing.current_uses = 7;

        let draft = CouponDraft {
            code: "SAVE".to_string(),
            description: None,
            discount_kind: DiscountKind::Fixed,
            discount_value: 500,
            minimum_order_cents: 1000,
            max_uses: None,
            starts_at: None,
            expires_at: None,
            is_active: false,
        };
        let updated = draft.apply_to(&existing, Utc::now());

        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.current_uses, 7);
        assert_eq!(updated.created_at, existing.created_at);
        assert_eq!(updated.discount_kind, DiscountKind::Fixed);
        assert!(!updated.is_active);
    }
}
