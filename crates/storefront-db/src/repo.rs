//! Store traits
//!
//! The storage primitives the order value engine is written against. The
//! SQLite repositories implement them; tests substitute their own.
//!
//! Every guarded mutation here is a single conditional `UPDATE` and reports
//! whether it applied (`Ok(true)`) or its condition no longer held
//! (`Ok(false)`). Callers re-read and decide; the store never retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storefront_core::{Coupon, DownloadEntitlement, GiftCard, GiftCardStatus};

use crate::error::DbResult;

/// Coupon storage for one tenant.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Find a coupon by code, ignoring case
    async fn find_by_code(&self, code: &str) -> DbResult<Option<Coupon>>;

    /// Find a coupon by ID
    async fn find_by_id(&self, id: &str) -> DbResult<Option<Coupon>>;

    /// Case-insensitive substring match on code and description, newest first
    async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Coupon>>;

    /// Insert a new coupon; `UniqueViolation` when the code is taken
    async fn insert(&self, coupon: &Coupon) -> DbResult<()>;

    /// Replace an existing coupon's editable fields
    async fn update(&self, coupon: &Coupon) -> DbResult<()>;

    /// Delete a coupon
    async fn delete(&self, id: &str) -> DbResult<()>;

    /// Increment the use counter unless the coupon is at its limit
    async fn record_use(&self, code: &str) -> DbResult<bool>;
}

/// Gift card storage for one tenant.
#[async_trait]
pub trait GiftCardStore: Send + Sync {
    /// Find a card by code (exact match)
    async fn find_by_code(&self, code: &str) -> DbResult<Option<GiftCard>>;

    /// Find a card by ID
    async fn find_by_id(&self, id: &str) -> DbResult<Option<GiftCard>>;

    /// Substring match on code and recipient email, newest first
    async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<GiftCard>>;

    /// Insert a newly issued card; `UniqueViolation` on a code collision
    async fn insert(&self, card: &GiftCard) -> DbResult<()>;

    /// Set the balance of an active card to `new` only if it still equals
    /// `expected`
    async fn compare_and_set_balance(&self, id: &str, expected: i64, new: i64) -> DbResult<bool>;

    /// Add `amount` back to the balance whatever the card's status, refused
    /// only when the result would exceed the original amount
    async fn restore_balance(&self, id: &str, amount: i64) -> DbResult<bool>;

    /// Change status; enabling only applies while the balance is positive
    async fn set_status(&self, id: &str, status: GiftCardStatus) -> DbResult<bool>;

    /// Stamp the time the recipient was notified
    async fn mark_email_sent(&self, id: &str, at: DateTime<Utc>) -> DbResult<()>;
}

/// Download entitlement storage for one tenant.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Resolve a capability token to its order item and product settings
    async fn find_by_token(&self, token: &str) -> DbResult<Option<DownloadEntitlement>>;

    /// Fresh read of an order item's download count
    async fn current_count(&self, order_item_id: &str) -> DbResult<Option<i64>>;

    /// Increment the count to `expected + 1` only if it still equals `expected`
    async fn compare_and_increment(&self, order_item_id: &str, expected: i64) -> DbResult<bool>;
}
