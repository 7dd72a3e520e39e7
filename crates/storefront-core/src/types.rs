//! # Domain Types
//!
//! Records shared by the rules in this crate and the repositories in
//! `storefront-db`.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │    GiftCard     │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (NOCASE)  │   │  code (exact)   │   │  price_cents    │       │
//! │  │  discount_kind  │   │  original_cents │   │  download_limit │       │
//! │  │  current_uses   │   │  balance_cents  │   │  asset_locator  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │      Order      │──►│   OrderItem     │──►│ DownloadEntitlement  │  │
//! │  │  payment_ref    │   │  download_token │   │ (item + product      │  │
//! │  │  totals         │   │  download_count │   │  limit/locator)      │  │
//! │  └─────────────────┘   └─────────────────┘   └──────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenant Ownership
//! Every record carries (directly or through its parent order) the tenant it
//! belongs to. Records are only ever loaded through a tenant-scoped repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tenant
// =============================================================================

/// Identifier of an isolated store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row of the tenant directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Store {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn tenant_id(&self) -> TenantId {
        TenantId::new(self.id.clone())
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `discount_value` is a whole percent, 1-100.
    Percentage,
    /// `discount_value` is an amount in cents.
    Fixed,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::Fixed => "fixed",
        }
    }
}

/// A discount code configured by the store operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    pub tenant_id: String,
    /// Unique per tenant, compared case-insensitively.
    pub code: String,
    pub description: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_value: i64,
    /// Minimum cart total in cents (0 = no minimum).
    pub minimum_order_cents: i64,
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    #[inline]
    pub fn minimum_order(&self) -> Money {
        Money::from_cents(self.minimum_order_cents)
    }

    /// True once `current_uses` has reached `max_uses`.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_uses, Some(max) if self.current_uses >= max)
    }
}

// =============================================================================
// Gift Card
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GiftCardStatus {
    Active,
    Disabled,
}

impl GiftCardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GiftCardStatus::Active => "active",
            GiftCardStatus::Disabled => "disabled",
        }
    }
}

/// A stored-value card.
///
/// `0 <= current_balance_cents <= original_amount_cents` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GiftCard {
    pub id: String,
    pub tenant_id: String,
    /// Generated, fixed-format; compared case-sensitively.
    pub code: String,
    pub original_amount_cents: i64,
    pub current_balance_cents: i64,
    pub status: GiftCardStatus,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub message: Option<String>,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub email_sent_at: Option<DateTime<Utc>>,
}

impl GiftCard {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    #[inline]
    pub fn original_amount(&self) -> Money {
        Money::from_cents(self.original_amount_cents)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Digital products carry an asset locator and an
/// optional per-purchase download limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub is_digital: bool,
    pub download_limit: Option<i64>,
    /// Internal storage key of the downloadable file.
    pub asset_locator: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A paid order, recorded once the payment processor reports success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    /// Payment processor session/charge reference. Unique per tenant.
    pub payment_ref: String,
    pub customer_email: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub gift_card_cents: i64,
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    pub gift_card_code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line of an order. Digital lines carry a download capability token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub download_token: Option<String>,
    pub download_count: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An order item resolved by its capability token, joined with the
/// product's download settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DownloadEntitlement {
    pub order_item_id: String,
    pub order_id: String,
    pub product_id: String,
    pub download_count: i64,
    pub download_limit: Option<i64>,
    pub asset_locator: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
