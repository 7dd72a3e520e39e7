//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core (this file)                                           │
//! │  ├── ValidationError  - Malformed input, rejected before any lookup    │
//! │  └── CoreError        - Business-rule failures of mutations            │
//! │                                                                         │
//! │  storefront-db                                                         │
//! │  └── DbError          - Storage failures                               │
//! │                                                                         │
//! │  storefront-api                                                        │
//! │  ├── ServiceError     - Engine outcome (rule / conflict / unavailable) │
//! │  └── ApiError         - What the HTTP client sees                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Coupon and gift-card *validation* rejections are not errors at all: they
//! are the `Invalid` arm of [`crate::CouponOutcome`] and
//! [`crate::gift_card::GiftCardCheck`].

use thiserror::Error;

use crate::entitlement::DownloadError;
use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business-rule failures raised by mutating operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Lookup by code failed. Deliberately does not say whether the code
    /// exists.
    #[error("Invalid code")]
    InvalidCode,

    /// Gift card cannot be enabled because nothing is left on it.
    #[error("Cannot enable an exhausted gift card")]
    GiftCardExhausted,

    /// Gift card is disabled or empty and cannot be debited.
    #[error("Gift card cannot be redeemed: {reason}")]
    GiftCardNotRedeemable { reason: String },

    /// Amount is not one of the configured gift card denominations.
    #[error("{amount} is not an available gift card amount")]
    InvalidDenomination { amount: Money },

    /// Digital download refused.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
