//! # Download Entitlement Rules
//!
//! Limits how many times a purchased digital asset may be fetched.
//!
//! ## Register Download Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  token ──► entitlement row ──► asset locator? ──► check_download(c)    │
//! │                │ none              │ none               │ c >= limit   │
//! │                ▼                   ▼                    ▼              │
//! │            NotFound        AssetUnavailable        LimitReached        │
//! │                                                                         │
//! │  UPDATE ... SET count = c + 1 WHERE id = ? AND count = c               │
//! │      │ 1 row                          │ 0 rows                         │
//! │      ▼                                ▼                                │
//! │  signed URL              re-read count ──► resolve_contention(fresh)   │
//! │                                    fresh >= limit → LimitReached       │
//! │                                    otherwise      → Retryable          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The count column doubles as the optimistic version marker, so no lock or
//! transaction is needed to keep `count <= limit`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

/// Why a download was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// No order item carries this token for the current store.
    #[error("Download not found")]
    NotFound,

    /// The product has no stored asset to hand out.
    #[error("Download is not available for this product")]
    AssetUnavailable,

    #[error("Download limit of {limit} reached")]
    LimitReached { limit: i64 },

    /// Lost a concurrent increment while still under the limit.
    #[error("Download is busy, please try again")]
    Retryable,
}

impl DownloadError {
    /// Only contention is worth retrying; every other refusal is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::Retryable)
    }
}

/// Checks a read count against the product's limit before the increment.
///
/// ## Example
/// ```rust
/// use storefront_core::entitlement::check_download;
/// use storefront_core::DownloadError;
///
/// assert!(check_download(1, Some(2)).is_ok());
/// assert_eq!(check_download(2, Some(2)), Err(DownloadError::LimitReached { limit: 2 }));
/// assert!(check_download(10_000, None).is_ok());
/// ```
pub fn check_download(count: i64, limit: Option<i64>) -> Result<(), DownloadError> {
    match limit {
        Some(limit) if count >= limit => Err(DownloadError::LimitReached { limit }),
        _ => Ok(()),
    }
}

/// Decides the outcome after losing the compare-and-swap, given a fresh read.
pub fn resolve_contention(fresh_count: i64, limit: Option<i64>) -> DownloadError {
    match check_download(fresh_count, limit) {
        Err(limit_reached) => limit_reached,
        Ok(()) => DownloadError::Retryable,
    }
}

/// Length in bytes of a download capability token before encoding.
pub const DOWNLOAD_TOKEN_BYTES: usize = 32;

/// Generates an unguessable download capability token.
///
/// 32 random bytes, URL-safe base64 without padding (43 characters).
pub fn generate_download_token<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; DOWNLOAD_TOKEN_BYTES];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
