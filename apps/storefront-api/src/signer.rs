//! Signed download URLs.
//!
//! A download is handed out as a short-lived URL on the asset host:
//!
//! ```text
//! {base}/{locator}?expires={unix}&signature={b64url(HMAC-SHA256(locator "\n" expires))}
//! ```
//!
//! The asset host recomputes the MAC with the shared secret and refuses the
//! request once `expires` has passed. [`HmacAssetSigner::verify`] is that check.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::{MAX_DOWNLOAD_URL_TTL_SECS, MIN_SIGNING_SECRET_LEN};

type HmacSha256 = Hmac<Sha256>;

/// A time-bounded fetch URL for one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues time-bounded public URLs for stored assets.
pub trait AssetSigner: Send + Sync {
    fn sign_url(&self, asset_locator: &str, now: DateTime<Utc>) -> SignedUrl;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("signing key too short: got {actual} bytes, need at least {minimum}")]
    KeyTooShort { actual: usize, minimum: usize },

    #[error("URL lifetime of {0}s is outside 1..={max}s", max = MAX_DOWNLOAD_URL_TTL_SECS)]
    InvalidTtl(i64),

    #[error("signature does not match")]
    BadSignature,

    #[error("link expired")]
    Expired,
}

/// HMAC-SHA256 signer.
#[derive(Clone)]
pub struct HmacAssetSigner {
    mac: HmacSha256,
    base_url: String,
    ttl: Duration,
}

impl std::fmt::Debug for HmacAssetSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacAssetSigner")
            .field("base_url", &self.base_url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl HmacAssetSigner {
    pub fn new(
        secret: &[u8],
        base_url: impl Into<String>,
        ttl_secs: i64,
    ) -> Result<Self, SignerError> {
        if secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(SignerError::KeyTooShort {
                actual: secret.len(),
                minimum: MIN_SIGNING_SECRET_LEN,
            });
        }
        if !(1..=MAX_DOWNLOAD_URL_TTL_SECS).contains(&ttl_secs) {
            return Err(SignerError::InvalidTtl(ttl_secs));
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SignerError::KeyTooShort {
            actual: secret.len(),
            minimum: MIN_SIGNING_SECRET_LEN,
        })?;

        Ok(HmacAssetSigner {
            mac,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    fn signature(&self, asset_locator: &str, expires: i64) -> [u8; 32] {
        let mut mac = self.mac.clone();
        mac.update(asset_locator.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac.finalize().into_bytes().into()
    }

    /// Checks a presented signature for `asset_locator` and its expiry.
    pub fn verify(
        &self,
        asset_locator: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignerError> {
        let presented = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SignerError::BadSignature)?;

        if !constant_time_eq(&self.signature(asset_locator, expires), &presented) {
            return Err(SignerError::BadSignature);
        }
        if now.timestamp() >= expires {
            return Err(SignerError::Expired);
        }
        Ok(())
    }
}

impl AssetSigner for HmacAssetSigner {
    fn sign_url(&self, asset_locator: &str, now: DateTime<Utc>) -> SignedUrl {
        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();
        let signature = URL_SAFE_NO_PAD.encode(self.signature(asset_locator, expires));

        // Keep the path structure, encode each segment
        let path = asset_locator
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        SignedUrl {
            url: format!(
                "{}/{}?expires={}&signature={}",
                self.base_url, path, expires, signature
            ),
            expires_at,
        }
    }
}

/// Constant-time byte slice comparison.
///
/// Length is not secret; contents are compared without early exit.
#[inline]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
