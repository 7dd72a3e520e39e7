//! Admin bearer authentication.
//!
//! Admin routes expect `Authorization: Bearer <token>`. Tokens are opaque
//! capability strings from configuration; there are no sessions or claims.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use crate::error::ApiError;
use crate::signer::constant_time_eq;
use crate::AppState;

/// The configured admin tokens.
#[derive(Clone, Default)]
pub struct AdminTokens(Vec<String>);

impl AdminTokens {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        AdminTokens(tokens.into_iter().filter(|t| !t.is_empty()).collect())
    }

    /// Compares against every configured token, without stopping at the
    /// first match.
    pub fn verify(&self, presented: &str) -> bool {
        self.0.iter().fold(false, |matched, token| {
            matched | constant_time_eq(token.as_bytes(), presented.as_bytes())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for AdminTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AdminTokens").field(&self.0.len()).finish()
    }
}

/// Extractor guarding admin handlers. Rejects with 401.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        match presented {
            Some(token) if state.admin_tokens.verify(token) => Ok(AdminAuth),
            Some(_) => {
                warn!(path = %parts.uri.path(), "Rejected admin token");
                Err(ApiError::Unauthorized)
            }
            None => Err(ApiError::Unauthorized),
        }
    }
}
