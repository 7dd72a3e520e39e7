//! Tenant resolution.
//!
//! Every storefront request names its store in the `X-Store` header (the
//! store's slug). The extractor turns it into a [`TenantScope`], which is the
//! only way handlers reach tenant data.

use std::ops::Deref;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use storefront_db::TenantScope;

use crate::error::ApiError;
use crate::AppState;

pub const STORE_HEADER: &str = "x-store";

/// Storage scoped to the store named by the request.
#[derive(Debug, Clone)]
pub struct Tenant(pub TenantScope);

impl Deref for Tenant {
    type Target = TenantScope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<Arc<AppState>> for Tenant {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let slug = parts
            .headers
            .get(STORE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .ok_or(ApiError::StoreUnavailable)?;

        let store = state
            .db
            .stores()
            .find_active_by_slug(slug)
            .await?
            .ok_or(ApiError::StoreUnavailable)?;

        debug!(store = %store.slug, "Resolved tenant");
        Ok(Tenant(state.db.scoped(store.tenant_id())))
    }
}
