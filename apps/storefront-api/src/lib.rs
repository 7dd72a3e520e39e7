//! # Storefront API
//!
//! HTTP server for storefront checkout rules and store administration.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Storefront API                                  │
//! │                                                                         │
//! │  X-Store ──► Tenant ──► TenantScope        Bearer ──► AdminAuth         │
//! │                              │                                          │
//! │  ┌────────────────┐  ┌───────▼────────┐  ┌────────────────────────────┐│
//! │  │CouponEvaluator │  │ GiftCardLedger │  │  DownloadCounter           ││
//! │  │                │  │                │  │                            ││
//! │  │ • evaluate     │  │ • validate     │  │ • register_download        ││
//! │  │ • admin CRUD   │  │ • issue/redeem │  │   (CAS, then sign URL)     ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │OrderFulfillment│  │ ProductCatalog │                                │
//! │  │                │  │                │                                │
//! │  │ • fulfill      │  │ • admin CRUD   │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │   SQLite     │  │ AssetSigner  │  │  GiftCardNotifier        ││  │
//! │  │  │              │  │              │  │                          ││  │
//! │  │  │ tenant-      │  │ HMAC signed  │  │ log or webhook,          ││  │
//! │  │  │ scoped repos │  │ download URL │  │ after issuance           ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the environment variables.

use std::sync::Arc;

use storefront_db::{Database, DbConfig, DbError, TenantScope};
use storefront_db::{CouponRepository, EntitlementRepository, GiftCardRepository};

pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod services;
pub mod signer;
pub mod tenant;

#[cfg(test)]
mod test_support;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ServiceError};

use crate::auth::AdminTokens;
use crate::notify::{GiftCardNotifier, LogNotifier, NotifyError, WebhookNotifier};
use crate::services::{
    CouponEvaluator, DownloadCounter, GiftCardLedger, OrderFulfillment, ProductCatalog,
};
use crate::signer::{AssetSigner, HmacAssetSigner, SignerError};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub signer: Arc<dyn AssetSigner>,
    pub notifier: Arc<dyn GiftCardNotifier>,
    pub admin_tokens: AdminTokens,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ApiConfig,
        signer: Arc<dyn AssetSigner>,
        notifier: Arc<dyn GiftCardNotifier>,
    ) -> Self {
        let admin_tokens = AdminTokens::new(config.admin_tokens.iter().cloned());
        AppState {
            db,
            config,
            signer,
            notifier,
            admin_tokens,
        }
    }

    /// Opens the database and builds the collaborators named by `config`.
    pub async fn from_config(config: ApiConfig) -> Result<Self, StartupError> {
        let db = Database::new(
            DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
        )
        .await?;

        let signer = HmacAssetSigner::new(
            &config.asset_signing_secret,
            config.asset_base_url.as_str(),
            config.download_url_ttl_secs,
        )?;

        let notifier: Arc<dyn GiftCardNotifier> = match &config.gift_card_webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.as_str())?),
            None => Arc::new(LogNotifier),
        };

        Ok(AppState::new(db, config, Arc::new(signer), notifier))
    }

    pub fn coupon_evaluator(&self, scope: &TenantScope) -> CouponEvaluator<CouponRepository> {
        CouponEvaluator::new(scope.coupons())
    }

    pub fn gift_card_ledger(&self, scope: &TenantScope) -> GiftCardLedger<GiftCardRepository> {
        GiftCardLedger::new(
            scope.gift_cards(),
            Arc::clone(&self.notifier),
            self.config.denominations.clone(),
        )
    }

    pub fn download_counter(&self, scope: &TenantScope) -> DownloadCounter<EntitlementRepository> {
        DownloadCounter::new(scope.downloads(), Arc::clone(&self.signer))
    }

    pub fn order_fulfillment(&self, scope: &TenantScope) -> OrderFulfillment {
        OrderFulfillment::new(scope.clone(), self.gift_card_ledger(scope))
    }

    pub fn product_catalog(&self, scope: &TenantScope) -> ProductCatalog {
        ProductCatalog::new(scope.products())
    }
}

/// Failures while assembling [`AppState`].
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifyError),
}
