//! Shared fixtures for service and route tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use storefront_core::{Coupon, DiscountKind, GiftCard, GiftCardStatus, Product, Store};
use storefront_db::{Database, DbConfig, TenantScope};

use crate::config::ApiConfig;
use crate::notify::LogNotifier;
use crate::signer::HmacAssetSigner;
use crate::AppState;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const ASSET_BASE: &str = "https://cdn.example.com";
pub const ADMIN_TOKEN: &str = "admin-secret-token";

pub async fn setup_store(slug: &str) -> (Database, TenantScope) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let scope = add_store(&db, slug).await;
    (db, scope)
}

pub async fn add_store(db: &Database, slug: &str) -> TenantScope {
    let store = Store {
        id: format!("store-{slug}"),
        slug: slug.to_string(),
        name: slug.to_string(),
        is_active: true,
        created_at: Utc::now(),
    };
    db.stores().insert(&store).await.unwrap();
    db.scoped(store.tenant_id())
}

pub fn config() -> ApiConfig {
    ApiConfig::from_lookup(|key| match key {
        "ASSET_SIGNING_SECRET" => Some(SECRET.to_string()),
        "ASSET_BASE_URL" => Some(ASSET_BASE.to_string()),
        "ADMIN_TOKENS" => Some(ADMIN_TOKEN.to_string()),
        _ => None,
    })
    .unwrap()
}

pub fn signer() -> Arc<HmacAssetSigner> {
    Arc::new(HmacAssetSigner::new(SECRET.as_bytes(), ASSET_BASE, 300).unwrap())
}

pub fn app_state(db: Database) -> Arc<AppState> {
    let config = config();
    Arc::new(AppState::new(db, config, signer(), Arc::new(LogNotifier)))
}

pub fn coupon(code: &str, kind: DiscountKind, value: i64) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: format!("coupon-{}", code.to_ascii_lowercase()),
        tenant_id: String::new(),
        code: code.to_string(),
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

pub fn gift_card(id: &str, code: &str, balance: i64) -> GiftCard {
    GiftCard {
        id: id.to_string(),
        tenant_id: String::new(),
        code: code.to_string(),
        original_amount_cents: balance.max(5000),
        current_balance_cents: balance,
        status: GiftCardStatus::Active,
        recipient_email: "ada@example.com".to_string(),
        recipient_name: None,
        sender_name: None,
        message: None,
        issued_at: Utc::now(),
        email_sent_at: None,
    }
}

pub fn product(id: &str, price_cents: i64, asset: Option<(&str, Option<i64>)>) -> Product {
    let now: DateTime<Utc> = Utc::now();
    Product {
        id: id.to_string(),
        tenant_id: String::new(),
        name: format!("Product {id}"),
        description: None,
        price_cents,
        is_digital: asset.is_some(),
        download_limit: asset.and_then(|(_, limit)| limit),
        asset_locator: asset.map(|(locator, _)| locator.to_string()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
