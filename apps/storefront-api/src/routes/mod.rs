//! HTTP routing.
//!
//! ```text
//! GET  /health                                   liveness + database
//! POST /api/coupons/validate                     X-Store
//! POST /api/gift-cards/validate                  X-Store
//! GET  /api/downloads/{token}                    X-Store, 307 → signed URL
//!
//! POST /api/orders/fulfill                       X-Store + Bearer
//! GET|POST        /api/admin/coupons             X-Store + Bearer
//! PUT|DELETE      /api/admin/coupons/{id}
//! GET|POST        /api/admin/gift-cards
//! POST            /api/admin/gift-cards/{card}/status   card id
//! POST            /api/admin/gift-cards/{card}/redeem   card code
//! GET|POST        /api/admin/products
//! PUT             /api/admin/products/{id}
//! ```

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod admin;
pub mod storefront;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(storefront::health))
        .route("/api/coupons/validate", post(storefront::validate_coupon))
        .route("/api/gift-cards/validate", post(storefront::validate_gift_card))
        .route("/api/downloads/{token}", get(storefront::download))
        .route("/api/orders/fulfill", post(admin::fulfill_order))
        .route(
            "/api/admin/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route(
            "/api/admin/coupons/{id}",
            put(admin::update_coupon).delete(admin::delete_coupon),
        )
        .route(
            "/api/admin/gift-cards",
            get(admin::list_gift_cards).post(admin::issue_gift_card),
        )
        // One parameter name per path segment: {card} is an id or a code
        .route(
            "/api/admin/gift-cards/{card}/status",
            post(admin::set_gift_card_status),
        )
        .route(
            "/api/admin/gift-cards/{card}/redeem",
            post(admin::redeem_gift_card),
        )
        .route(
            "/api/admin/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route("/api/admin/products/{id}", put(admin::update_product))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
