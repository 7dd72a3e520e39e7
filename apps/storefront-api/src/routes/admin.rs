//! Admin endpoints. Every handler requires [`AdminAuth`] and a store.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rand::rngs::OsRng;
use serde::Deserialize;

use storefront_core::catalog::ProductDraft;
use storefront_core::coupon::CouponDraft;
use storefront_core::gift_card::IssueGiftCard;
use storefront_core::{Coupon, GiftCard, GiftCardStatus, Product};

use crate::auth::AdminAuth;
use crate::error::ApiResult;
use crate::services::{FulfilledOrder, PaymentReport, Redemption};
use crate::tenant::Tenant;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

// =============================================================================
// Orders
// =============================================================================

/// Records a paid order reported by the payment processor.
pub async fn fulfill_order(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Json(report): Json<PaymentReport>,
) -> ApiResult<(StatusCode, Json<FulfilledOrder>)> {
    let fulfilled = state
        .order_fulfillment(&tenant)
        .fulfill(report, &mut OsRng)
        .await?;
    Ok((StatusCode::CREATED, Json(fulfilled)))
}

// =============================================================================
// Coupons
// =============================================================================

pub async fn list_coupons(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Coupon>>> {
    let coupons = state
        .coupon_evaluator(&tenant)
        .list(&params.q, params.limit)
        .await?;
    Ok(Json(coupons))
}

pub async fn create_coupon(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Json(draft): Json<CouponDraft>,
) -> ApiResult<(StatusCode, Json<Coupon>)> {
    let coupon = state.coupon_evaluator(&tenant).create(draft).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn update_coupon(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Path(id): Path<String>,
    Json(draft): Json<CouponDraft>,
) -> ApiResult<Json<Coupon>> {
    let coupon = state.coupon_evaluator(&tenant).update(&id, draft).await?;
    Ok(Json(coupon))
}

pub async fn delete_coupon(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.coupon_evaluator(&tenant).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Gift Cards
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: GiftCardStatus,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub amount_cents: i64,
}

pub async fn list_gift_cards(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<GiftCard>>> {
    let cards = state
        .gift_card_ledger(&tenant)
        .list(&params.q, params.limit)
        .await?;
    Ok(Json(cards))
}

/// Issues a card. The recipient notification runs in the background.
pub async fn issue_gift_card(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Json(request): Json<IssueGiftCard>,
) -> ApiResult<(StatusCode, Json<GiftCard>)> {
    let issued = state
        .gift_card_ledger(&tenant)
        .issue(request, &mut OsRng)
        .await?;
    Ok((StatusCode::CREATED, Json(issued.card)))
}

pub async fn set_gift_card_status(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Path(id): Path<String>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<GiftCard>> {
    let card = state
        .gift_card_ledger(&tenant)
        .set_status(&id, change.status)
        .await?;
    Ok(Json(card))
}

pub async fn redeem_gift_card(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Path(code): Path<String>,
    Json(request): Json<RedeemRequest>,
) -> ApiResult<Json<Redemption>> {
    let redemption = state
        .gift_card_ledger(&tenant)
        .redeem(&code, request.amount_cents)
        .await?;
    Ok(Json(redemption))
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .product_catalog(&tenant)
        .list(&params.q, params.limit)
        .await?;
    Ok(Json(products))
}

pub async fn create_product(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Json(draft): Json<ProductDraft>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.product_catalog(&tenant).create(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    _: AdminAuth,
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> ApiResult<Json<Product>> {
    let product = state.product_catalog(&tenant).update(&id, draft).await?;
    Ok(Json(product))
}
