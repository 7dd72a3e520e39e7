//! Public storefront endpoints: checkout-time code checks and downloads.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use storefront_core::gift_card::GiftCardCheck;
use storefront_core::{CouponOutcome, ValidationError};

use crate::error::ApiResult;
use crate::tenant::Tenant;
use crate::AppState;

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.db.health_check().await;
    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            database,
        }),
    )
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CouponCheckRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub cart_total_cents: Option<i64>,
}

/// Business-rule outcome of a code check. Refusals are a 200 with
/// `valid: false` and a human-readable reason.
#[derive(Debug, Serialize)]
pub struct CodeCheckResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CodeCheckResponse {
    fn refused(reason: impl ToString) -> Self {
        CodeCheckResponse {
            valid: false,
            discount_cents: None,
            balance_cents: None,
            applicable_cents: None,
            reason: Some(reason.to_string()),
        }
    }
}

pub async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Json(request): Json<CouponCheckRequest>,
) -> ApiResult<Json<CodeCheckResponse>> {
    let cart_total = request
        .cart_total_cents
        .ok_or_else(|| ValidationError::required("cart_total_cents"))?;
    let outcome = state
        .coupon_evaluator(&tenant)
        .evaluate(&request.code, cart_total)
        .await?;

    let response = match outcome {
        CouponOutcome::Valid { discount } => CodeCheckResponse {
            valid: true,
            discount_cents: Some(discount.cents()),
            balance_cents: None,
            applicable_cents: None,
            reason: None,
        },
        CouponOutcome::Invalid(rejection) => CodeCheckResponse::refused(rejection),
    };
    Ok(Json(response))
}

// =============================================================================
// Gift Cards
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GiftCardCheckRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub cart_total_cents: Option<i64>,
}

pub async fn validate_gift_card(
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Json(request): Json<GiftCardCheckRequest>,
) -> ApiResult<Json<CodeCheckResponse>> {
    let ledger = state.gift_card_ledger(&tenant);

    let response = match ledger.validate(&request.code).await? {
        GiftCardCheck::Valid(card) => {
            let applicable = request
                .cart_total_cents
                .map(|total| ledger.compute_applicable_amount(&card, total))
                .transpose()?;

            CodeCheckResponse {
                valid: true,
                discount_cents: None,
                balance_cents: Some(card.current_balance_cents),
                applicable_cents: applicable.map(|m| m.cents()),
                reason: None,
            }
        }
        GiftCardCheck::Invalid(rejection) => CodeCheckResponse::refused(rejection),
    };
    Ok(Json(response))
}

// =============================================================================
// Downloads
// =============================================================================

/// Counts the download and redirects to a short-lived signed asset URL.
pub async fn download(
    State(state): State<Arc<AppState>>,
    tenant: Tenant,
    Path(token): Path<String>,
) -> ApiResult<Redirect> {
    let signed = state.download_counter(&tenant).register_download(&token).await?;
    debug!(expires_at = %signed.expires_at, "Redirecting to signed asset");
    Ok(Redirect::temporary(&signed.url))
}
