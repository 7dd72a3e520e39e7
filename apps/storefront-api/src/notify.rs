//! Gift card recipient notifications.
//!
//! Delivery itself (email templates, provider) lives outside this service.
//! A notifier only hands a structured notice to whoever delivers it; issuance
//! never waits on it and never fails because of it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use storefront_core::{GiftCard, Money};

/// What the recipient is told about a newly issued card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GiftCardNotice {
    pub gift_card_id: String,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub sender_name: Option<String>,
    pub amount_cents: i64,
    pub amount_display: String,
    pub code: String,
    pub message: Option<String>,
}

impl From<&GiftCard> for GiftCardNotice {
    fn from(card: &GiftCard) -> Self {
        GiftCardNotice {
            gift_card_id: card.id.clone(),
            recipient_email: card.recipient_email.clone(),
            recipient_name: card.recipient_name.clone(),
            sender_name: card.sender_name.clone(),
            amount_cents: card.original_amount_cents,
            amount_display: Money::from_cents(card.original_amount_cents).to_string(),
            code: card.code.clone(),
            message: card.message.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification endpoint answered {0}")]
    Rejected(u16),
}

/// Sends a gift card notice somewhere.
#[async_trait]
pub trait GiftCardNotifier: Send + Sync {
    async fn send(&self, notice: &GiftCardNotice) -> Result<(), NotifyError>;
}

/// Only records the notice in the log. Used when no webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl GiftCardNotifier for LogNotifier {
    async fn send(&self, notice: &GiftCardNotice) -> Result<(), NotifyError> {
        info!(
            gift_card_id = %notice.gift_card_id,
            recipient = %notice.recipient_email,
            amount = %notice.amount_display,
            "Gift card notice (log only)"
        );
        Ok(())
    }
}

/// POSTs the notice as JSON to a delivery webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(WebhookNotifier {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl GiftCardNotifier for WebhookNotifier {
    async fn send(&self, notice: &GiftCardNotice) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(notice).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        info!(
            gift_card_id = %notice.gift_card_id,
            status = status.as_u16(),
            "Gift card notice delivered"
        );
        Ok(())
    }
}
