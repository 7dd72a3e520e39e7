//! Gift card ledger.
//!
//! ## Balance Updates
//! ```text
//! redeem(code, amount)
//!   │
//!   ├── find_by_code ─────────► not found → "Invalid code"
//!   ├── plan_debit ───────────► disabled / empty → rejected
//!   └── compare_and_set_balance(expected → new)
//!          ├── applied ───────► Redemption
//!          └── lost ──────────► re-read
//!                 ├── no longer redeemable → rejected
//!                 └── still redeemable ──→ Retryable
//!
//! reverse(redemption)
//!   └── restore_balance(+amount) ► capped at the original amount
//! ```
//!
//! Issuance inserts the card first and only then hands the notification to a
//! background task. The caller gets the card immediately plus a handle on the
//! notification outcome.

use std::sync::Arc;

use chrono::Utc;
use rand::{CryptoRng, Rng};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use storefront_core::gift_card::{
    applicable_amount, check_redeemable, check_status_change, generate_gift_card_code,
    plan_debit, validate_gift_card, validate_issue_request, GiftCardCheck, IssueGiftCard,
};
use storefront_core::validation::{
    clamp_list_limit, validate_cart_total, validate_lookup_code, validate_search_query,
};
use storefront_core::{
    CoreError, Denominations, GiftCard, GiftCardDebit, GiftCardStatus, Money,
};
use storefront_db::GiftCardStore;

use crate::error::{ServiceError, ServiceResult};
use crate::notify::{GiftCardNotice, GiftCardNotifier};

/// Codes drawn per issuance before giving up on collisions.
pub const MAX_ISSUE_ATTEMPTS: usize = 3;

/// What happened to the recipient notification of an issued card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    Failed(String),
}

/// A freshly issued card. `notification` resolves once delivery was attempted.
#[derive(Debug)]
pub struct IssuedGiftCard {
    pub card: GiftCard,
    pub notification: JoinHandle<NotificationOutcome>,
}

/// A successful debit.
#[derive(Debug, Clone, Serialize)]
pub struct Redemption {
    pub card: GiftCard,
    pub debit: GiftCardDebit,
}

pub struct GiftCardLedger<S> {
    store: S,
    notifier: Arc<dyn GiftCardNotifier>,
    denominations: Denominations,
}

impl<S> GiftCardLedger<S>
where
    S: GiftCardStore + Clone + 'static,
{
    pub fn new(store: S, notifier: Arc<dyn GiftCardNotifier>, denominations: Denominations) -> Self {
        GiftCardLedger {
            store,
            notifier,
            denominations,
        }
    }

    // =========================================================================
    // Storefront
    // =========================================================================

    /// Looks a code up and decides whether it can be used at checkout.
    pub async fn validate(&self, code: &str) -> ServiceResult<GiftCardCheck> {
        let code = validate_lookup_code("code", code)?;
        let card = self.store.find_by_code(&code).await?;

        let check = validate_gift_card(card);
        debug!(valid = check.is_valid(), "Validated gift card");
        Ok(check)
    }

    /// How much of `cart_total_cents` the card covers.
    pub fn compute_applicable_amount(
        &self,
        card: &GiftCard,
        cart_total_cents: i64,
    ) -> ServiceResult<Money> {
        validate_cart_total(cart_total_cents)?;
        Ok(applicable_amount(card, Money::from_cents(cart_total_cents)))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Issues a new active card for one of the configured denominations.
    pub async fn issue<R>(&self, request: IssueGiftCard, rng: &mut R) -> ServiceResult<IssuedGiftCard>
    where
        R: Rng + CryptoRng,
    {
        let request = validate_issue_request(request, &self.denominations)?;
        let codes: Vec<String> = (0..MAX_ISSUE_ATTEMPTS)
            .map(|_| generate_gift_card_code(&mut *rng))
            .collect();

        let id = Uuid::new_v4().to_string();
        let mut issued = None;

        for (attempt, code) in codes.into_iter().enumerate() {
            let card = GiftCard {
                id: id.clone(),
                tenant_id: String::new(),
                code,
                original_amount_cents: request.amount_cents,
                current_balance_cents: request.amount_cents,
                status: GiftCardStatus::Active,
                recipient_email: request.recipient_email.clone(),
                recipient_name: request.recipient_name.clone(),
                sender_name: request.sender_name.clone(),
                message: request.message.clone(),
                issued_at: Utc::now(),
                email_sent_at: None,
            };

            match self.store.insert(&card).await {
                Ok(()) => {
                    issued = Some(card);
                    break;
                }
                Err(e) if e.is_unique_violation_on("gift_cards.code") => {
                    warn!(attempt = attempt + 1, "Gift card code collision, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Some(card) = issued else {
            return Err(ServiceError::Conflict(
                "Could not allocate a unique gift card code".to_string(),
            ));
        };
        let card = self.find(&card.id).await?;

        info!(
            id = %card.id,
            amount = %card.original_amount(),
            "Gift card issued"
        );

        let notification = self.spawn_notification(GiftCardNotice::from(&card));
        Ok(IssuedGiftCard { card, notification })
    }

    fn spawn_notification(&self, notice: GiftCardNotice) -> JoinHandle<NotificationOutcome> {
        let notifier = Arc::clone(&self.notifier);
        let store = self.store.clone();

        tokio::spawn(async move {
            match notifier.send(&notice).await {
                Ok(()) => {
                    if let Err(e) = store.mark_email_sent(&notice.gift_card_id, Utc::now()).await {
                        warn!(
                            gift_card_id = %notice.gift_card_id,
                            error = %e,
                            "Notified recipient but could not stamp email_sent_at"
                        );
                    }
                    NotificationOutcome::Sent
                }
                Err(e) => {
                    warn!(
                        gift_card_id = %notice.gift_card_id,
                        error = %e,
                        "Gift card notification failed"
                    );
                    NotificationOutcome::Failed(e.to_string())
                }
            }
        })
    }

    /// Enables or disables a card. Enabling an exhausted card is refused.
    pub async fn set_status(&self, id: &str, status: GiftCardStatus) -> ServiceResult<GiftCard> {
        let card = self.find(id).await?;
        check_status_change(&card, status)?;

        if !self.store.set_status(id, status).await? {
            // Balance reached zero after our read, or the card vanished
            let fresh = self.find(id).await?;
            check_status_change(&fresh, status)?;
            warn!(id = %id, "Gift card status change lost a race");
            return Err(ServiceError::Retryable(
                "Gift card changed, please try again".to_string(),
            ));
        }

        info!(id = %id, status = status.as_str(), "Gift card status changed");
        self.find(id).await
    }

    /// Debits up to `amount_cents` from the card with this code.
    pub async fn redeem(&self, code: &str, amount_cents: i64) -> ServiceResult<Redemption> {
        let code = validate_lookup_code("code", code)?;
        let card = self
            .store
            .find_by_code(&code)
            .await?
            .ok_or(CoreError::InvalidCode)?;

        let debit = plan_debit(&card, Money::from_cents(amount_cents))?;

        let applied = self
            .store
            .compare_and_set_balance(
                &card.id,
                debit.expected_balance.cents(),
                debit.new_balance.cents(),
            )
            .await?;

        if !applied {
            warn!(id = %card.id, "Gift card balance changed during redemption");
            let fresh = self
                .store
                .find_by_id(&card.id)
                .await?
                .ok_or(CoreError::InvalidCode)?;

            return Err(match check_redeemable(&fresh) {
                Err(rejection) => CoreError::GiftCardNotRedeemable {
                    reason: rejection.to_string(),
                }
                .into(),
                Ok(()) => ServiceError::Retryable(
                    "Gift card balance changed, please try again".to_string(),
                ),
            });
        }

        info!(
            id = %card.id,
            amount = %debit.amount,
            remaining = %debit.new_balance,
            "Gift card redeemed"
        );

        Ok(Redemption {
            card: GiftCard {
                current_balance_cents: debit.new_balance.cents(),
                ..card
            },
            debit,
        })
    }

    /// Puts a redemption's amount back on top of whatever the balance is now,
    /// even if the card was disabled since. Fails softly (`Ok(false)`) only
    /// when that would push the balance past the card's original amount.
    pub async fn reverse(&self, redemption: &Redemption) -> ServiceResult<bool> {
        let restored = self
            .store
            .restore_balance(&redemption.card.id, redemption.debit.amount.cents())
            .await?;

        if restored {
            info!(id = %redemption.card.id, amount = %redemption.debit.amount, "Gift card debit reversed");
        }
        Ok(restored)
    }

    pub async fn list(&self, query: &str, limit: Option<u32>) -> ServiceResult<Vec<GiftCard>> {
        let query = validate_search_query(query)?;
        Ok(self.store.search(&query, clamp_list_limit(limit)).await?)
    }

    async fn find(&self, id: &str) -> ServiceResult<GiftCard> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Gift card not found".to_string()))
    }
}
