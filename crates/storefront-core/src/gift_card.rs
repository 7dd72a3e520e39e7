//! # Gift Card Ledger Rules
//!
//! Stored-value cards: redemption eligibility, how much of a card applies to
//! a cart, status transitions, debits, and code generation.
//!
//! ## Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   0  <=  current_balance  <=  original_amount                          │
//! │                                                                         │
//! │   issue ──► balance = original, status = active                        │
//! │   debit ──► balance' = balance - min(balance, requested)   (CAS)       │
//! │   disable ─ always allowed                                             │
//! │   enable ── refused when balance = 0                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Code Format
//! `XXXX-XXXX-XXXX-XXXX` drawn from a 32-symbol alphabet with the ambiguous
//! glyphs (`0 O 1 I`) removed: 16 symbols × 5 bits = 80 bits of entropy.
//! Codes are compared exactly; they are never typed in by the operator.

use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::{GiftCard, GiftCardStatus};
use crate::validation::{validate_email, validate_optional_text, ValidationResult};

// =============================================================================
// Validation (lookup) Outcome
// =============================================================================

/// Why a gift card cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiftCardRejection {
    InvalidCode,
    Disabled,
    NoBalance,
}

impl fmt::Display for GiftCardRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiftCardRejection::InvalidCode => f.write_str("Invalid gift card code"),
            GiftCardRejection::Disabled => f.write_str("This gift card is disabled"),
            GiftCardRejection::NoBalance => f.write_str("This gift card has no remaining balance"),
        }
    }
}

/// Result of validating a looked-up gift card.
#[derive(Debug, Clone, PartialEq)]
pub enum GiftCardCheck {
    Valid(GiftCard),
    Invalid(GiftCardRejection),
}

impl GiftCardCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, GiftCardCheck::Valid(_))
    }
}

/// Classifies a lookup result. An absent card is reported with the same
/// generic reason regardless of why it was not found.
pub fn validate_gift_card(card: Option<GiftCard>) -> GiftCardCheck {
    match card {
        None => GiftCardCheck::Invalid(GiftCardRejection::InvalidCode),
        Some(card) => match check_redeemable(&card) {
            Ok(()) => GiftCardCheck::Valid(card),
            Err(rejection) => GiftCardCheck::Invalid(rejection),
        },
    }
}

/// Checks that a card is active and has something left on it.
pub fn check_redeemable(card: &GiftCard) -> Result<(), GiftCardRejection> {
    if card.status != GiftCardStatus::Active {
        return Err(GiftCardRejection::Disabled);
    }

    if !card.balance().is_positive() {
        return Err(GiftCardRejection::NoBalance);
    }

    Ok(())
}

/// How much of the card's balance applies to a cart: `min(balance, cart)`,
/// never negative.
///
/// ## Example
/// ```rust,ignore
/// // $30 card on a $12.50 cart covers the whole cart
/// assert_eq!(applicable_amount(&card, Money::from_cents(1250)).cents(), 1250);
/// ```
pub fn applicable_amount(card: &GiftCard, cart_total: Money) -> Money {
    card.balance().min(cart_total).max(Money::zero())
}

// =============================================================================
// Status Transitions
// =============================================================================

/// Checks an administrative status change.
///
/// Disabling is always allowed. Enabling an exhausted card is refused so a
/// spent card cannot be brought back as usable.
pub fn check_status_change(card: &GiftCard, new_status: GiftCardStatus) -> Result<(), CoreError> {
    if new_status == GiftCardStatus::Active && !card.balance().is_positive() {
        return Err(CoreError::GiftCardExhausted);
    }
    Ok(())
}

// =============================================================================
// Debits
// =============================================================================

/// A planned balance reduction, applied with a compare-and-swap on the
/// balance the plan was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GiftCardDebit {
    pub expected_balance: Money,
    pub amount: Money,
    pub new_balance: Money,
}

/// Plans a debit of up to `requested` from the card.
///
/// The debited amount is capped at the current balance, so a request larger
/// than the balance drains the card to zero instead of failing.
pub fn plan_debit(card: &GiftCard, requested: Money) -> Result<GiftCardDebit, CoreError> {
    if !requested.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        }
        .into());
    }

    check_redeemable(card).map_err(|rejection| CoreError::GiftCardNotRedeemable {
        reason: rejection.to_string(),
    })?;

    let balance = card.balance();
    let amount = requested.min(balance);

    Ok(GiftCardDebit {
        expected_balance: balance,
        amount,
        new_balance: balance - amount,
    })
}

// =============================================================================
// Issuance
// =============================================================================

/// Symbols used in generated codes. No `0`, `O`, `1` or `I`.
pub const GIFT_CARD_ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

const CODE_GROUPS: usize = 4;
const CODE_GROUP_LEN: usize = 4;

/// Generates a gift card code such as `7KQ2-M9XD-HH4T-RZ3W`.
pub fn generate_gift_card_code<R: Rng + CryptoRng>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_GROUPS * (CODE_GROUP_LEN + 1));

    for group in 0..CODE_GROUPS {
        if group > 0 {
            code.push('-');
        }
        for _ in 0..CODE_GROUP_LEN {
            let idx = rng.gen_range(0..GIFT_CARD_ALPHABET.len());
            code.push(GIFT_CARD_ALPHABET[idx] as char);
        }
    }

    code
}

/// The configured set of amounts a gift card may be issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denominations(Vec<Money>);

impl Denominations {
    /// Builds the set from cent amounts. Duplicates are dropped and the set is
    /// kept sorted.
    pub fn new(cents: impl IntoIterator<Item = i64>) -> ValidationResult<Self> {
        let mut amounts: Vec<Money> = Vec::new();
        for c in cents {
            if c <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "denomination".to_string(),
                });
            }
            amounts.push(Money::from_cents(c));
        }

        if amounts.is_empty() {
            return Err(ValidationError::required("denominations"));
        }

        amounts.sort();
        amounts.dedup();
        Ok(Denominations(amounts))
    }

    pub fn as_slice(&self) -> &[Money] {
        &self.0
    }

    pub fn contains(&self, amount: Money) -> bool {
        self.0.binary_search(&amount).is_ok()
    }

    /// Rejects amounts that are not one of the configured denominations.
    pub fn check(&self, amount: Money) -> Result<(), CoreError> {
        if self.contains(amount) {
            Ok(())
        } else {
            Err(CoreError::InvalidDenomination { amount })
        }
    }
}

impl Default for Denominations {
    fn default() -> Self {
        Denominations(
            [2500, 5000, 7500, 10000]
                .into_iter()
                .map(Money::from_cents)
                .collect(),
        )
    }
}

/// Request to issue a gift card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueGiftCard {
    pub amount_cents: i64,
    pub recipient_email: String,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Validates an issuance request against the configured denominations.
///
/// ## Returns
/// The request with its email and free-text fields normalized.
pub fn validate_issue_request(
    request: IssueGiftCard,
    denominations: &Denominations,
) -> Result<IssueGiftCard, CoreError> {
    denominations.check(Money::from_cents(request.amount_cents))?;

    Ok(IssueGiftCard {
        amount_cents: request.amount_cents,
        recipient_email: validate_email(&request.recipient_email)?,
        recipient_name: validate_optional_text("recipient_name", request.recipient_name.as_deref(), 100)?,
        sender_name: validate_optional_text("sender_name", request.sender_name.as_deref(), 100)?,
        message: validate_optional_text("message", request.message.as_deref(), 500)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
