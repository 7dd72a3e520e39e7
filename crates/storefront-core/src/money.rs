//! # Money Module
//!
//! The `Money` type: integer minor units (cents), never floating point.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A 15% coupon on $19.99 computed in floats drifts by fractions of a    │
//! │  cent, and those fractions end up on receipts and in refunds.          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1999 cents × 15 / 100 = 299.85 → 300 cents (explicit rounding)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::money::Money;
//!
//! let cart = Money::from_cents(1500);
//! let coupon = Money::from_cents(2000);
//!
//! // A fixed discount never exceeds what it is applied to
//! assert_eq!(coupon.min(cart).cents(), 1500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction results can be inspected before clamping
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Ord**: `min`/`max` express caps directly (`balance.min(cart_total)`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let price = Money::from_cents(2500); // $25.00
    /// assert_eq!(price.cents(), 2500);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `pct` percent of this amount, rounded half away from zero.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * pct + 50) / 100` for non-negative
    /// amounts. The +50 is the half-cent rounding term.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// // 10% of $50.00
    /// assert_eq!(Money::from_cents(5000).percentage_of(10).cents(), 500);
    ///
    /// // 15% of $19.99 = 299.85 → 300
    /// assert_eq!(Money::from_cents(1999).percentage_of(15).cents(), 300);
    /// ```
    pub fn percentage_of(&self, pct: i64) -> Money {
        let product = self.0 as i128 * pct as i128;
        let rounded = if product >= 0 {
            (product + 50) / 100
        } else {
            (product - 50) / 100
        };
        Money::from_cents(rounded as i64)
    }

    /// Subtracts, stopping at zero.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    ///
    /// let balance = Money::from_cents(300);
    /// assert_eq!(balance.saturating_sub(Money::from_cents(500)), Money::zero());
    /// ```
    #[inline]
    pub fn saturating_sub(self, other: Money) -> Money {
        if other >= self {
            Money::zero()
        } else {
            Money(self.0 - other.0)
        }
    }

    /// Adds, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Multiplies by a quantity, or `None` on overflow.
    #[inline]
    pub fn checked_mul(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `$X.YY`, the form used in customer-facing rejection messages
/// ("Minimum order of $25.00 required").
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(2500).to_string(), "$25.00");
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_percentage_of_rounds_half_up() {
        assert_eq!(Money::from_cents(5000).percentage_of(10).cents(), 500);
        // 12.5 → 13
        assert_eq!(Money::from_cents(125).percentage_of(10).cents(), 13);
        // 12.4 → 12
        assert_eq!(Money::from_cents(124).percentage_of(10).cents(), 12);
        assert_eq!(Money::from_cents(999).percentage_of(100).cents(), 999);
        assert_eq!(Money::zero().percentage_of(50).cents(), 0);
    }

    #[test]
    fn test_percentage_of_large_amount_does_not_overflow() {
        let big = Money::from_cents(i64::MAX / 2);
        let half = big.percentage_of(100);
        assert_eq!(half, big);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_saturating_sub() {
        let balance = Money::from_cents(500);
        assert_eq!(balance.saturating_sub(Money::from_cents(200)).cents(), 300);
        assert_eq!(balance.saturating_sub(Money::from_cents(500)).cents(), 0);
        assert_eq!(balance.saturating_sub(Money::from_cents(900)).cents(), 0);
    }

    #[test]
    fn test_checked_arithmetic() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(half.checked_add(half), None);
        assert_eq!(half.checked_mul(2), None);
        assert_eq!(
            Money::from_cents(1800).checked_mul(2).and_then(|m| m.checked_add(Money::from_cents(1200))),
            Some(Money::from_cents(4800))
        );
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }
}
