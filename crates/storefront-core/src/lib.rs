//! # storefront-core: Order Value & Entitlement Rules
//!
//! This crate holds the rules that decide how much an order is worth and what a
//! buyer is entitled to afterwards. Everything here is a pure function of its
//! inputs: stored records are passed in, decisions come out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Storefront Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 storefront-api (axum handlers)                  │   │
//! │  │  validate coupon ─ validate gift card ─ download ─ fulfill     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ storefront-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌─────────────┐   │   │
//! │  │   │  coupon  │  │gift_card │  │entitlement│  │ validation  │   │   │
//! │  │   │ evaluate │  │  ledger  │  │  counter  │  │   rules     │   │   │
//! │  │   └──────────┘  └──────────┘  └───────────┘  └─────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ records in, decisions out              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              storefront-db (tenant-scoped SQLite)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Coupon, GiftCard, Product, Order, ...)
//! - [`money`] - Integer minor-unit money
//! - [`catalog`] - Product admin input
//! - [`coupon`] - Coupon evaluation and discount computation
//! - [`gift_card`] - Stored-value card rules and code generation
//! - [`entitlement`] - Digital download limit rules and capability tokens
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//!
//! let cart = Money::from_cents(5000); // $50.00
//! let discount = cart.percentage_of(10);
//! assert_eq!(discount.cents(), 500);
//! assert_eq!(discount.to_string(), "$5.00");
//! ```

pub mod catalog;
pub mod coupon;
pub mod entitlement;
pub mod error;
pub mod gift_card;
pub mod money;
pub mod types;
pub mod validation;

pub use coupon::{evaluate_coupon, CouponOutcome, CouponRejection};
pub use entitlement::DownloadError;
pub use error::{CoreError, ValidationError};
pub use gift_card::{Denominations, GiftCardDebit, GiftCardRejection};
pub use money::Money;
pub use types::*;

/// Maximum length of a coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 50;

/// Maximum quantity of a single line item in a fulfilled order.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of rows returned by an admin listing.
pub const MAX_LIST_LIMIT: u32 = 200;
