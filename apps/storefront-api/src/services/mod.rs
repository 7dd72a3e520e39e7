//! Engine services.
//!
//! Each service is built per request from the request's [`storefront_db::TenantScope`]
//! and holds no state of its own between requests.

pub mod catalog_service;
pub mod coupon_service;
pub mod download_service;
pub mod gift_card_service;
pub mod order_service;

pub use catalog_service::ProductCatalog;
pub use coupon_service::CouponEvaluator;
pub use download_service::DownloadCounter;
pub use gift_card_service::{GiftCardLedger, IssuedGiftCard, NotificationOutcome, Redemption};
pub use order_service::{FulfilledOrder, OrderFulfillment, PaymentReport, ReportedItem};
