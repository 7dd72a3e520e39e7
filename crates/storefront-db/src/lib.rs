//! # storefront-db: Tenant-Scoped Persistence
//!
//! SQLite storage for the storefront, accessed through `sqlx`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  axum handler (X-Store: acme)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  storefront-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  TenantScope  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │───►│  (scope.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ CouponRepo    │    │ 001_initial_ │  │   │
//! │  │   │ stores()      │    │ GiftCardRepo  │    │ schema.sql   │  │   │
//! │  │   │               │    │ Entitlement.. │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`scope`] - Tenant-bound repository factory
//! - [`repo`] - Store traits the engine is generic over
//! - [`repository`] - SQLite repository implementations
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storefront_db::{CouponStore, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("storefront.db")).await?;
//!
//! let store = db.stores().find_active_by_slug("acme").await?.ok_or(..)?;
//! let coupon = db.scoped(store.tenant_id()).coupons().find_by_code("SAVE10").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repo;
pub mod repository;
pub mod scope;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repo::{CouponStore, EntitlementStore, GiftCardStore};
pub use scope::TenantScope;

pub use repository::coupon::CouponRepository;
pub use repository::entitlement::EntitlementRepository;
pub use repository::gift_card::GiftCardRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::store::StoreRepository;
