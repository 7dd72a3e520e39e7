//! # Tenant Scope
//!
//! The capability to touch one store's data.
//!
//! A `TenantScope` is the only way to obtain tenant-owned repositories, and
//! each repository it hands out carries the scope's tenant id into every SQL
//! predicate. Code holding a scope for store A has no API through which it
//! could read or write store B.

use sqlx::SqlitePool;
use storefront_core::TenantId;

use crate::repository::coupon::CouponRepository;
use crate::repository::entitlement::EntitlementRepository;
use crate::repository::gift_card::GiftCardRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;

/// Repositories bound to a single tenant.
#[derive(Debug, Clone)]
pub struct TenantScope {
    pool: SqlitePool,
    tenant: TenantId,
}

impl TenantScope {
    pub(crate) fn new(pool: SqlitePool, tenant: TenantId) -> Self {
        TenantScope { pool, tenant }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone(), self.tenant.clone())
    }

    pub fn gift_cards(&self) -> GiftCardRepository {
        GiftCardRepository::new(self.pool.clone(), self.tenant.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.tenant.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone(), self.tenant.clone())
    }

    /// Download entitlements (order items resolved by capability token).
    pub fn downloads(&self) -> EntitlementRepository {
        EntitlementRepository::new(self.pool.clone(), self.tenant.clone())
    }
}
