//! # Repository Module
//!
//! SQLite repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  engine service (storefront-api)                                       │
//! │       │                                                                 │
//! │       │  CouponStore / GiftCardStore / EntitlementStore (repo.rs)      │
//! │       ▼                                                                 │
//! │  CouponRepository ─ GiftCardRepository ─ EntitlementRepository        │
//! │  ProductRepository ─ OrderRepository                                   │
//! │       │                                                                 │
//! │       │  SQL, always `WHERE tenant_id = ?`                             │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StoreRepository`](store::StoreRepository) - Tenant directory (unscoped)
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon CRUD and guarded use counter
//! - [`GiftCardRepository`](gift_card::GiftCardRepository) - Cards and balance CAS
//! - [`EntitlementRepository`](entitlement::EntitlementRepository) - Download counter CAS
//! - [`ProductRepository`](product::ProductRepository) - Catalog admin
//! - [`OrderRepository`](order::OrderRepository) - Fulfilled orders and their items

pub mod coupon;
pub mod entitlement;
pub mod gift_card;
pub mod order;
pub mod product;
pub mod store;

/// Builds a `LIKE` pattern matching `query` anywhere, with `%`, `_` and `\`
/// escaped. Use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("save"), "%save%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
