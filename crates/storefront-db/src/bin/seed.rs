//! # Seed Data Generator
//!
//! Creates a demo store with a few coupons and products for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p storefront-db --bin seed
//!
//! # Specify database path and store slug
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db --store demo
//! ```
//!
//! ## Generated Data
//! - Store `demo` (or `--store <slug>`)
//! - Coupons: `WELCOME10` (10%), `TAKE5` ($5 off $25+), `LAUNCH` (single use)
//! - Products: a physical item and two digital downloads (limited/unlimited)

use chrono::Utc;
use std::env;
use storefront_core::{Coupon, DiscountKind, Product, Store};
use storefront_db::{CouponStore, Database, DbConfig};
use uuid::Uuid;

/// (code, kind, value, minimum_order_cents, max_uses)
const COUPONS: &[(&str, DiscountKind, i64, i64, Option<i64>)] = &[
    ("WELCOME10", DiscountKind::Percentage, 10, 0, None),
    ("TAKE5", DiscountKind::Fixed, 500, 2500, None),
    ("LAUNCH", DiscountKind::Percentage, 50, 0, Some(1)),
];

/// (name, price_cents, download_limit, asset_locator)
const PRODUCTS: &[(&str, i64, Option<i64>, Option<&str>)] = &[
    ("Enamel Mug", 1800, None, None),
    ("Field Guide (PDF)", 1200, Some(3), Some("guides/field-guide.pdf")),
    ("Sample Pack (ZIP)", 900, None, Some("packs/sample-pack.zip")),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./storefront_dev.db");
    let mut slug = String::from("demo");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    slug = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./storefront_dev.db)");
                println!("  -s, --store <SLUG>   Store slug (default: demo)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Storefront Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Store:    {}", slug);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    if db.stores().find_active_by_slug(&slug).await?.is_some() {
        println!("⚠ Store '{}' already exists, skipping seed.", slug);
        return Ok(());
    }

    let now = Utc::now();
    let store = Store {
        id: Uuid::new_v4().to_string(),
        slug: slug.clone(),
        name: format!("{} store", slug),
        is_active: true,
        created_at: now,
    };
    db.stores().insert(&store).await?;
    println!("✓ Created store {}", store.id);

    let scope = db.scoped(store.tenant_id());

    for (code, kind, value, minimum, max_uses) in COUPONS {
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            tenant_id: store.id.clone(),
            code: code.to_string(),
            description: None,
            discount_kind: *kind,
            discount_value: *value,
            minimum_order_cents: *minimum,
            max_uses: *max_uses,
            current_uses: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        scope.coupons().insert(&coupon).await?;
        println!("  coupon   {}", code);
    }

    for (name, price_cents, download_limit, asset_locator) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: store.id.clone(),
            name: name.to_string(),
            description: None,
            price_cents: *price_cents,
            is_digital: asset_locator.is_some(),
            download_limit: *download_limit,
            asset_locator: asset_locator.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        scope.products().insert(&product).await?;
        println!("  product  {} ({})", name, product.id);
    }

    println!();
    println!("✓ Seed complete! Send requests with `X-Store: {}`.", slug);

    Ok(())
}
