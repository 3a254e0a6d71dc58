//! # Demo Cache Seeder
//!
//! Populates the local cache with demo data for development, so the app can
//! be exercised fully offline without a remote backend.
//!
//! ## Usage
//! ```bash
//! # Seed the default cache file
//! cargo run -p vela-store --bin seed
//!
//! # Custom product count and path
//! cargo run -p vela-store --bin seed -- --count 500 --db ./data/vela-cache.db
//! ```

use chrono::Utc;
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vela_core::{Branch, Category, Customer, EntityKind, PaymentAccount, Product};
use vela_store::{EntityCache, LocalStore, StoreConfig};

/// Product names used for demo data.
const PRODUCT_NAMES: &[&str] = &[
    "Coca-Cola 330ml",
    "Pepsi 500ml",
    "Sprite 330ml",
    "Lays Classic",
    "Doritos Nacho",
    "Snickers Bar",
    "Orange Juice 1L",
    "Dasani Water",
    "Red Bull 250ml",
    "Kit Kat",
];

const CUSTOMER_NAMES: &[&str] = &[
    "John Carter",
    "Mary Shaw",
    "Ahmed Khan",
    "Lucia Ortiz",
    "Wei Chen",
    "Fatima Noor",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut db_path = "./vela_cache.db".to_string();
    let mut count: usize = 200;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vela POS Demo Cache Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Cache file path (default: ./vela_cache.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Vela POS Demo Cache Seeder");
    println!("=============================");
    println!("Cache:    {}", db_path);
    println!("Products: {}", count);
    println!();

    let store = LocalStore::open(StoreConfig::new(&db_path)).await?;
    println!("✓ Cache opened, migrations applied");

    let stats = store.tables().stats().await?;
    if stats.has_minimal_data() {
        println!("⚠ Cache already has data ({} records)", stats.total_records());
        println!("  Skipping seed. Delete the cache file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    // Categories first so products can reference them.
    let categories: Vec<Category> = ["Beverages", "Snacks", "Grocery", "Dairy"]
        .iter()
        .map(|name| Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        })
        .collect();

    let products: Vec<Product> = (0..count)
        .map(|i| Product {
            id: Uuid::new_v4().to_string(),
            sku: format!("DEMO-{:04}", i),
            name: format!(
                "{} #{}",
                PRODUCT_NAMES[i % PRODUCT_NAMES.len()],
                i / PRODUCT_NAMES.len() + 1
            ),
            price_cents: 99 + ((i * 17) % 1900) as i64,
            category_id: Some(categories[i % categories.len()].id.clone()),
            stock: Some((i % 101) as i64),
            is_active: true,
            updated_at: now,
        })
        .collect();

    let customers: Vec<Customer> = CUSTOMER_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: Some(format!("+1-555-01{:02}", i)),
            email: None,
            balance_cents: 0,
            updated_at: now,
        })
        .collect();

    let branches = vec![Branch {
        id: Uuid::new_v4().to_string(),
        name: "Downtown".into(),
        address: Some("1 Main St".into()),
    }];

    let accounts = vec![
        PaymentAccount {
            id: Uuid::new_v4().to_string(),
            name: "Register Cash".into(),
            kind: "cash".into(),
        },
        PaymentAccount {
            id: Uuid::new_v4().to_string(),
            name: "Main Bank".into(),
            kind: "bank".into(),
        },
    ];

    let start = std::time::Instant::now();

    EntityCache::new(store.clone()).save(&products).await?;
    EntityCache::new(store.clone()).save(&customers).await?;
    EntityCache::new(store.clone()).save(&branches).await?;
    EntityCache::new(store.clone()).save(&categories).await?;
    EntityCache::new(store.clone()).save(&accounts).await?;

    let elapsed = start.elapsed();
    let stats = store.tables().stats().await?;

    println!("✓ Seeded in {:?}", elapsed);
    for kind in EntityKind::ALL {
        println!("  {:20} {:>6} records", kind.table_name(), stats.count(kind));
    }
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
