//! # Seed Data Generator
//!
//! Populates a file-backed store with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default data directory
//! cargo run -p vela-store --bin seed
//!
//! # Specify the data directory
//! cargo run -p vela-store --bin seed -- --data ./vela_data
//! ```
//!
//! Seeds an admin account (`admin` / `admin123`), a category tree with
//! products, a demo customer and supplier, and an opening cash float. The
//! run is skipped if the store already holds any user account.

use std::env;
use std::sync::Arc;

use vela_core::{CashMovementKind, ProductVariant, User, UserRole};
use vela_store::{
    CustomerDraft, EntityStore, FileBackend, Notifier, ProductDraft, StorageBackend,
};

const DEMO_PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    // (name, category, price cents, cost cents, stock)
    ("Espresso", "Drinks", 250, 80, 200),
    ("Cappuccino", "Drinks", 350, 110, 200),
    ("Orange Juice", "Drinks", 400, 150, 60),
    ("Sparkling Water", "Drinks", 200, 70, 120),
    ("Croissant", "Bakery", 300, 120, 40),
    ("Sourdough Loaf", "Bakery", 650, 280, 15),
    ("Blueberry Muffin", "Bakery", 320, 130, 30),
    ("Ham Sandwich", "Food", 750, 320, 25),
    ("Caesar Salad", "Food", 900, 380, 18),
    ("Tomato Soup", "Food", 550, 200, 22),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut data_dir = String::from("./vela_data");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data" | "-d" => {
                if i + 1 < args.len() {
                    data_dir = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vela POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --data <DIR>   Data directory (default: ./vela_data)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Vela POS Seed Data Generator");
    println!("===============================");
    println!("Data directory: {data_dir}");
    println!();

    let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::open(&data_dir)?);
    let mut store = EntityStore::open(backend, Notifier::new());

    if !store.users().is_empty() {
        println!("⚠ Store already has {} user(s)", store.users().len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the data directory to regenerate.");
        return Ok(());
    }

    // Admin account
    let salt = vela_store::password::generate_salt();
    let admin = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: "admin".into(),
        password_hash: vela_store::password::hash_password("admin123", &salt)?,
        salt,
        role: UserRole::Admin,
        is_active: true,
        failed_login_attempts: 0,
        lockout_until: None,
        is_two_factor_enabled: false,
        two_factor_secret: None,
        recovery_code: Some(vela_store::password::generate_recovery_code()),
        security_answer_hash: None,
        last_login: None,
        last_active: None,
        created_at: chrono::Utc::now(),
    };
    let recovery = admin.recovery_code.clone().unwrap_or_default();
    store.insert_user(admin)?;
    println!("✓ Admin account created (admin / admin123)");
    println!("  Recovery code: {recovery}");

    // Categories and products
    let mut category_ids = std::collections::HashMap::new();
    for (_, category, _, _, _) in DEMO_PRODUCTS {
        if !category_ids.contains_key(category) {
            let created = store.add_category(*category)?;
            category_ids.insert(*category, created.id);
        }
    }
    println!("✓ {} categories created", category_ids.len());

    for (name, category, price_cents, cost_cents, stock) in DEMO_PRODUCTS {
        store.add_product(ProductDraft {
            name: (*name).into(),
            category_id: category_ids.get(category).cloned(),
            price_cents: *price_cents,
            cost_cents: *cost_cents,
            stock: *stock,
            variants: vec![],
        })?;
    }
    // One variant-bearing product to exercise per-variant stock.
    store.add_product(ProductDraft {
        name: "Shop T-Shirt".into(),
        category_id: None,
        price_cents: 1500,
        cost_cents: 600,
        stock: 0,
        variants: vec![
            ProductVariant {
                id: "s".into(),
                name: "S".into(),
                price_cents: 1500,
                stock: 5,
            },
            ProductVariant {
                id: "m".into(),
                name: "M".into(),
                price_cents: 1500,
                stock: 8,
            },
            ProductVariant {
                id: "l".into(),
                name: "L".into(),
                price_cents: 1500,
                stock: 4,
            },
        ],
    })?;
    println!("✓ {} products created", store.products().len());

    // Demo accounts
    store.add_customer(CustomerDraft {
        name: "Walk-in Regular".into(),
        phone: Some("555-0101".into()),
        credit_limit_cents: 5_000,
        has_unlimited_credit: false,
    })?;
    store.add_supplier("Harbor Wholesale", Some("555-0202".into()), None)?;
    println!("✓ Demo customer and supplier created");

    // Opening float
    store.add_cash_movement(CashMovementKind::Open, 10_000, "Opening float")?;
    println!("✓ Opening float of 10000 cents booked");

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
