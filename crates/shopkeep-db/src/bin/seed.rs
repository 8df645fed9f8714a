//! # Seed Data Generator
//!
//! Populates the database with a small grocery catalog for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p shopkeep-db --bin seed
//!
//! # Specify database path
//! cargo run -p shopkeep-db --bin seed -- --db ./data/shopkeep.db
//!
//! # Also ring up a few demo sales
//! cargo run -p shopkeep-db --bin seed -- --with-sales
//! ```
//!
//! ## Generated Products
//! Each category gets its products with:
//! - Barcode `893{category}{index}` (EAN-13 length, checksum not valid)
//! - Cost at 70-85% of price
//! - Stock spread from 0 to 60 so some products start low
//! - Perishables with expiry dates 3 to 90 days out

use chrono::{Duration, Utc};
use std::env;

use shopkeep_db::{CheckoutItem, CheckoutRequest, Database, DbConfig, NewProduct};

/// (category, unit, perishable, products as (name, price in đồng))
const CATALOG: &[(&str, &str, bool, &[(&str, i64)])] = &[
    (
        "Đồ uống",
        "chai",
        false,
        &[
            ("Coca-Cola 390ml", 10_000),
            ("Pepsi 390ml", 10_000),
            ("Trà xanh 0 độ", 12_000),
            ("Nước suối Lavie 500ml", 5_000),
            ("Sting dâu", 12_000),
            ("Red Bull", 15_000),
        ],
    ),
    (
        "Sữa",
        "hộp",
        true,
        &[
            ("Sữa tươi Vinamilk 180ml", 8_000),
            ("Sữa TH True Milk 180ml", 9_000),
            ("Sữa chua Vinamilk", 7_000),
            ("Sữa đặc Ông Thọ", 25_000),
        ],
    ),
    (
        "Mì gói",
        "gói",
        false,
        &[
            ("Mì Hảo Hảo tôm chua cay", 4_000),
            ("Mì Omachi", 8_000),
            ("Phở Vifon", 9_000),
            ("Miến Phú Hương", 10_000),
        ],
    ),
    (
        "Bánh kẹo",
        "gói",
        true,
        &[
            ("Bánh Oreo", 18_000),
            ("Bánh ChocoPie", 55_000),
            ("Kẹo Alpenliebe", 20_000),
            ("Snack Oishi", 6_000),
        ],
    ),
    (
        "Gia vị",
        "chai",
        false,
        &[
            ("Nước mắm Nam Ngư", 38_000),
            ("Dầu ăn Neptune 1L", 55_000),
            ("Hạt nêm Knorr", 32_000),
            ("Đường Biên Hòa 1kg", 28_000),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./shopkeep_dev.db");
    let mut with_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-sales" | "-s" => with_sales = true,
            "--help" | "-h" => {
                println!("Shopkeep Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./shopkeep_dev.db)");
                println!("  -s, --with-sales   Ring up a few demo sales after seeding");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Shopkeep Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut seeded = Vec::new();

    for (category_idx, (category, unit, perishable, products)) in CATALOG.iter().enumerate() {
        for (product_idx, (name, price)) in products.iter().enumerate() {
            let seed = (category_idx * 10 + product_idx) as i64;
            let product = generate_product(category, unit, *perishable, name, *price, seed);

            match db.products().insert(&product).await {
                Ok(p) => seeded.push(p),
                Err(e) => eprintln!("Failed to insert {}: {}", product.name, e),
            }
        }
    }

    println!(
        "✓ Generated {} products in {:?}",
        seeded.len(),
        start.elapsed()
    );

    if with_sales {
        println!();
        println!("Ringing up demo sales...");
        let mut sold = 0;
        for product in seeded.iter().filter(|p| p.stock >= 2).take(5) {
            let request = CheckoutRequest {
                items: vec![CheckoutItem {
                    product_id: product.id.clone(),
                    quantity: 2,
                    price: None,
                }],
                customer_payment: product.price * 2,
                ..Default::default()
            };
            match db.orders().checkout(&request).await {
                Ok(order) => {
                    sold += 1;
                    println!("  {} {} × 2 = {}đ", order.order_number, product.name, order.total);
                }
                Err(e) => eprintln!("Failed to sell {}: {}", product.name, e),
            }
        }
        println!("✓ Created {} orders", sold);
    }

    println!();
    println!("Verifying search...");
    let results = db.products().search("sữa", 10).await?;
    println!("  Search 'sữa': {} results", results.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one catalog entry with deterministic pseudo-random details.
fn generate_product(
    category: &str,
    unit: &str,
    perishable: bool,
    name: &str,
    price: i64,
    seed: i64,
) -> NewProduct {
    let cost_pct = 70 + (seed * 7) % 16;
    let stock = (seed * 13) % 61;
    let expiry_date = perishable.then(|| Utc::now() + Duration::days(3 + (seed * 11) % 88));

    NewProduct {
        name: name.to_string(),
        price,
        cost: price * cost_pct / 100,
        stock,
        barcode: Some(format!("893{:010}", seed)),
        category: Some(category.to_string()),
        unit: Some(unit.to_string()),
        expiry_date,
        supplier: Some("Nhà phân phối demo".to_string()),
        ..Default::default()
    }
}
