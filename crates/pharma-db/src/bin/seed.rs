//! # Seed Data Generator
//!
//! Populates the database with a pharmacy catalog and operator accounts for
//! development.
//!
//! ## Usage
//! ```bash
//! cargo run -p pharma-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharma-db --bin seed -- --db ./data/pharma.db
//! ```
//!
//! ## Generated Data
//! - Three operators (admin, seller, cashier) with terminal codes and PINs
//! - A catalog of common pharmacy items across MEDICAMENTO, HIGIENE,
//!   SUPLEMENTO and CURATIVO categories, each with price and opening stock

use std::env;

use chrono::Utc;
use pharma_core::validation::{
    validate_category, validate_price_cents, validate_product_name, validate_stock,
};
use pharma_core::Product;
use pharma_db::repository::seller::new_seller;
use pharma_db::{Database, DbConfig};
use uuid::Uuid;

/// (name, category, price in cents, opening stock)
const CATALOG: &[(&str, &str, i64, i64)] = &[
    ("Dipirona 500mg 20cp", "MEDICAMENTO", 550, 120),
    ("Paracetamol 750mg 20cp", "MEDICAMENTO", 890, 90),
    ("Ibuprofeno 600mg 10cp", "MEDICAMENTO", 1240, 60),
    ("Amoxicilina 500mg 21cp", "MEDICAMENTO", 2350, 40),
    ("Omeprazol 20mg 28cp", "MEDICAMENTO", 1180, 75),
    ("Losartana 50mg 30cp", "MEDICAMENTO", 950, 80),
    ("Loratadina 10mg 12cp", "MEDICAMENTO", 780, 55),
    ("Soro Fisiologico 250ml", "MEDICAMENTO", 620, 100),
    ("Xarope Guaco 150ml", "MEDICAMENTO", 1490, 35),
    ("Pomada Cetoconazol 30g", "MEDICAMENTO", 1670, 25),
    ("Alcool Gel 70% 500ml", "HIGIENE", 990, 140),
    ("Sabonete Antisseptico 90g", "HIGIENE", 480, 110),
    ("Escova Dental Macia", "HIGIENE", 750, 85),
    ("Creme Dental 90g", "HIGIENE", 560, 130),
    ("Protetor Solar FPS50 120ml", "HIGIENE", 4590, 30),
    ("Vitamina C 1g 10cp Efervescente", "SUPLEMENTO", 1520, 70),
    ("Vitamina D 2000UI 30cp", "SUPLEMENTO", 2890, 45),
    ("Complexo B 60cp", "SUPLEMENTO", 1980, 50),
    ("Whey Protein 900g", "SUPLEMENTO", 8990, 15),
    ("Curativo Adesivo 40un", "CURATIVO", 820, 95),
    ("Gaze Esteril 10un", "CURATIVO", 540, 120),
    ("Esparadrapo 10m", "CURATIVO", 690, 60),
    ("Termometro Digital", "CURATIVO", 2490, 20),
    ("Seringa 5ml 10un", "CURATIVO", 1150, 80),
];

/// (name, code, pin, role)
const OPERATORS: &[(&str, &str, &str, &str)] = &[
    ("Administrador", "0001", "1234", "ADMIN"),
    ("Ana Souza", "1001", "4321", "USER"),
    ("Bruno Lima", "1002", "8765", "USER"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./pharma_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Pharma POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pharma_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Pharma POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

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
    println!("Creating operators...");
    for (name, code, pin, role) in OPERATORS {
        let seller = new_seller(name, code, pin, role);
        db.sellers().insert(&seller).await?;
        println!("  {} (code {}, role {})", name, code, role);
    }

    println!();
    println!("Creating catalog...");
    let start = std::time::Instant::now();
    let mut created = 0;

    for (name, category, price_cents, stock) in CATALOG {
        // Run the same validation the terminal applies to manual entry.
        validate_product_name(name)?;
        validate_category(category)?;
        validate_price_cents(*price_cents)?;
        validate_stock(*stock)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            price_cents: *price_cents,
            stock: *stock,
            category: category.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }
        created += 1;
    }

    let elapsed = start.elapsed();
    println!("✓ Created {} products in {:?}", created, elapsed);

    println!();
    println!("Verifying search...");
    let results = db.products().search("dipirona", None, 10).await?;
    println!("  Search 'dipirona': {} results", results.len());

    let categories = db.products().list_categories().await?;
    println!("  Categories: {}", categories.join(", "));

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
