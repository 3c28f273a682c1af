//! # Seed Data Generator
//!
//! Populates the database with a browsable catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p storefront-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p storefront-db --bin seed -- --count 1000
//!
//! # Specify database URL (falls back to DATABASE_URL)
//! cargo run -p storefront-db --bin seed -- --db postgres://localhost/storefront
//! ```
//!
//! ## Generated Catalog
//! - Categories: Apparel (with T-Shirts and Hoodies), Kitchen, Books
//! - Options per leaf category (Color, Size, Format) with their values
//! - Products cycling through a name list; a few carry accented names so
//!   accent-insensitive search has something to match
//! - One sku per product × value of the category's first option:
//!   code `{CAT}-{NNNN}-{VALUE}`, price 4.99 - 64.99, stock 0 - 50

use std::collections::HashMap;
use std::env;

use anyhow::Context;
use storefront_core::{
    CategoryFields, OptionFields, OptionValueFields, ProductFields, SkuFields, State,
};
use storefront_db::{
    CategoryRepository, Database, DbConfig, OptionRepository, ProductRepository, SkuRepository,
};
use tracing_subscriber::EnvFilter;

/// Leaf categories: (code, name, parent name, option name, option values, product names)
const CATALOG: &[(&str, &str, &str, &str, &[&str], &[&str])] = &[
    (
        "TEE",
        "T-Shirts",
        "Apparel",
        "Color",
        &["Red", "Blue", "Black"],
        &["Classic Tee", "Crème Brûlée Tee", "Pocket Tee", "Vintage Logo Tee", "V-Neck Tee"],
    ),
    (
        "HOD",
        "Hoodies",
        "Apparel",
        "Size",
        &["S", "M", "L", "XL"],
        &["Zip Hoodie", "Pullover Hoodie", "Fleece Hoodie", "Piñata Hoodie"],
    ),
    (
        "KIT",
        "Kitchen",
        "",
        "Color",
        &["White", "Green"],
        &["Café Mug", "Espresso Cup", "Tea Infuser", "Cutting Board", "Chef Knife"],
    ),
    (
        "BOK",
        "Books",
        "",
        "Format",
        &["Paperback", "Hardcover"],
        &["Rust in Action", "Database Internals", "Les Misérables", "Dune", "Clean Code"],
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut database_url = env::var("DATABASE_URL").ok();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    database_url = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <URL>     PostgreSQL URL (default: $DATABASE_URL)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let database_url = database_url.context("no database URL: pass --db or set DATABASE_URL")?;

    println!("Storefront Seed Data Generator");
    println!("==============================");
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&database_url)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut conn = db.acquire().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
        .fetch_one(&mut *conn)
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    // Categories and options
    let mut parents: HashMap<&str, i64> = HashMap::new();
    let mut leaves = Vec::new();

    for (code, name, parent, option_name, values, products) in CATALOG {
        let parent_id = match *parent {
            "" => None,
            parent => {
                if !parents.contains_key(parent) {
                    let id = CategoryRepository::new(&mut conn)
                        .create(&CategoryFields {
                            name: parent.to_string(),
                            ..Default::default()
                        })
                        .await?;
                    parents.insert(parent, id);
                }
                parents.get(parent).copied()
            }
        };

        let category_id = CategoryRepository::new(&mut conn)
            .create(&CategoryFields {
                name: name.to_string(),
                parent: parent_id,
                ..Default::default()
            })
            .await?;

        let mut options = OptionRepository::new(&mut conn);
        let option_id = options
            .create_option(&OptionFields {
                category_id,
                name: option_name.to_string(),
                state: State::Enabled,
            })
            .await?;

        let mut value_ids = Vec::with_capacity(values.len());
        for value in values.iter() {
            let value_id = options
                .create_value(
                    option_id,
                    &OptionValueFields {
                        name: value.to_string(),
                        state: State::Enabled,
                    },
                )
                .await?;
            value_ids.push((*value, value_id));
        }

        leaves.push((*code, category_id, option_id, value_ids, *products));
    }
    println!("✓ Created {} categories with options", parents.len() + leaves.len());

    // Products and skus
    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut skus = 0;

    while generated < count {
        let (code, category_id, option_id, value_ids, products) = &leaves[generated % leaves.len()];
        let name = products[(generated / leaves.len()) % products.len()];
        let seed = generated;

        let product_id = ProductRepository::new(&mut conn)
            .create(&ProductFields {
                product_name: format!("{} #{}", name, seed / (leaves.len() * products.len()) + 1),
                description: format!("{} from the development catalog", name),
                category_id: *category_id,
                brand_id: Some((seed % 5) as i64 + 1),
                region_id: Some((seed % 3) as i64 + 1),
                state: State::Enabled,
            })
            .await?;

        for (value_name, value_id) in value_ids {
            let sku_code = format!("{}-{:04}-{}", code, seed, value_name.to_uppercase());
            let fields = generate_sku(&sku_code, seed + skus);

            if let Err(e) = SkuRepository::new(&mut conn).create(product_id, &fields).await {
                eprintln!("Failed to insert {}: {}", sku_code, e);
                continue;
            }
            OptionRepository::new(&mut conn)
                .create_sku_value(&sku_code, *option_id, *value_id)
                .await?;
            skus += 1;
        }

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} products...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products ({} skus) in {:?}", generated, skus, elapsed);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Deterministic sku data derived from `seed`.
fn generate_sku(code: &str, seed: usize) -> SkuFields {
    // 4.99 - 64.99
    let price_cents = 499 + ((seed * 37) % 61) as i64 * 100;
    let image = code.to_lowercase();

    SkuFields {
        sku: code.to_string(),
        price_cents,
        quantity: (seed % 51) as i64,
        large_name: format!("{image}-large.jpg"),
        small_name: format!("{image}-small.jpg"),
        thumb_name: format!("{image}-thumb.jpg"),
        state: State::Enabled,
    }
}
