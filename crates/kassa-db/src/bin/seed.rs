//! # Seed Data Generator
//!
//! Populates the database with categories and products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p kassa-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p kassa-db --bin seed -- --count 1000
//!
//! # Specify database path / config file
//! cargo run -p kassa-db --bin seed -- --db ./data/kassa.db
//! cargo run -p kassa-db --bin seed -- --config ./kassa.toml
//! ```
//!
//! ## Generated Products
//! One category per entry in `CATEGORIES`, products named
//! `{item} {variant}`. Prices and stock are derived from the product's
//! index, so two runs against empty databases produce the same catalog:
//! - Price: $0.49 - $24.48 plus a variant surcharge
//! - Stock: 0 - 60
//! - Barcode: `200` + 10-digit index

use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

use kassa_core::{NewCategory, NewProduct};
use kassa_db::{init_tracing, Database, KassaConfig};

const DEFAULT_COUNT: usize = 200;

/// Categories and the items stocked in each.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Paper",
        &[
            "Notebook",
            "Legal Pad",
            "Sticky Notes",
            "Index Cards",
            "Printer Paper",
            "Graph Paper",
            "Envelopes",
            "Cardstock",
        ],
    ),
    (
        "Writing",
        &[
            "Ballpoint Pen",
            "Gel Pen",
            "Fountain Pen",
            "Pencil",
            "Mechanical Pencil",
            "Highlighter",
            "Marker",
            "Fineliner",
        ],
    ),
    (
        "Desk",
        &[
            "Stapler",
            "Staples",
            "Paper Clips",
            "Tape Dispenser",
            "Scissors",
            "Ruler",
            "Hole Punch",
            "Desk Organizer",
        ],
    ),
    (
        "Art",
        &[
            "Sketchbook",
            "Watercolor Set",
            "Acrylic Paint",
            "Brush Set",
            "Charcoal",
            "Pastels",
            "Canvas",
            "Palette",
        ],
    ),
    (
        "Filing",
        &[
            "Folder",
            "Binder",
            "Sheet Protectors",
            "Dividers",
            "Label Maker Tape",
            "Archive Box",
            "Clipboard",
            "Expanding File",
        ],
    ),
];

/// Variants and their surcharge in cents.
const VARIANTS: &[(&str, i64)] = &[
    ("Black", 0),
    ("Blue", 0),
    ("Red", 0),
    ("A5", 50),
    ("A4", 100),
    ("Pack of 3", 150),
    ("Pack of 10", 400),
];

struct Args {
    count: usize,
    db_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let mut config = KassaConfig::load(args.config_path)?;
    if let Some(path) = args.db_path {
        config.database.path = path;
    }

    init_tracing(&config.logging.filter);

    info!(
        path = %config.database.path.display(),
        count = args.count,
        "Kassa POS seed data generator"
    );

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Database already has products; skipping seed. Delete the database file to regenerate."
        );
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0usize;
    let mut index = 0usize;

    'categories: for (category_name, items) in CATEGORIES {
        let category = match db.categories().get_by_name(category_name).await? {
            Some(category) => category,
            None => db.categories().create(&NewCategory::new(*category_name)).await?,
        };

        for item in items.iter() {
            for (variant, surcharge) in VARIANTS {
                if generated >= args.count {
                    break 'categories;
                }

                let input = generate_product(&category.id, item, variant, *surcharge, index);
                index += 1;

                match db.products().create(&input).await {
                    Ok(_) => generated += 1,
                    Err(e) => {
                        warn!(name = %input.name, error = %e, "Failed to insert product");
                        continue;
                    }
                }

                if generated % 100 == 0 {
                    info!(generated, "Progress");
                }
            }
        }
    }

    let elapsed = start.elapsed();
    info!(
        generated,
        categories = db.categories().count().await?,
        elapsed_ms = elapsed.as_millis() as u64,
        "Seed complete"
    );

    let sample = db.products().search("pen", 5).await?;
    info!(results = sample.len(), "Search 'pen'");

    db.close().await;
    Ok(())
}

/// Parses command line arguments. `None` means help was printed.
fn parse_args() -> Result<Option<Args>, Box<dyn std::error::Error>> {
    let argv: Vec<String> = env::args().skip(1).collect();
    let mut args = Args {
        count: DEFAULT_COUNT,
        db_path: None,
        config_path: None,
    };

    let mut iter = argv.into_iter();
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--count" | "-c" => {
                let value = iter.next().ok_or("--count needs a value")?;
                args.count = value
                    .parse()
                    .map_err(|_| format!("invalid --count value: {value}"))?;
            }
            "--db" | "-d" => {
                args.db_path = Some(PathBuf::from(iter.next().ok_or("--db needs a path")?));
            }
            "--config" => {
                args.config_path =
                    Some(PathBuf::from(iter.next().ok_or("--config needs a path")?));
            }
            "--help" | "-h" => {
                println!("Kassa POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("      --config <PATH>  TOML config file (default: $KASSA_CONFIG)");
                println!("  -h, --help           Show this help message");
                return Ok(None);
            }
            other => return Err(format!("unknown argument: {other}").into()),
        }
    }

    Ok(Some(args))
}

/// Builds one product from its position in the catalog.
fn generate_product(
    category_id: &str,
    item: &str,
    variant: &str,
    surcharge: i64,
    index: usize,
) -> NewProduct {
    let seed = index as i64;

    // $0.49 - $24.48
    let price_cents = 49 + (seed * 37) % 2400 + surcharge;
    // 55-74% of price
    let cost_cents = price_cents * (55 + seed % 20) / 100;

    NewProduct {
        category_id: category_id.to_string(),
        name: format!("{item} {variant}"),
        price_cents,
        cost_cents,
        stock_quantity: (seed * 7) % 61,
        barcode: Some(format!("200{index:010}")),
        description: None,
    }
}
