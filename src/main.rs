use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rusty_jeans::data::codes;
use rusty_jeans::{AppConfig, Dashboard, FilterSelection, color, load, load_model, report};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the dashboard configuration
    #[arg(long, default_value = "dashboard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every aggregation view of the dataset
    Explore {
        /// Rows to show per view (0 = all)
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Predict the next click order for one filter selection
    Predict {
        /// Price in US dollars
        #[arg(long)]
        price: f64,
        /// Colour id (1-14)
        #[arg(long)]
        colour: i64,
        /// Photo location id (1-6)
        #[arg(long)]
        location: i64,
        /// Product category id (1-4)
        #[arg(long)]
        category: i64,
        /// Photo type id (1-2)
        #[arg(long)]
        photography: i64,
        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the feature contract and the model's declared columns
    Schema,
    /// List the static report images
    Report,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    match args.command {
        Command::Report => print_report(&config),
        Command::Explore { top } => explore(&start(&config)?, top),
        Command::Predict {
            price,
            colour,
            location,
            category,
            photography,
            json,
        } => {
            let selection = FilterSelection {
                price,
                colour,
                location,
                category,
                photography,
            };
            print_prediction(&mut start(&config)?, selection, json)?;
        }
        Command::Schema => print_schema(&start(&config)?)?,
    }
    Ok(())
}

/// Load the dataset and model and wire them into a session.
fn start(config: &AppConfig) -> Result<Dashboard> {
    let dataset = load(&config.dataset.path, config.delimiter()?)
        .context("dataset is required to start the dashboard")?;
    let predictor = load_model(&config.model.path)
        .context("model is required to start the dashboard")?;
    Ok(Dashboard::new(config, Arc::new(dataset), Arc::new(predictor))?)
}

fn print_prediction(dashboard: &mut Dashboard, selection: FilterSelection, json: bool) -> Result<()> {
    dashboard.set_selection(selection)?;
    let similar = dashboard.similar_clicks();
    let prediction = dashboard.predict()?;
    if json {
        println!("{}", serde_json::to_string_pretty(prediction)?);
        return Ok(());
    }
    println!(
        "{} {} at ${:.2}, photographed {}, shown {} on the page",
        codes::colour_name(selection.colour),
        codes::category_name(selection.category),
        selection.price,
        codes::photography_name(selection.photography),
        codes::location_name(selection.location)
    );
    println!("Order of clicks will be the next: {}", prediction.label);
    println!("  probability {:.3}", prediction.probability);
    println!("  {similar} logged clicks show this kind of item");
    Ok(())
}

fn print_schema(dashboard: &Dashboard) -> Result<()> {
    let predictor = dashboard.predictor();
    let record = dashboard.feature_record()?;
    println!("Configured feature columns:");
    for c in record.columns() {
        println!("  {c}");
    }
    println!(
        "Model ({}, {}) columns:",
        predictor.kind(),
        predictor.source().display()
    );
    for c in predictor.feature_columns() {
        println!("  {c}");
    }
    println!("Classes: {}", predictor.classes().join(", "));
    println!("Record for the initial selection:");
    println!("{record}");
    Ok(())
}

fn limit<T>(rows: &[T], top: usize) -> &[T] {
    if top == 0 { rows } else { &rows[..rows.len().min(top)] }
}

fn explore(dashboard: &Dashboard, top: usize) {
    println!("#### Data exploration ({} clicks)", dashboard.dataset().len());
    for (column, distinct) in dashboard.dataset().cardinalities() {
        println!("  {column:<24} {distinct:>6} distinct");
    }

    println!("\n##### Most popular colours by price");
    for row in limit(&dashboard.price_bins_by_colour(), top) {
        println!(
            "{:>10}  {:<16} {} {:>6}",
            row.bin.to_string(),
            codes::colour_name(row.colour),
            color::to_hex(color::swatch(row.colour)),
            row.count
        );
    }

    println!("\n##### Appearance of an item in a specific order");
    for row in limit(&dashboard.orders_by_category_month(), top) {
        println!(
            "{:<10} {} month {:>2} {:>8}",
            row.category_name,
            color::to_hex(color::category_colour(row.category)),
            row.month,
            row.orders
        );
    }

    println!("\n##### Orders by country (normalised)");
    for row in limit(&dashboard.normalized_orders_by_country(), top) {
        println!(
            "{:<24} {:>8} {:>6.3}",
            row.country_name, row.orders, row.normalized
        );
    }

    println!("\n##### Amount of clothing type sold on a specific day");
    for row in limit(&dashboard.daily_counts_by_category(), top) {
        println!(
            "{}-{:02}-{:02}  {:<10} {} {:>6}",
            row.year,
            row.month,
            row.day,
            codes::category_name(row.category),
            color::to_hex(color::category_colour(row.category)),
            row.count
        );
    }

    println!("\n##### Average price of items grouped by colours");
    for row in limit(&dashboard.average_price_by_colour(), top) {
        println!(
            "{:<16} {} {:>8.2} ({} clicks)",
            row.colour_name,
            color::to_hex(color::swatch(row.colour)),
            row.mean_price,
            row.count
        );
    }
}

fn print_report(config: &AppConfig) {
    for img in report::inspect(&config.report.images) {
        match img.dimensions {
            Ok((w, h)) => println!("{}: {} ({w}x{h})", img.title, img.path.display()),
            Err(e) => println!("{}: {} (unavailable: {e})", img.title, img.path.display()),
        }
    }
}
