//! Beebo - Headless assembler shell
//!
//! Loads the catalog, places the default parts, applies scripted
//! selections and prints the resulting assembly.

mod config;

use anyhow::{anyhow, Context, Result};
use beebo_assembly::{Assembler, AssemblySnapshot, GltfStore, Quote, SelectOutcome, TracingProgress};
use beebo_core::{Catalog, PartDefinition, Slot};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "beebo")]
#[command(about = "Assemble a Beebo robot from catalog parts")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "beebo.toml")]
    config: PathBuf,

    /// Directory containing models/ (overrides the config file)
    #[arg(short, long)]
    assets: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Select a part, e.g. `head=Beanie` or `accessories-clothes=Cloak` (repeatable)
    #[arg(short, long = "select", value_name = "SLOT=PART")]
    selections: Vec<String>,

    /// Disable accessory collision checks
    #[arg(long)]
    no_collisions: bool,

    /// Reset to the default assembly after applying selections
    #[arg(long)]
    reset: bool,

    /// Print the assembly as JSON
    #[arg(long)]
    json: bool,

    /// List the catalog and exit
    #[arg(long)]
    list: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    write_default_config: bool,
}

#[derive(Serialize)]
struct Report {
    assembly: AssemblySnapshot,
    quote: Quote,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.write_default_config {
        config::save_default_config(&args.config)?;
        println!("Wrote {}", args.config.display());
        return Ok(());
    }

    info!("Beebo v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;
    if let Some(assets) = args.assets {
        config.assets.root = assets;
    }
    if args.no_collisions {
        config.assembly.collision.enabled = false;
    }

    let catalog = Arc::new(config.catalog.load()?);
    info!(parts = catalog.len(), "Catalog loaded");

    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }

    let selections = args
        .selections
        .iter()
        .map(|s| parse_selection(s))
        .collect::<Result<Vec<_>>>()?;

    info!(
        assets = %config.assets.root.display(),
        scale = config.assembly.scale,
        collisions = config.assembly.collision.enabled,
        "Configuration loaded"
    );

    let store = GltfStore::new(config.assets.root.clone());
    let assembler = Assembler::new(catalog, store, &config.assembly)
        .with_progress(Arc::new(TracingProgress));

    assembler.place_defaults().await;

    for (slot, name) in &selections {
        let (index, part) = resolve_part(assembler.catalog(), *slot, name)?;
        let outcome = assembler
            .select(*slot, index)
            .await
            .with_context(|| format!("Cannot select {} for {}", name, slot))?;
        match outcome {
            SelectOutcome::Withheld { colliding_with } => warn!(
                slot = %slot,
                "{}",
                beebo_assembly::events::collision_message(&part.display_name, &colliding_with.display_name)
            ),
            SelectOutcome::Failed(e) => warn!(slot = %slot, error = %e, "Part failed to load"),
            _ => {}
        }
    }

    if args.reset {
        assembler.reset_all().await;
    }

    let report = Report {
        assembly: assembler.snapshot().await,
        quote: assembler.quote().await,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// `slot=part` -> (slot, part name)
fn parse_selection(s: &str) -> Result<(Slot, String)> {
    let (slot, name) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected SLOT=PART, got {:?}", s))?;
    let slot: Slot = slot.parse()?;
    Ok((slot, name.trim().to_string()))
}

/// Catalog index and definition of the part named `name` in `slot`
fn resolve_part<'a>(catalog: &'a Catalog, slot: Slot, name: &str) -> Result<(usize, &'a PartDefinition)> {
    let index = catalog
        .find(slot, name)
        .with_context(|| format!("Cannot select {} for {}", name, slot))?;
    let part = catalog
        .part(slot, index)
        .ok_or_else(|| anyhow!("No part at index {} for {}", index, slot))?;
    Ok((index, part))
}

fn print_catalog(catalog: &Catalog) {
    for slot in Slot::ALL {
        println!("{}:", slot);
        for (index, part) in catalog.parts(slot).iter().enumerate() {
            println!("  [{}] {} ({:.2} POL)", index, part.display_name, part.effective_price());
        }
    }
}

fn print_report(report: &Report) {
    println!("Assembly:");
    for slot in Slot::ALL {
        let state = report.assembly.state(slot);
        println!("  {:<20} {:<20} {}", slot.to_string(), report.assembly.label(slot), state);
    }
    if report.assembly.pending_loads > 0 {
        println!("  ({} loads pending)", report.assembly.pending_loads);
    }

    println!("Price:");
    for line in &report.quote.lines {
        let note = if line.active { "" } else { " (withheld, not charged)" };
        println!(
            "  {:<20} {:<20} {:>8.2} POL{}",
            line.label, line.display_name, line.price, note
        );
    }
    println!("  {:<41} {:>8.2} POL", "Total", report.quote.total);
}
