//! ICESat-2 boreal STAC generator
//!
//! Usage:
//!     icesat2-boreal-stac create-collection agb collections/agb.json
//!     icesat2-boreal-stac create-item tile.tif tile_train_data.csv item.json
//!     icesat2-boreal-stac resolve-item s3://bucket/path/tile.tif --copy-to s3://bucket/staged/
//!     icesat2-boreal-stac validate item.json

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use icesat2_boreal_stac::config::Settings;
use icesat2_boreal_stac::constants::STAC_VERSION;
use icesat2_boreal_stac::{
    create_collection, AssetResolver, Destination, GdalIntrospector, ItemSynthesizer, Record,
    S3Store, StacError, StorageError, Variable,
};

// =============================================================================
// CLI Definition
// =============================================================================

#[derive(Parser)]
#[command(name = "icesat2-boreal-stac")]
#[command(about = "Generate STAC metadata for ICESat-2 boreal biomass and height products")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the collection for one variable
    CreateCollection {
        /// agb or ht
        variable: Variable,

        /// Local path or s3:// locator for the collection JSON
        destination: String,
    },
    /// Build an item from an explicit raster and training table
    CreateItem {
        /// Raster (COG) path or locator
        cog: String,

        /// Training table path or locator (`_train_data.csv` or `_train.parquet`)
        table: String,

        /// Local path or s3:// locator for the item JSON
        destination: String,

        /// Max edge length of the raster sample used for band statistics
        #[arg(long)]
        max_size: Option<usize>,
    },
    /// Resolve an item's assets from storage, optionally stage them, and write the item
    ResolveItem {
        /// s3:// locator of the item's COG
        cog_key: String,

        /// Local path or s3:// locator for the item JSON [default: <ICESAT_ITEM_OUTPUT_DIR>/<item-id>.json]
        destination: Option<String>,

        /// Copy the resolved assets under this s3:// prefix first
        #[arg(long)]
        copy_to: Option<String>,

        /// Build against this variable's collection instead of the one in the filename
        #[arg(long)]
        variable: Option<Variable>,

        /// Max edge length of the raster sample used for band statistics
        #[arg(long)]
        max_size: Option<usize>,
    },
    /// Validate a written collection or item
    Validate {
        /// Record JSON file
        record: PathBuf,
    },
}

// =============================================================================
// Main
// =============================================================================

fn to_json<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec_pretty(record)?;
    body.push(b'\n');
    Ok(body)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    run(Cli::parse(), &settings)
}

fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let open_store = || S3Store::from_env(settings.s3_endpoint_url.as_deref(), settings.s3_force_path_style);

    match cli.command {
        Commands::CreateCollection { variable, destination } => {
            let collection = create_collection(variable)
                .with_context(|| format!("Failed to create the {variable} collection"))?;
            let destination = Destination::parse(&destination)?;
            destination
                .write(to_json(&collection)?, open_store)
                .with_context(|| format!("Failed to write collection to {destination}"))?;
            info!("Collection {} (STAC {})", collection.id, STAC_VERSION);
        }

        Commands::CreateItem {
            cog,
            table,
            destination,
            max_size,
        } => {
            let item = ItemSynthesizer::new(GdalIntrospector)
                .with_max_size(max_size.unwrap_or(settings.raster_max_size))
                .create_item(&cog, &table)
                .with_context(|| format!("Failed to create item for {cog}"))?;
            let destination = Destination::parse(&destination)?;
            destination
                .write(to_json(&item)?, open_store)
                .with_context(|| format!("Failed to write item to {destination}"))?;
        }

        Commands::ResolveItem {
            cog_key,
            destination,
            copy_to,
            variable,
            max_size,
        } => {
            let store = open_store().context("Failed to configure S3 client")?;
            let resolver = AssetResolver::new(&store);
            let asset_keys = resolver
                .resolve(&cog_key, copy_to.as_deref())
                .with_context(|| format!("Failed to resolve assets for {cog_key}"))?;
            for (role, key) in &asset_keys {
                info!("  {role}: {key}");
            }

            let item = ItemSynthesizer::new(GdalIntrospector)
                .with_max_size(max_size.unwrap_or(settings.raster_max_size))
                .build(&asset_keys, variable)
                .with_context(|| format!("Failed to create item for {cog_key}"))?;

            let destination = match destination {
                Some(d) => Destination::parse(&d)?,
                None => Destination::Local(settings.item_output_path(&item.id)),
            };
            destination
                .write(to_json(&item)?, || Ok::<_, StorageError>(&store))
                .with_context(|| format!("Failed to write item to {destination}"))?;
        }

        Commands::Validate { record } => {
            let json = fs::read_to_string(&record)
                .with_context(|| format!("Failed to read {}", record.display()))?;
            let parsed = Record::from_json(&json)
                .with_context(|| format!("Failed to parse {}", record.display()))?;

            match parsed.validate() {
                Ok(()) => println!("{} is valid STAC {}", parsed.id(), STAC_VERSION),
                Err(StacError::SchemaValidation(problems)) => {
                    for problem in &problems {
                        println!("  - {problem}");
                    }
                    bail!("{} has {} validation problems", parsed.id(), problems.len());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use icesat2_boreal_stac::Validate;

    fn run_args(args: &[&str]) -> Result<()> {
        let cli = Cli::try_parse_from(std::iter::once("icesat2-boreal-stac").chain(args.iter().copied()))?;
        run(cli, &Settings::default())
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_collection_writes_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        for variable in ["agb", "ht"] {
            let path = dir.path().join(variable).join("collection.json");
            run_args(&["create-collection", variable, path.to_str().unwrap()]).unwrap();

            let json = fs::read_to_string(&path).unwrap();
            let record = Record::from_json(&json).unwrap();
            assert_eq!(record.id(), format!("icesat2-boreal-v3.0-{variable}"));
            record.validate().unwrap();

            match record {
                Record::Collection(collection) => {
                    assert!(collection.problems().is_empty());
                    assert_eq!(*collection, create_collection(variable.parse().unwrap()).unwrap());
                }
                Record::Item(_) => panic!("expected a collection"),
            }

            run_args(&["validate", path.to_str().unwrap()]).unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_broken_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.json");
        run_args(&["create-collection", "agb", path.to_str().unwrap()]).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["license"] = serde_json::json!("");
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert!(run_args(&["validate", path.to_str().unwrap()]).is_err());
    }

    #[test]
    fn test_rejects_unknown_variable() {
        assert!(Cli::try_parse_from(["icesat2-boreal-stac", "create-collection", "foo", "out.json"]).is_err());
    }
}
