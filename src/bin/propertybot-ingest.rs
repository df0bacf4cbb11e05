// ABOUTME: One-shot ingestion binary: captions, embeds and upserts the current listings
// ABOUTME: Prints the run summary as JSON on stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # PropertyBot Ingestion Binary
//!
//! Runs one ingestion pass over the current listings and exits.

use anyhow::{Context, Result};
use clap::Parser;
use propertybot_server::{config::ServerConfig, logging, resources::ServerResources};
use tracing::info;

/// Command-line overrides for one ingestion run
#[derive(Parser)]
#[command(name = "propertybot-ingest")]
#[command(about = "Ingest current property listings into the vector store")]
pub struct Args {
    /// Override properties per upsert batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override images captioned per property
    #[arg(long)]
    max_images: Option<usize>,

    /// Print the summary without indentation
    #[arg(long)]
    compact: bool,
}

/// Run one ingestion pass and print its summary
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(batch_size) = args.batch_size {
        config.ingestion.batch_size = batch_size;
    }
    if let Some(max_images) = args.max_images {
        config.ingestion.max_images = max_images;
    }
    config.validate()?;

    info!("{}", config.summary());

    let resources = ServerResources::from_config(config)?;
    let summary = resources
        .ingestion
        .run()
        .await
        .context("Ingestion run failed")?;

    let rendered = if args.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };
    println!("{rendered}");

    Ok(())
}
