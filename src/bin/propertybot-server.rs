// ABOUTME: HTTP server binary for the PropertyBot assistant
// ABOUTME: Loads environment configuration, applies CLI overrides and serves until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # PropertyBot Server Binary
//!
//! Serves the chat, streaming, ingestion and health endpoints.

use anyhow::Result;
use clap::Parser;
use propertybot_server::{config::ServerConfig, logging, resources::ServerResources, server};
use tracing::{error, info};

/// Command-line overrides for the server settings
#[derive(Parser)]
#[command(name = "propertybot-server")]
#[command(about = "PropertyBot - real-estate chat assistant API")]
pub struct Args {
    /// Override bind host
    #[arg(long)]
    host: Option<String>,

    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

/// Start the server and serve until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    info!("Starting PropertyBot server");
    info!("{}", config.summary());

    let resources = ServerResources::from_config(config)?;

    if let Err(e) = server::serve(resources).await {
        error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
