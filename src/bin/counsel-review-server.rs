// ABOUTME: Server binary for the counsel review HTTP API
// ABOUTME: Loads configuration, opens the database, and serves routes until interrupted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Counsel Review Server Binary
//!
//! Starts the HTTP API with session authentication, SQLite storage, and the
//! Analysis Service client.

use anyhow::{Context, Result};
use clap::Parser;
use counsel_review::{
    config::ServerConfig, database::Database, logging, resources::ServerResources, routes,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "counsel-review-server")]
#[command(about = "Counsel Review - counseling transcript analysis API")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(database_url) = args.database_url {
        config.database.url = database_url;
    }

    logging::init_from_env()?;
    info!("{}", config.summary());

    let database = Database::new(&config.database.url).await?;
    info!("Database initialized: {}", config.database.url);

    if !config.email.is_enabled() {
        warn!("SMTP_HOST not set; completion emails will be logged and skipped");
    }
    if config.analysis.default_api_key.is_none() {
        warn!("No default Analysis Service key; users must store a personal key");
    }

    let config = Arc::new(config);
    let resources = Arc::new(
        ServerResources::from_config(database, Arc::clone(&config))
            .context("Failed to initialize server resources")?,
    );
    let app = routes::router(resources);

    let addr = format!("{}:{}", config.host, config.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Counsel review server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Counsel review server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
