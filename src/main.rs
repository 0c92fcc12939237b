//! ingestcheck - Streaming Service Health Check
//!
//! Probes the ingest servers of a streaming-service catalog, remembers when
//! each server started failing, and prunes servers (and services) that have
//! been down for too long.

mod catalog;
mod checker;
mod config;
mod probe;

use config::CheckerConfig;

use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("ingestcheck=info".parse()?))
        .init();

    // Load configuration
    let cfg = CheckerConfig::load();
    tracing::info!("Checking services in {}", cfg.services_path);
    tracing::info!("Using failure cache at {}", cfg.cache_path);

    match checker::run(&cfg).await {
        Ok(true) => {
            tracing::info!("Catalog updated");
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => {
            tracing::info!("No servers or services removed");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("❌ {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
