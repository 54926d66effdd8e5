//! Caravan fleet binary.
//!
//! Composition root: load configuration from the environment, initialize
//! session logging, assemble the fleet, and run until ctrl-c.

mod advisor;
mod builder;
mod config;
mod logging;
mod strategy;
mod world;

use anyhow::Result;

use crate::builder::build_fleet;
use crate::config::FleetConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = FleetConfig::from_env()?;
    logging::setup_logging(&config.log_dir, &config.session_id)?;

    tracing::info!(
        api_url = %config.api_url,
        characters = ?config.characters,
        pipeline = config.pipeline_enabled,
        "starting caravan fleet"
    );

    let fleet = build_fleet(&config)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("ctrl-c received, stopping fleet");
    let _ = fleet.shutdown.send(true);

    for handle in fleet.handles {
        let _ = handle.await;
    }
    tracing::info!("fleet stopped");
    Ok(())
}
