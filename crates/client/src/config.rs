//! Fleet configuration from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Everything the binary needs to assemble a fleet.
///
/// Environment variables:
/// - `CARAVAN_TOKEN` - API bearer token (required)
/// - `CARAVAN_API_URL` - game API base URL (default: `http://localhost:8080`)
/// - `CARAVAN_CHARACTERS` - comma-separated character names (required)
/// - `CARAVAN_PIPELINE` - enable pipeline coordination (default: true)
/// - `CARAVAN_DATA_DIR` - directory with world content dumps (default: `data`)
/// - `CARAVAN_LOG_DIR` - log file directory (default: `logs`)
/// - `CARAVAN_SESSION_ID` - log session name (default: unix timestamp)
#[derive(Clone, Debug)]
pub struct FleetConfig {
    pub token: String,
    pub api_url: String,
    pub characters: Vec<String>,
    pub pipeline_enabled: bool,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub session_id: Option<String>,
}

impl FleetConfig {
    pub fn from_env() -> Result<Self> {
        let token = env::var("CARAVAN_TOKEN").context("CARAVAN_TOKEN is not set")?;
        let characters: Vec<String> = env::var("CARAVAN_CHARACTERS")
            .context("CARAVAN_CHARACTERS is not set")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if characters.is_empty() {
            bail!("CARAVAN_CHARACTERS names no characters");
        }

        Ok(Self {
            token,
            api_url: env::var("CARAVAN_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            characters,
            pipeline_enabled: read_env("CARAVAN_PIPELINE").unwrap_or(true),
            data_dir: read_env("CARAVAN_DATA_DIR").unwrap_or_else(|| PathBuf::from("data")),
            log_dir: read_env("CARAVAN_LOG_DIR").unwrap_or_else(|| PathBuf::from("logs")),
            session_id: env::var("CARAVAN_SESSION_ID").ok(),
        })
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
