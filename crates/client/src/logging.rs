//! Session logging: stderr for the operator, a non-blocking file for tails.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize logging into `log_dir/<session>/caravan.log` plus stderr.
pub fn setup_logging(log_dir: &Path, session_id: &Option<String>) -> Result<()> {
    let session = session_id.clone().unwrap_or_else(|| {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("session_{timestamp}")
    });
    let session_dir = log_dir.join(&session);
    std::fs::create_dir_all(&session_dir)?;

    let file_appender = tracing_appender::rolling::never(&session_dir, "caravan.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    // Keep the file writer alive for the process lifetime.
    std::mem::forget(guard);

    tracing::info!(session, "logging initialized");
    Ok(())
}
