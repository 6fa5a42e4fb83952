//! Standalone bridge: logs discovered state instead of feeding a host

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use z2m_bridge::logging::{init_logging, init_logging_from_env, LoggingMode};
use z2m_bridge::{Bridge, BridgeConfig, HostHandles, LogEventSink, StartOutcome};

/// Bridge zigbee2mqtt discovery into a log of entity state
#[derive(Debug, Parser)]
#[command(name = "z2m-bridge", version)]
struct Args {
    /// Broker URL, overrides ZIGBEE2MQTT_MQTT_URL
    #[arg(long)]
    mqtt_url: Option<String>,

    /// Discovery subscription filter, overrides ZIGBEE2MQTT_DISCOVERY_TOPIC
    #[arg(long)]
    discovery_topic: Option<String>,

    /// silent, development or debug; defaults to Z2M_LOG_MODE
    #[arg(long, value_parser = parse_log_mode)]
    log_mode: Option<LoggingMode>,

    /// Restore discovered entities from this file and save them on exit
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// JSON object of host raw config; its values win over the environment
    #[arg(long)]
    raw_config: Option<PathBuf>,
}

fn parse_log_mode(raw: &str) -> std::result::Result<LoggingMode, String> {
    LoggingMode::parse(raw).ok_or_else(|| format!("unknown log mode '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.log_mode {
        Some(mode) => init_logging(mode),
        None => init_logging_from_env(LoggingMode::Development),
    }
    .context("Failed to initialize logging")?;

    let raw = match &args.raw_config {
        Some(path) => Some(read_raw_config(path).await?),
        None => None,
    };

    let mut config = BridgeConfig::from_env_with_raw(raw.as_ref());
    if let Some(url) = args.mqtt_url {
        config.mqtt_url = Some(url);
    }
    if let Some(topic) = args.discovery_topic {
        config.discovery_topic = topic;
    }

    let stored = match &args.state_file {
        Some(path) => read_state(path).await?,
        None => None,
    };

    let host = HostHandles::new().with_events(Arc::new(LogEventSink));
    let bridge = Bridge::new(config, host, stored.as_deref());

    match bridge.start_or_disable().await {
        StartOutcome::Ready(_) => {
            tracing::info!(
                "Bridge ready with {} discovered entities; press Ctrl-C to stop",
                bridge.store().len()
            );
        }
        StartOutcome::Disabled => {
            tracing::warn!(
                "Discovery disabled; check ZIGBEE2MQTT_MQTT_URL or --mqtt-url and the broker"
            );
            return Ok(());
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
    }

    bridge.shutdown().await;

    if let Some(path) = &args.state_file {
        let blob = bridge.storage_blob()?;
        tokio::fs::write(path, blob)
            .await
            .with_context(|| format!("Failed to save state to {}", path.display()))?;
        tracing::info!("Saved {} entities to {}", bridge.store().len(), path.display());
    }

    Ok(())
}

async fn read_state(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(blob) => Ok(Some(blob)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read state from {}", path.display())),
    }
}

async fn read_raw_config(path: &Path) -> Result<Value> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read raw config from {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("Raw config {} is not valid JSON", path.display()))
}
