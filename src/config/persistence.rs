//! Config file load and save.

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::types::TestConfig;

/// Resolve the config path: explicit `--config` wins, otherwise config.json
/// beside the executable.
fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(PathBuf::from(p));
    }
    let exe_dir = std::env::current_exe()?
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Cannot determine executable directory"))?
        .to_path_buf();
    Ok(exe_dir.join("config.json"))
}

pub async fn load_config(path: Option<&str>) -> Result<TestConfig> {
    let config_path = resolve_path(path)?;

    if config_path.exists() {
        let content = tokio::fs::read_to_string(&config_path).await?;
        let config: TestConfig = serde_json::from_str(&content)?;

        if config.bmc.address.contains("[BMC_IP]") || config.bmc.address.is_empty() {
            warn!("BMC address is not configured in {:?}. Every operation will fail.", config_path);
            warn!("Edit the config file and set bmc.address to the BMC hostname or IP.");
        }

        info!("Loaded configuration from: {:?}", config_path);
        Ok(config)
    } else {
        info!("Config file {:?} not found, using defaults", config_path);
        Ok(TestConfig::default())
    }
}

pub async fn save_config(config: &TestConfig, path: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    info!("Configuration saved to: {}", path);
    Ok(())
}
