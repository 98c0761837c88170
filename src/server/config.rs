use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Optional server configuration file. Every key may be omitted; CLI flags
/// take precedence over file values.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub listen: Option<String>,
    pub service_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}
