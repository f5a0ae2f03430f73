use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// The assistant service the original deployment talks to.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8001";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub endpoint: Option<String>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the optional config file; a missing file means defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| anyhow!("could not determine config directory"))?;
        Ok(dir.join("loanchat").join("config.json"))
    }
}
