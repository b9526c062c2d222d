use anyhow::{anyhow, bail, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Endpoint used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "https://projectaichatappbackend.vercel.app/generate";

/// Environment variable that overrides the configured endpoint.
pub const ENDPOINT_ENV: &str = "AICHAT_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Pick the endpoint: explicit flag, then environment, then this file, then the default.
    pub fn resolve_endpoint(&self, flag: Option<&str>, env: Option<&str>) -> Result<String> {
        let url = flag
            .or(env)
            .or(self.endpoint_url.as_deref())
            .unwrap_or(DEFAULT_ENDPOINT);

        let parsed = Url::parse(url).map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Endpoint URL '{}' must use http or https", url);
        }

        Ok(url.to_string())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("aichat").join("config.json"))
    }
}
