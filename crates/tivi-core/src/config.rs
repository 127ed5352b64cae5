use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub zap: ZapConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Timeouts for the stream probe. The total probe budget is bounded by the
/// request timeout on each of the (at most two) attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Numeric-zap debounce: how long after the last digit before the buffer
/// commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZapConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where prefs and logs live. Defaults to the platform data dir.
    #[serde(default = "platform::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: platform::data_dir(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_debounce_ms() -> u64 {
    2500
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolver.connect_timeout_secs, 15);
        assert_eq!(config.resolver.request_timeout_secs, 15);
        assert_eq!(config.zap.debounce_ms, 2500);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[zap]\ndebounce_ms = 3000\n").unwrap();
        assert_eq!(config.zap.debounce_ms, 3000);
        assert_eq!(config.resolver.connect_timeout_secs, 15);
    }
}
