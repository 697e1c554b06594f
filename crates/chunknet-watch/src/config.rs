//! Watcher configuration file.
//!
//! ```toml
//! [oracle]
//! contract_address = "0x0000000000000000000000000000000000000001"
//!
//! [logging]
//! log_level = "debug"
//!
//! [[seed]]
//! name = "eth-usd"
//! currency = "USD"
//! tags = ["price"]
//! value = "2000"
//! update_ts = 1234
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use chunknet_oracle::config::ClientConfig;
use chunknet_types::U256;
use serde::{Deserialize, Serialize};

/// Address the simulator is deployed at when none is configured.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000001";

/// Complete watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Oracle client settings.
    #[serde(default = "default_oracle")]
    pub oracle: ClientConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Metrics registered on the simulator at startup.
    #[serde(default = "default_seeds", rename = "seed")]
    pub seeds: Vec<SeedMetric>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One metric to register, with an optional first quote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedMetric {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Quote value, decimal or `0x` hex. Kept as text since TOML integers
    /// stop at 64 bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub update_ts: u32,
}

impl SeedMetric {
    /// Parsed quote value, if one is configured.
    pub fn quote_value(&self) -> anyhow::Result<Option<U256>> {
        self.value
            .as_deref()
            .map(|raw| {
                U256::from_str(raw.trim())
                    .with_context(|| format!("invalid quote value {raw:?} for {}", self.name))
            })
            .transpose()
    }
}

fn default_oracle() -> ClientConfig {
    ClientConfig {
        contract_address: Some(DEFAULT_CONTRACT_ADDRESS.to_string()),
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_seeds() -> Vec<SeedMetric> {
    vec![
        SeedMetric {
            name: "eth-usd".to_string(),
            description: "ETH price".to_string(),
            currency: "USD".to_string(),
            tags: vec!["price".to_string()],
            value: Some("2000".to_string()),
            update_ts: 1234,
        },
        SeedMetric {
            name: "btc-usd".to_string(),
            description: "BTC price".to_string(),
            currency: "USD".to_string(),
            tags: vec!["price".to_string()],
            value: Some("30000".to_string()),
            update_ts: 1235,
        },
    ]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            oracle: default_oracle(),
            logging: LoggingConfig::default(),
            seeds: default_seeds(),
        }
    }
}

impl WatchConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Configured contract address, or the default deployment address.
    pub fn contract_address(&self) -> &str {
        self.oracle
            .contract_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .unwrap_or(DEFAULT_CONTRACT_ADDRESS)
    }

    fn config_path() -> PathBuf {
        // Check env var override first
        if let Ok(path) = std::env::var("CHUNKNET_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from("chunknet.toml")
    }
}
