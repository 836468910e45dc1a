//! Configuration for the ledger runtime

use crate::types::Pubkey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Program id the donation ledger is deployed under by default
pub const DEFAULT_PROGRAM_ID: &str = "ESAXaQuTVApRKEVhgNPd3EnLgH7fNQhLRSu9pP5CJZ23";

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Address of the donation program
    pub program_id: Pubkey,

    /// Directory for account snapshots (none keeps state in memory only)
    pub data_dir: Option<PathBuf>,

    /// Persistence floor parameters
    pub rent: RentConfig,

    /// Runtime configuration
    pub runtime: RuntimeConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "donation-ledger".to_string(),
            program_id: default_program_id(),
            data_dir: None,
            rent: RentConfig::default(),
            runtime: RuntimeConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn default_program_id() -> Pubkey {
    // Constant is valid base58 of 32 bytes; fall back to a zero id only if edited badly
    Pubkey::from_str(DEFAULT_PROGRAM_ID).unwrap_or_default()
}

/// Rent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RentConfig {
    /// Lamports per byte-year
    pub lamports_per_byte_year: u64,

    /// Years of rent required for exemption
    pub exemption_threshold: f64,

    /// Per-account storage overhead (bytes)
    pub account_storage_overhead: u64,
}

impl Default for RentConfig {
    fn default() -> Self {
        Self {
            lamports_per_byte_year: 3_480,
            exemption_threshold: 2.0,
            account_storage_overhead: 128,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Committed events kept in memory for `events()` (0 = unbounded)
    pub event_history_limit: usize,

    /// Committed signatures remembered for replay rejection (0 = unbounded).
    /// A transaction older than this window can be replayed.
    pub signature_history_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_history_limit: 10_000,
            signature_history_limit: 100_000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable text
    pub json: bool,

    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            json: false,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Config::default().with_env_overrides()
    }

    /// Apply `DONATION_*` environment variables on top of this config
    pub fn with_env_overrides(mut self) -> crate::Result<Self> {
        if let Ok(program_id) = std::env::var("DONATION_PROGRAM_ID") {
            self.program_id = Pubkey::from_str(&program_id)
                .map_err(|e| crate::Error::Config(format!("DONATION_PROGRAM_ID: {}", e)))?;
        }

        if let Ok(data_dir) = std::env::var("DONATION_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(data_dir));
        }

        if let Ok(json) = std::env::var("DONATION_LOG_JSON") {
            self.log.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        if let Ok(filter) = std::env::var("DONATION_LOG_FILTER") {
            self.log.filter = filter;
        }

        Ok(self)
    }

    /// Snapshot file inside `data_dir`, if persistence is enabled
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("accounts.snapshot"))
    }
}
