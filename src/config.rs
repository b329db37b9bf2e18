use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings for the `cashledger` binary.
///
/// Loaded from an optional YAML file; command-line flags override
/// individual fields afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// RocksDB directory. When unset the ledger lives in memory.
    pub db_path: Option<PathBuf>,
    /// Default `tracing` filter, e.g. `info` or `cashledger=debug`.
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
    /// Run `initLedger` on start-up when the seed entities are missing.
    pub seed_on_open: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: "warn".to_string(),
            log_json: false,
            seed_on_open: false,
        }
    }
}

impl LedgerConfig {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }
}
