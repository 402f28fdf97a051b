/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load Syn-Net configuration from TOML with full defaults:
    store location, record limits, probe behaviour, logging.

  Security / Safety Notes:
    Reads a single user-owned file. Missing files fall back to
    defaults; malformed files are rejected.

  Dependencies:
    serde + toml for parsing, dirs for XDG locations.

  Operational Scope:
    Consumed by the operator binary and by embedders that want
    file-driven limits.

  Revision History:
    2026-10-19 COD  Authored configuration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Every field optional, every default documented
    - Limits clamped at use, not at parse
============================================================*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SynnetError};
use crate::facade::ProbeSettings;
use crate::store::{
    RecordLimits, DEFAULT_MAX_DETAILS_CHARS, DEFAULT_MAX_PAYLOAD_CHARS,
    DEFAULT_MAX_SAMPLES_PER_ENTRY, DEFAULT_MAX_UNIQUE_ENTRIES, DEFAULT_STORE_KEY,
};

const APP_DIR: &str = "syn-net";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynnetConfig {
    pub store: StoreConfig,
    pub limits: LimitsConfig,
    pub probe: ProbeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            key: DEFAULT_STORE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_unique_entries: usize,
    pub max_samples_per_entry: usize,
    pub max_details_chars: usize,
    pub max_payload_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_unique_entries: DEFAULT_MAX_UNIQUE_ENTRIES,
            max_samples_per_entry: DEFAULT_MAX_SAMPLES_PER_ENTRY,
            max_details_chars: DEFAULT_MAX_DETAILS_CHARS,
            max_payload_chars: DEFAULT_MAX_PAYLOAD_CHARS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    /// Ceiling for the host-resolution probe, in milliseconds.
    pub timeout_ms: u64,
    pub port: u16,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3000,
            port: 443,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
}

impl SynnetConfig {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None => default_config_path(),
        };
        let Some(config_path) = resolved else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            if path.is_some() {
                return Err(SynnetError::Config(format!(
                    "Configuration file {} does not exist",
                    config_path.display()
                )));
            }
            return Ok(Self::default());
        }

        let body = fs::read_to_string(&config_path).map_err(|err| {
            SynnetError::Config(format!(
                "Failed to read {}: {err}",
                config_path.display()
            ))
        })?;
        Self::from_toml(&body).map_err(|err| match err {
            SynnetError::Config(msg) => {
                SynnetError::Config(format!("{}: {msg}", config_path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml(body: &str) -> Result<Self> {
        toml::from_str(body).map_err(|err| SynnetError::Config(err.to_string()))
    }

    /// Directory holding the file-backed key-value store.
    pub fn store_dir(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(fallback_base)
                .join(APP_DIR)
                .join("store")
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging.dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(fallback_base)
                .join(APP_DIR)
                .join("logs")
        })
    }

    pub fn record_limits(&self) -> RecordLimits {
        RecordLimits {
            max_unique_entries: self.limits.max_unique_entries,
            max_samples_per_entry: self.limits.max_samples_per_entry,
            max_details_chars: self.limits.max_details_chars,
            max_payload_chars: self.limits.max_payload_chars,
        }
        .clamped()
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            enabled: self.probe.enabled,
            timeout: Duration::from_millis(self.probe.timeout_ms.max(1)),
            port: self.probe.port,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn fallback_base() -> PathBuf {
    std::env::temp_dir()
}
