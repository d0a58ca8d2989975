//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing_subscriber::filter::Directive;

/// Logging output format
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Logging {
    /// Additional filtering directives
    #[serde(default, deserialize_with = "Logging::deserialize_filters")]
    pub filters: Vec<Directive>,

    /// Logging format
    #[serde(default)]
    pub format: LogFormat,
}

impl Logging {
    fn deserialize_filters<'de, D>(deserializer: D) -> Result<Vec<Directive>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let dirs: Vec<String> = Deserialize::deserialize(deserializer)?;
        dirs.into_iter()
            .map(|dir| dir.parse().map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Job portal backend access
#[derive(Debug, Clone, Deserialize)]
pub struct Backend {
    /// Base URL all REST endpoints are relative to
    #[serde(default = "Backend::default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "Backend::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Backend {
    fn default_base_url() -> String {
        "http://localhost:8080".to_owned()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// Persisted session storage
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// Storage file path
    #[serde(default = "Storage::default_path")]
    pub path: PathBuf,
}

impl Storage {
    fn default_path() -> PathBuf {
        "portal-storage.json".into()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// Top level client configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Backend configuration
    #[serde(default)]
    pub backend: Backend,

    /// Storage configuration
    #[serde(default)]
    pub storage: Storage,

    /// Logging configuration
    #[serde(default)]
    pub logging: Logging,
}
