//! Runtime configuration loaded from the environment.
//!
//! A `.env` file in the working directory supplies fallback values when
//! present; it is read without modifying the process environment, and
//! variables set in the environment take precedence over it.
//!
//! # Environment Variables
//! - `PARKING_PROVIDER`: `mock` or `remote` (default: `mock`)
//! - `MOCK_DATA_PATH`: dataset file for the mock provider
//!   (default: `data/corfu_parking_sample.json`)
//! - `REMOTE_BASE_URL`: upstream API base URL (required for `remote`)
//! - `REMOTE_API_KEY`: bearer token for the upstream API (optional)
//! - `REMOTE_TIMEOUT_SECONDS`: upstream request timeout (default: 10)
//! - `REFRESH_INTERVAL_SECONDS`: seconds between refreshes (default: 30)
//! - `BIND_ADDR`: HTTP listen address (default: `0.0.0.0:8000`)

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, warn};

use crate::providers::DEFAULT_TIMEOUT_SECS;

/// Default dataset for the mock provider, relative to the working directory.
pub const DEFAULT_MOCK_DATA_PATH: &str = "data/corfu_parking_sample.json";

/// Default time between refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Longest accepted time between refresh cycles (one day).
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Environment file read by [`Settings::from_env`], relative to the working directory.
pub const ENV_FILE: &str = ".env";

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8000);

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported provider '{0}' (expected 'mock' or 'remote')")]
    UnsupportedProvider(String),

    #[error("REMOTE_BASE_URL must be configured for the remote provider")]
    MissingRemoteUrl,

    #[error("invalid {key}={value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which data source to use, with its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    /// Static JSON dataset on disk.
    Mock { data_path: PathBuf },

    /// Upstream HTTP API.
    Remote {
        base_url: String,
        api_key: Option<String>,
        timeout_secs: u64,
    },
}

/// Service settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Selected data source.
    pub provider: ProviderSettings,

    /// Time between refresh cycles.
    pub refresh_interval: Duration,

    /// HTTP listen address.
    pub bind_addr: SocketAddr,
}

impl Settings {
    /// Load settings from the process environment, falling back to `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file_vars = read_env_file(Path::new(ENV_FILE));
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Load settings through `lookup`, which maps a variable name to its value.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_name = var("PARKING_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .unwrap_or_else(|| "mock".to_string());

        let provider = match provider_name.as_str() {
            "mock" => ProviderSettings::Mock {
                data_path: var("MOCK_DATA_PATH")
                    .unwrap_or_else(|| DEFAULT_MOCK_DATA_PATH.to_string())
                    .into(),
            },
            "remote" => ProviderSettings::Remote {
                base_url: var("REMOTE_BASE_URL").ok_or(ConfigError::MissingRemoteUrl)?,
                api_key: var("REMOTE_API_KEY"),
                timeout_secs: parse_var(
                    "REMOTE_TIMEOUT_SECONDS",
                    var("REMOTE_TIMEOUT_SECONDS"),
                    DEFAULT_TIMEOUT_SECS,
                )?,
            },
            _ => return Err(ConfigError::UnsupportedProvider(provider_name)),
        };

        let interval_secs: u64 = parse_var(
            "REFRESH_INTERVAL_SECONDS",
            var("REFRESH_INTERVAL_SECONDS"),
            DEFAULT_REFRESH_INTERVAL_SECS,
        )?;
        if interval_secs == 0 || interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "REFRESH_INTERVAL_SECONDS",
                value: interval_secs.to_string(),
                reason: format!("must be between 1 and {MAX_REFRESH_INTERVAL_SECS}"),
            });
        }

        let bind_addr = parse_var("BIND_ADDR", var("BIND_ADDR"), DEFAULT_BIND_ADDR)?;

        Ok(Self {
            provider,
            refresh_interval: Duration::from_secs(interval_secs),
            bind_addr,
        })
    }
}

fn parse_var<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Read `KEY=value` pairs from an environment file without touching the
/// process environment. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> HashMap<String, String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return HashMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open environment file");
            return HashMap::new();
        }
    };

    let vars: HashMap<String, String> = entries
        .filter_map(|entry| {
            entry
                .inspect_err(|e| warn!(path = %path.display(), error = %e, "skipping bad line"))
                .ok()
        })
        .collect();
    debug!(path = %path.display(), count = vars.len(), "loaded environment file");
    vars
}
