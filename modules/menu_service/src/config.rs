//! Configuration for menu service module

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const PLACEHOLDER_URL: &str = "your_supabase_url_here";
const PLACEHOLDER_ANON_KEY: &str = "your_supabase_anon_key_here";

/// Menu service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Hosted backend URL (must be https)
    #[serde(default)]
    pub supabase_url: Option<String>,

    /// Anonymous access key for the hosted backend
    #[serde(default)]
    pub supabase_anon_key: Option<String>,

    /// Direct database connection; tables are then served through SeaORM
    /// instead of the REST endpoint
    #[serde(default)]
    pub database_url: Option<String>,

    /// File the signed-in session is kept in between runs; unset keeps it
    /// in memory only
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// Bounded wait for the startup session restore
    #[serde(default = "default_session_restore_timeout", with = "humantime_serde")]
    pub session_restore_timeout: Duration,

    /// Per-request timeout for the hosted backend client
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Rows kept in the recent activity feed
    #[serde(default = "default_recent_updates_limit")]
    pub recent_updates_limit: usize,

    /// Realtime channel buffer per subscriber
    #[serde(default = "default_realtime_capacity")]
    pub realtime_capacity: usize,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            database_url: None,
            session_file: None,
            session_restore_timeout: default_session_restore_timeout(),
            request_timeout: default_request_timeout(),
            recent_updates_limit: default_recent_updates_limit(),
            realtime_capacity: default_realtime_capacity(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_session_restore_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_recent_updates_limit() -> usize {
    10
}

fn default_realtime_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Validated connection parameters for the hosted backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Url,
    pub anon_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} still holds the placeholder value")]
    Placeholder(&'static str),

    #[error("invalid backend URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("backend URL must use https, got '{0}'")]
    InsecureScheme(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl Config {
    /// Load from an optional YAML file, then `MENU_*` variables, then the
    /// conventional `SUPABASE_URL` / `SUPABASE_ANON_KEY`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment
            .merge(Env::prefixed("MENU_"))
            .merge(Env::raw().only(&["supabase_url", "supabase_anon_key"]));

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Check the connection parameters before any backend call
    pub fn backend(&self) -> Result<BackendConfig, ConfigError> {
        let raw_url = required(self.supabase_url.as_deref(), "supabase_url", PLACEHOLDER_URL)?;
        let anon_key = required(
            self.supabase_anon_key.as_deref(),
            "supabase_anon_key",
            PLACEHOLDER_ANON_KEY,
        )?;

        let url = Url::parse(raw_url).map_err(|e| ConfigError::InvalidUrl {
            value: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "https" {
            return Err(ConfigError::InsecureScheme(raw_url.to_string()));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                value: raw_url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(BackendConfig {
            url,
            anon_key: anon_key.to_string(),
        })
    }
}

fn required<'a>(
    value: Option<&'a str>,
    name: &'static str,
    placeholder: &str,
) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Err(ConfigError::Missing(name)),
        Some(v) if v == placeholder => Err(ConfigError::Placeholder(name)),
        Some(v) => Ok(v),
    }
}
