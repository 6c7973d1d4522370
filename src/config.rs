//! Router configuration, read once and never mutated afterwards.

use std::time::Duration;

use thiserror::Error;

use crate::osrm::{DEFAULT_PROFILE, OsrmHttpTransport, TransportError};

pub const SERVICE_URL_VAR: &str = "ROUTING_SERVICE_URL";
pub const PROFILE_VAR: &str = "ROUTING_PROFILE";
pub const TIMEOUT_VAR: &str = "ROUTING_TIMEOUT_MS";
pub const LANGUAGE_VAR: &str = "ROUTING_LANGUAGE";
pub const USE_HINTS_VAR: &str = "ROUTING_USE_HINTS";

pub const DEMO_SERVER_HOST: &str = "//router.project-osrm.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("facility layout is invalid: {0}")]
    Layout(#[from] serde_json::Error),

    #[error("could not build routing transport: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub service_url: String,
    pub profile: String,
    /// Client-side deadline for a whole computation.
    pub timeout: Duration,
    /// Network-layer timeout handed to the HTTP client.
    pub request_timeout: Duration,
    pub polyline_precision: u32,
    pub use_hints: bool,
    pub suppress_demo_server_warning: bool,
    pub language: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:5000".to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            polyline_precision: 5,
            use_hints: true,
            suppress_demo_server_warning: false,
            language: "en".to_string(),
        }
    }
}

impl RouterConfig {
    /// Read overrides from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(SERVICE_URL_VAR) {
            config.service_url = url;
        }
        if let Some(profile) = lookup(PROFILE_VAR) {
            config.profile = profile;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let millis = raw.trim().parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                key: TIMEOUT_VAR,
                value: raw.clone(),
                reason: err.to_string(),
            })?;
            config.timeout = Duration::from_millis(millis);
        }
        if let Some(language) = lookup(LANGUAGE_VAR) {
            config.language = language;
        }
        if let Some(raw) = lookup(USE_HINTS_VAR) {
            config.use_hints = parse_flag(USE_HINTS_VAR, &raw)?;
        }

        Ok(config)
    }

    pub fn is_demo_server(&self) -> bool {
        self.service_url.contains(DEMO_SERVER_HOST)
    }

    pub fn osrm_transport(&self) -> Result<OsrmHttpTransport, ConfigError> {
        Ok(OsrmHttpTransport::new(self.service_url.clone(), self.request_timeout)?)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
