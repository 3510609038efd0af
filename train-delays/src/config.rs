//! Environment configuration.
//!
//! Credentials and fetch defaults come from environment variables, after
//! `main` has loaded a `.env` file if one exists. Empty values count as
//! unset.

use crate::timetables::TimetablesConfig;

pub const CLIENT_ID_VAR: &str = "DB_CLIENT_ID";
pub const API_KEY_VAR: &str = "DB_API_KEY";
pub const STATION_VAR: &str = "DEFAULT_STATION";
pub const DATE_VAR: &str = "DEFAULT_DATE";
pub const HOUR_VAR: &str = "DEFAULT_HOUR";

/// Errors from reading the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} must be an hour between 0 and 23, got {value:?}")]
    InvalidHour { var: &'static str, value: String },
}

/// API credentials for the DB API Marketplace.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub api_key: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
        }
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Read credentials through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client_id = non_empty(&lookup, CLIENT_ID_VAR).ok_or(ConfigError::Missing(CLIENT_ID_VAR))?;
        let api_key = non_empty(&lookup, API_KEY_VAR).ok_or(ConfigError::Missing(API_KEY_VAR))?;
        Ok(Self { client_id, api_key })
    }

    /// Client configuration using these credentials.
    pub fn timetables_config(&self) -> TimetablesConfig {
        TimetablesConfig::new(&self.client_id, &self.api_key)
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("api_key", &"***")
            .finish()
    }
}

/// Defaults for the `fetch` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchDefaults {
    pub station: Option<String>,
    /// Date in any form accepted by [`crate::domain::to_yymmdd`].
    pub date: Option<String>,
    pub hour: Option<u32>,
}

impl FetchDefaults {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let hour = match non_empty(&lookup, HOUR_VAR) {
            Some(value) => Some(parse_hour(HOUR_VAR, &value)?),
            None => None,
        };
        Ok(Self {
            station: non_empty(&lookup, STATION_VAR),
            date: non_empty(&lookup, DATE_VAR),
            hour,
        })
    }
}

/// Parse an hour of day, 0-23.
pub fn parse_hour(var: &'static str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|h| *h < 24)
        .ok_or_else(|| ConfigError::InvalidHour {
            var,
            value: value.to_string(),
        })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
