//! Table configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS, ENV_MAX_ENTRIES, ENV_TTL_SECS};
use crate::error::{Result, RouteError};

/// Table configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// TTL applied by `insert`, in seconds
    pub default_ttl_seconds: u64,
    /// Maximum number of live entries
    pub max_entries: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: DEFAULT_TTL_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl TableConfig {
    /// Loads the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is honoured. Unset variables
    /// fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TTL_SECS) {
            config.default_ttl_seconds = raw.trim().parse().map_err(|_| {
                RouteError::ConfigError(format!("{ENV_TTL_SECS} must be an integer, got '{raw}'"))
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_ENTRIES) {
            config.max_entries = raw.trim().parse().map_err(|_| {
                RouteError::ConfigError(format!("{ENV_MAX_ENTRIES} must be an integer, got '{raw}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Overrides the default TTL.
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.default_ttl_seconds = seconds;
        self
    }

    /// Overrides the capacity.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_seconds == 0 {
            return Err(RouteError::ConfigError("default TTL must be at least 1 second".into()));
        }
        if self.max_entries == 0 {
            return Err(RouteError::ConfigError("max_entries must be at least 1".into()));
        }
        if self.max_entries > u32::MAX as usize {
            return Err(RouteError::ConfigError(format!(
                "max_entries must not exceed {}",
                u32::MAX
            )));
        }
        Ok(())
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}
