//! Named retry settings
//!
//! [`RetrySettings`] carries every policy option as plain data under its
//! long-standing option name, so a policy can be described outside code and
//! applied with [`RetryConfigBuilder::with_settings`]. Durations are whole
//! milliseconds.
//!
//! ## Environment Variables
//! - `PULSEARC_RETRY_STOP`: legacy stop mode name
//! - `PULSEARC_RETRY_WAIT`: legacy wait mode name
//! - `PULSEARC_RETRY_STOP_MAX_ATTEMPT_NUMBER`
//! - `PULSEARC_RETRY_STOP_MAX_DELAY`
//! - `PULSEARC_RETRY_WAIT_FIXED`
//! - `PULSEARC_RETRY_WAIT_RANDOM_MIN` / `PULSEARC_RETRY_WAIT_RANDOM_MAX`
//! - `PULSEARC_RETRY_WAIT_INCREMENTING_START` /
//!   `PULSEARC_RETRY_WAIT_INCREMENTING_INCREMENT` /
//!   `PULSEARC_RETRY_WAIT_INCREMENTING_MAX`
//! - `PULSEARC_RETRY_WAIT_EXPONENTIAL_MULTIPLIER` /
//!   `PULSEARC_RETRY_WAIT_EXPONENTIAL_MAX`
//! - `PULSEARC_RETRY_WAIT_JITTER_MAX`
//! - `PULSEARC_RETRY_WRAP_ERROR` (true/false)
//! - `PULSEARC_RETRY_LOGGER` (true/false)
//!
//! ## Files
//! With the `serde` feature, settings load from `.toml` or `.json` files
//! (format detected by extension).
//!
//! [`RetryConfigBuilder::with_settings`]: crate::config::RetryConfigBuilder::with_settings

use std::str::FromStr;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "PULSEARC_RETRY_";

/// Retry policy options by name. `None` leaves the option unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct RetrySettings {
    /// Legacy stop mode name
    pub stop: Option<String>,
    /// Legacy wait mode name
    pub wait: Option<String>,
    /// Stop once this many attempts have run
    pub stop_max_attempt_number: Option<u32>,
    /// Stop once this many milliseconds have passed since the first attempt
    pub stop_max_delay: Option<u64>,
    /// Fixed wait in milliseconds
    pub wait_fixed: Option<u64>,
    /// Lower bound of the random wait in milliseconds
    pub wait_random_min: Option<u64>,
    /// Upper bound of the random wait in milliseconds
    pub wait_random_max: Option<u64>,
    /// First incrementing wait in milliseconds
    pub wait_incrementing_start: Option<u64>,
    /// Milliseconds added to the incrementing wait per attempt
    pub wait_incrementing_increment: Option<u64>,
    /// Cap on the incrementing wait in milliseconds
    pub wait_incrementing_max: Option<u64>,
    /// Exponential wait multiplier in milliseconds
    pub wait_exponential_multiplier: Option<u64>,
    /// Cap on the exponential wait in milliseconds
    pub wait_exponential_max: Option<u64>,
    /// Upper bound of the random jitter added to the composed wait, in milliseconds
    pub wait_jitter_max: Option<u64>,
    /// Capture a backtrace for every failed attempt
    pub wrap_error: Option<bool>,
    /// Enable (`true`) or disable (`false`) the default tracing logger
    pub logger: Option<bool>,
}

impl RetrySettings {
    /// Whether no option is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Load settings from `PULSEARC_RETRY_*` environment variables.
    ///
    /// Missing variables leave the option unset.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] if a variable cannot be parsed.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let settings = Self::from_lookup(|key| std::env::var(key).ok())?;
        tracing::debug!(empty = settings.is_empty(), "Retry settings loaded from environment");
        Ok(settings)
    }

    /// Build settings from an arbitrary `PULSEARC_RETRY_*` key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        Ok(Self {
            stop: get("STOP"),
            wait: get("WAIT"),
            stop_max_attempt_number: parse_var(&get, "STOP_MAX_ATTEMPT_NUMBER")?,
            stop_max_delay: parse_var(&get, "STOP_MAX_DELAY")?,
            wait_fixed: parse_var(&get, "WAIT_FIXED")?,
            wait_random_min: parse_var(&get, "WAIT_RANDOM_MIN")?,
            wait_random_max: parse_var(&get, "WAIT_RANDOM_MAX")?,
            wait_incrementing_start: parse_var(&get, "WAIT_INCREMENTING_START")?,
            wait_incrementing_increment: parse_var(&get, "WAIT_INCREMENTING_INCREMENT")?,
            wait_incrementing_max: parse_var(&get, "WAIT_INCREMENTING_MAX")?,
            wait_exponential_multiplier: parse_var(&get, "WAIT_EXPONENTIAL_MULTIPLIER")?,
            wait_exponential_max: parse_var(&get, "WAIT_EXPONENTIAL_MAX")?,
            wait_jitter_max: parse_var(&get, "WAIT_JITTER_MAX")?,
            wrap_error: parse_var(&get, "WRAP_ERROR")?,
            logger: parse_var(&get, "LOGGER")?,
        })
    }
}

fn parse_var<V, G>(get: &G, name: &str) -> Result<Option<V>, ConfigError>
where
    V: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.trim().parse::<V>().map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{name}"),
                value: raw.clone(),
            })
        })
        .transpose()
}

#[cfg(feature = "serde")]
mod file {
    use std::path::Path;

    use super::RetrySettings;
    use crate::error::ConfigError;

    impl RetrySettings {
        /// Load settings from a `.toml` or `.json` file
        ///
        /// # Errors
        /// Returns [`ConfigError`] if the file cannot be read, has an
        /// unsupported extension, or fails to parse.
        pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let path = path.as_ref();
            tracing::info!(path = %path.display(), "Loading retry settings from file");

            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;

            Self::parse(&contents, path)
        }

        /// Parse settings, detecting the format from `path`'s extension
        pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => Ok(toml::from_str(contents)?),
                Some("json") => Ok(serde_json::from_str(contents)?),
                _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
            }
        }
    }
}
