//! Typed configuration for the telemetry subsystem.

use std::time::Duration;

use figment::{error::Kind, providers::Env, Figment};
use loft_error::GenericError;
use serde::Deserialize;
use snafu::{ensure, Snafu};

const fn default_collection_interval_secs() -> u64 {
    60
}

const fn default_channel_capacity() -> usize {
    2
}

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// A field's value had the wrong data type.
    #[snafu(display("Expected value for field '{field}' to be '{expected_ty}', got '{actual_ty}' instead."))]
    InvalidFieldType {
        /// Name of the invalid field.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Generic configuration error.
    #[snafu(display("Failed to load configuration."))]
    Generic {
        /// Error source.
        source: GenericError,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        match e.kind {
            Kind::InvalidType(actual_ty, expected_ty) => Self::InvalidFieldType {
                field: e.path.join("."),
                expected_ty,
                actual_ty: actual_ty.to_string(),
            },
            _ => Self::Generic { source: e.into() },
        }
    }
}

/// Telemetry subsystem configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct TelemetryConfiguration {
    /// How often the periodic reporter runs a collection cycle, in seconds.
    ///
    /// Defaults to 60 seconds.
    #[serde(default = "default_collection_interval_secs")]
    collection_interval_secs: u64,

    /// Depth of the reporter's broadcast queue, in collection cycles.
    ///
    /// A subscriber that falls further behind than this loses its backlog (and only
    /// its backlog). Defaults to 2.
    #[serde(default = "default_channel_capacity")]
    channel_capacity: usize,
}

impl TelemetryConfiguration {
    /// Loads configuration from environment variables with the given prefix.
    ///
    /// A prefix of `LOFT_TELEMETRY` maps the variable
    /// `LOFT_TELEMETRY_COLLECTION_INTERVAL_SECS` to `collection_interval_secs`, and so
    /// on. Unset fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix is empty or a variable cannot be deserialized
    /// into its field's type.
    pub fn from_environment(prefix: &str) -> Result<Self, ConfigurationError> {
        ensure!(!prefix.is_empty(), EmptyPrefix);

        let prefix = format!("{}_", prefix.trim_end_matches('_'));
        let config = Figment::new().merge(Env::prefixed(&prefix)).extract()?;
        Ok(config)
    }

    /// Returns how often the periodic reporter runs a collection cycle.
    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    /// Returns the depth of the reporter's broadcast queue.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }
}

impl Default for TelemetryConfiguration {
    fn default() -> Self {
        Self {
            collection_interval_secs: default_collection_interval_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TelemetryConfiguration::default();
        assert_eq!(config.collection_interval(), Duration::from_secs(60));
        assert_eq!(config.channel_capacity(), 2);
    }

    #[test]
    fn empty_prefix_is_rejected() {
        let error = TelemetryConfiguration::from_environment("").unwrap_err();
        assert!(matches!(error, ConfigurationError::EmptyPrefix));
    }

    #[test]
    fn loads_from_prefixed_environment() {
        std::env::set_var("LOFT_TELEMETRY_TEST_COLLECTION_INTERVAL_SECS", "15");

        let config = TelemetryConfiguration::from_environment("LOFT_TELEMETRY_TEST").unwrap();
        assert_eq!(config.collection_interval(), Duration::from_secs(15));
        assert_eq!(config.channel_capacity(), 2);

        std::env::remove_var("LOFT_TELEMETRY_TEST_COLLECTION_INTERVAL_SECS");
    }
}
