//! Error types for configuration and estimation.

use thiserror::Error;

/// Errors raised while building or validating a print configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A request parameter could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Parameter name.
        key: String,
        /// Raw value supplied.
        value: String,
    },

    /// Parsed settings violate a constraint.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// No calibration profile with that name.
    #[error("unknown calibration profile: {0}")]
    UnknownProfile(String),
}

/// Result type for estimation operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
