//! Configuration error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid duration for {field}: {value:?} ({source})")]
    InvalidDuration {
        field: &'static str,
        value: String,
        source: DurationError,
    },

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("{field} is required; set it in the provider configuration or via {env}")]
    MissingField {
        field: &'static str,
        env: &'static str,
    },
}

/// Why a duration string could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("negative durations are not allowed")]
    Negative,

    #[error("expected a number")]
    InvalidNumber,

    #[error("missing unit after number")]
    MissingUnit,

    #[error("unknown unit {0:?}")]
    UnknownUnit(String),

    #[error("duration out of range")]
    Overflow,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
