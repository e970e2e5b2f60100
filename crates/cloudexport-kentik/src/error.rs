//! Kentik provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KentikError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] cloudexport_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, KentikError>;
