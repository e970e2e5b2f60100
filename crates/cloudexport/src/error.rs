//! Cloud export error types

use crate::model::CloudProvider;
use std::fmt;
use thiserror::Error;

/// Local validation failures, detected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("for cloud_provider={expected}, there should also be {expected}{{...}} attribute provided")]
    ProviderBlockMismatch { expected: CloudProvider },

    #[error("cloud_provider should be one of [aws, azure, gce, ibm], got: {got:?}")]
    UnsupportedProvider { got: String },

    #[error("missing {block}{{...}} block for cloud_provider={block}")]
    MissingVariantBlock { block: CloudProvider },

    #[error("missing required attribute: {path}")]
    MissingField { path: String },

    #[error("invalid value for {path}: {reason}")]
    InvalidField { path: String, reason: String },
}

/// Failures reported by an external API client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{message} (after {attempts} attempt(s))")]
    Transport { message: String, attempts: u32 },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Reconciliation operation, used to label surfaced errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
            Operation::List => write!(f, "list"),
        }
    }
}

/// Errors surfaced to the caller of a reconciliation operation
#[derive(Error, Debug)]
pub enum CloudExportError {
    #[error("Failed to {operation} cloud export{}: {source}", id_suffix(.id))]
    Validation {
        operation: Operation,
        /// Set when the export already exists
        id: Option<String>,
        #[source]
        source: ValidationError,
    },

    #[error("Failed to create cloud export {name:?}: name already taken ({message})")]
    Conflict { name: String, message: String },

    #[error("Failed to {operation} cloud export (id: {id}): not found")]
    NotFound { operation: Operation, id: String },

    #[error("Failed to {operation} cloud export {}: {source}", display_id(.id))]
    Api {
        operation: Operation,
        id: Option<String>,
        #[source]
        source: ApiError,
    },

    #[error("{operation} of cloud export {} was cancelled", display_id(.id))]
    Cancelled { operation: Operation, id: Option<String> },

    #[error("Cannot {operation} cloud export: {reason}")]
    InvalidState { operation: Operation, reason: String },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudExportError {
    /// Whether the failure stems from local input rather than the remote service
    pub fn is_validation(&self) -> bool {
        matches!(self, CloudExportError::Validation { .. })
    }
}

/// ` (id: X)` for a known export, nothing otherwise
fn id_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) if !id.is_empty() => format!(" (id: {})", id),
        _ => String::new(),
    }
}

/// Render an optional id for error messages
fn display_id(id: &Option<String>) -> String {
    match id {
        Some(id) if !id.is_empty() => format!("(id: {})", id),
        _ => "(id: <unassigned>)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, CloudExportError>;
