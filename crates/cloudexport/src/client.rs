//! External API client abstraction

use crate::error::{ApiError, Operation};
use crate::model::CloudExport;
use async_trait::async_trait;
use std::time::Duration;

/// Cloud export service as seen by the reconciliation core
///
/// Implementations own transport and retries (driven by [`RetryPolicy`]);
/// they report a missing export as [`ApiError::NotFound`] and a duplicate
/// name on create as [`ApiError::Conflict`].
#[async_trait]
pub trait CloudExportApi: Send + Sync {
    /// Create a new export; the returned export carries the assigned id
    async fn create(&self, export: &CloudExport) -> Result<CloudExport, ApiError>;

    /// Fetch a single export
    async fn get(&self, id: &str) -> Result<CloudExport, ApiError>;

    /// Replace an existing export
    async fn update(&self, id: &str, export: &CloudExport) -> Result<CloudExport, ApiError>;

    /// Delete an export
    async fn delete(&self, id: &str) -> Result<(), ApiError>;

    /// Every export visible to the caller
    async fn list(&self) -> Result<Vec<CloudExport>, ApiError>;
}

/// Retry policy for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of request attempts (at least 1)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub min_delay: Duration,

    /// Upper bound for the delay between retries
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
    pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);

    /// Backoff before retry number `retry` (1-based): `min_delay · 2^(retry-1)`,
    /// capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.min_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            min_delay: Self::DEFAULT_MIN_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}

/// How a failed HTTP response must be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound,
    /// Duplicate name on create; never retried
    Conflict,
    Retryable,
    Fatal,
}

/// Classify a non-success HTTP status for `operation`
///
/// The service answers a create with an already-taken name with status 500,
/// so 500 is a conflict on create and is excluded from the retryable set.
pub fn classify_status(operation: Operation, status: u16) -> FailureClass {
    match status {
        404 => FailureClass::NotFound,
        500 if operation == Operation::Create => FailureClass::Conflict,
        429 | 502 | 503 | 504 => FailureClass::Retryable,
        _ => FailureClass::Fatal,
    }
}
