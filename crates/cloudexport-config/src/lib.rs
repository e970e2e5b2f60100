//! Provider configuration for cloud export
//!
//! Explicit settings come from the host configuration block. Every setting
//! falls back to a `KTAPI_*` environment variable and then to a built-in
//! default. [`ResolvedConfig::resolve`] runs once, before any network
//! activity; the result is immutable.

pub mod duration;
pub mod error;

pub use duration::parse_duration;
pub use error::*;

use cloudexport::RetryPolicy;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

pub const ENV_API_URL: &str = "KTAPI_URL";
pub const ENV_AUTH_EMAIL: &str = "KTAPI_AUTH_EMAIL";
pub const ENV_AUTH_TOKEN: &str = "KTAPI_AUTH_TOKEN";
pub const ENV_LOG_PAYLOADS: &str = "KTAPI_LOG_PAYLOADS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "KTAPI_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_MIN_DELAY: &str = "KTAPI_RETRY_MIN_DELAY";
pub const ENV_RETRY_MAX_DELAY: &str = "KTAPI_RETRY_MAX_DELAY";

pub const DEFAULT_API_URL: &str = "https://cloudexports.api.kentik.com";

/// Provider configuration block as written by the user
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// Cloud Export API server URL
    #[serde(default)]
    pub apiurl: Option<String>,

    /// Authorization email
    #[serde(default)]
    pub email: Option<String>,

    /// Authorization token
    #[serde(default)]
    pub token: Option<AuthToken>,

    #[serde(default)]
    pub retry: Option<RetrySettings>,

    /// Log request and response payloads at debug level
    #[serde(default)]
    pub log_payloads: Option<bool>,
}

/// Optional `retry` block; zero and empty values count as unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Go duration string, e.g. `1s`
    #[serde(default)]
    pub min_delay: Option<String>,

    /// Go duration string, e.g. `5m`
    #[serde(default)]
    pub max_delay: Option<String>,
}

/// API token; never printed
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stripped")
    }
}

/// Fully resolved provider configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub email: String,
    pub token: AuthToken,
    pub retry: RetryPolicy,
    pub log_payloads: bool,
}

impl ResolvedConfig {
    /// Resolve `settings` against the process environment
    pub fn resolve(settings: &ProviderSettings) -> Result<Self> {
        Self::resolve_with(settings, |name| std::env::var(name).ok())
    }

    /// Resolve `settings`, looking up fallbacks through `env`
    pub fn resolve_with(
        settings: &ProviderSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_url = non_empty(settings.apiurl.clone())
            .or_else(|| non_empty(env(ENV_API_URL)))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let email = non_empty(settings.email.clone())
            .or_else(|| non_empty(env(ENV_AUTH_EMAIL)))
            .ok_or(ConfigError::MissingField {
                field: "email",
                env: ENV_AUTH_EMAIL,
            })?;

        let token = settings
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| non_empty(env(ENV_AUTH_TOKEN)).map(AuthToken))
            .ok_or(ConfigError::MissingField {
                field: "token",
                env: ENV_AUTH_TOKEN,
            })?;

        let log_payloads = match settings.log_payloads {
            Some(value) => value,
            None => match non_empty(env(ENV_LOG_PAYLOADS)) {
                Some(raw) => parse_bool(ENV_LOG_PAYLOADS, &raw)?,
                None => false,
            },
        };

        let retry = resolve_retry_policy_with(settings.retry.as_ref(), &env)?;

        let config = Self {
            api_url,
            email,
            token,
            retry,
            log_payloads,
        };
        tracing::debug!("Resolved provider configuration: {:?}", config);
        Ok(config)
    }
}

/// Resolve the retry policy against the process environment
pub fn resolve_retry_policy(explicit: Option<&RetrySettings>) -> Result<RetryPolicy> {
    resolve_retry_policy_with(explicit, |name| std::env::var(name).ok())
}

/// Resolve the retry policy field by field: a non-zero explicit value, then
/// the environment, then the built-in default
///
/// The environment is consulted whether or not a `retry` block was given.
pub fn resolve_retry_policy_with(
    explicit: Option<&RetrySettings>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RetryPolicy> {
    let explicit = explicit.cloned().unwrap_or_default();

    let max_attempts = match explicit.max_attempts.filter(|n| *n > 0) {
        Some(n) => Some(n),
        None => match non_empty(env(ENV_RETRY_MAX_ATTEMPTS)) {
            Some(raw) => Some(parse_attempts(&raw)?),
            None => None,
        },
    }
    .filter(|n| *n > 0)
    .unwrap_or(RetryPolicy::DEFAULT_MAX_ATTEMPTS);

    let min_delay = resolve_delay(
        "retry.min_delay",
        explicit.min_delay,
        ENV_RETRY_MIN_DELAY,
        &env,
    )?
    .unwrap_or(RetryPolicy::DEFAULT_MIN_DELAY);

    let max_delay = resolve_delay(
        "retry.max_delay",
        explicit.max_delay,
        ENV_RETRY_MAX_DELAY,
        &env,
    )?
    .unwrap_or(RetryPolicy::DEFAULT_MAX_DELAY);

    Ok(RetryPolicy {
        max_attempts,
        min_delay,
        max_delay,
    })
}

/// Explicit value first, then the environment variable
fn resolve_delay(
    field: &'static str,
    explicit: Option<String>,
    env_name: &'static str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<Option<Duration>> {
    if let Some(delay) = parse_delay(field, non_empty(explicit))? {
        return Ok(Some(delay));
    }
    parse_delay(env_name, non_empty(env(env_name)))
}

/// A zero duration counts as unset
fn parse_delay(field: &'static str, raw: Option<String>) -> Result<Option<Duration>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let delay = parse_duration(&raw).map_err(|source| ConfigError::InvalidDuration {
        field,
        value: raw.clone(),
        source,
    })?;
    Ok(Some(delay).filter(|d| !d.is_zero()))
}

/// Parse `KTAPI_RETRY_MAX_ATTEMPTS`
fn parse_attempts(raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field: ENV_RETRY_MAX_ATTEMPTS,
            value: raw.to_string(),
        })
}

/// `1`/`t`/`true` or `0`/`f`/`false`, in the usual casings
fn parse_bool(field: &'static str, raw: &str) -> Result<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field,
            value: raw.to_string(),
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
