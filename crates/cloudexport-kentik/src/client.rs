//! Kentik Cloud Export REST client
//!
//! Implements [`CloudExportApi`] over the v202101beta1 JSON API. Requests are
//! retried with exponential backoff according to the [`RetryPolicy`] the
//! client was built with.

use crate::error::{KentikError, Result};
use crate::wire::{ExportEnvelope, ListExportsResponse, WireExport};
use async_trait::async_trait;
use cloudexport::{
    ApiError, CloudExport, CloudExportApi, FailureClass, Operation, RetryPolicy, classify_status,
};
use cloudexport_config::{AuthToken, ResolvedConfig};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const EXPORTS_PATH: &str = "/cloud_export/v202101beta1/exports";

const AUTH_EMAIL_HEADER: &str = "X-CH-Auth-Email";
const AUTH_TOKEN_HEADER: &str = "X-CH-Auth-API-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

/// Kentik Cloud Export API client
pub struct KentikClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    token: AuthToken,
    retry: RetryPolicy,
    log_payloads: bool,
}

/// Outcome of one HTTP attempt
enum Attempt {
    Done(String),
    Retry(String),
}

impl KentikClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let base_url = config.api_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(KentikError::InvalidUrl(config.api_url.clone()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("cloudexport-kentik/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            email: config.email.clone(),
            token: config.token.clone(),
            retry: config.retry,
            log_payloads: config.log_payloads,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn exports_url(&self) -> String {
        format!("{}{}", self.base_url, EXPORTS_PATH)
    }

    fn export_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, EXPORTS_PATH, id)
    }

    /// Send a request, retrying retryable failures; returns the response body
    async fn send(
        &self,
        operation: Operation,
        method: Method,
        url: &str,
        body: Option<&ExportEnvelope>,
    ) -> std::result::Result<String, ApiError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let message = match self.attempt(operation, &method, url, body, attempt).await? {
                Attempt::Done(text) => return Ok(text),
                Attempt::Retry(message) => message,
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    "Giving up on {} {} after {} attempt(s): {}",
                    method,
                    url,
                    attempt,
                    message
                );
                return Err(ApiError::Transport {
                    message,
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay_for(attempt);
            tracing::warn!(
                "{} {} failed ({}), retrying in {:?} (attempt {}/{})",
                method,
                url,
                message,
                delay,
                attempt,
                max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(
        &self,
        operation: Operation,
        method: &Method,
        url: &str,
        body: Option<&ExportEnvelope>,
        attempt: u32,
    ) -> std::result::Result<Attempt, ApiError> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTH_EMAIL_HEADER, &self.email)
            .header(AUTH_TOKEN_HEADER, self.token.expose());
        if let Some(body) = body {
            if self.log_payloads {
                tracing::debug!(
                    "{} {} request payload: {}",
                    method,
                    url,
                    serde_json::to_string(body).unwrap_or_default()
                );
            }
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => return Ok(Attempt::Retry(e.to_string())),
            Err(e) => {
                return Err(ApiError::Transport {
                    message: e.to_string(),
                    attempts: attempt,
                });
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Transport {
            message: format!("failed to read response body: {}", e),
            attempts: attempt,
        })?;
        if self.log_payloads {
            tracing::debug!("{} {} response {}: {}", method, url, status, text);
        }
        if status.is_success() {
            return Ok(Attempt::Done(text));
        }

        let message = format!("{}: {}", status, error_message(&text));
        match classify_status(operation, status.as_u16()) {
            FailureClass::NotFound => Err(ApiError::NotFound(message)),
            FailureClass::Conflict => Err(ApiError::Conflict(message)),
            FailureClass::Retryable => Ok(Attempt::Retry(message)),
            FailureClass::Fatal => Err(ApiError::Transport {
                message,
                attempts: attempt,
            }),
        }
    }
}

#[async_trait]
impl CloudExportApi for KentikClient {
    async fn create(&self, export: &CloudExport) -> std::result::Result<CloudExport, ApiError> {
        let body = ExportEnvelope {
            export: WireExport::from(&export.for_write()),
        };
        let text = self
            .send(Operation::Create, Method::POST, &self.exports_url(), Some(&body))
            .await?;
        decode::<ExportEnvelope>(&text)?.export.try_into()
    }

    async fn get(&self, id: &str) -> std::result::Result<CloudExport, ApiError> {
        let text = self
            .send(Operation::Read, Method::GET, &self.export_url(id), None)
            .await?;
        decode::<ExportEnvelope>(&text)?.export.try_into()
    }

    async fn update(
        &self,
        id: &str,
        export: &CloudExport,
    ) -> std::result::Result<CloudExport, ApiError> {
        let mut wire = WireExport::from(&export.for_write());
        wire.id = id.to_string();
        let body = ExportEnvelope { export: wire };
        let text = self
            .send(Operation::Update, Method::PUT, &self.export_url(id), Some(&body))
            .await?;
        decode::<ExportEnvelope>(&text)?.export.try_into()
    }

    async fn delete(&self, id: &str) -> std::result::Result<(), ApiError> {
        self.send(Operation::Delete, Method::DELETE, &self.export_url(id), None)
            .await?;
        Ok(())
    }

    async fn list(&self) -> std::result::Result<Vec<CloudExport>, ApiError> {
        let text = self
            .send(Operation::List, Method::GET, &self.exports_url(), None)
            .await?;
        let response: ListExportsResponse = decode(&text)?;
        if response.invalid_exports_count > 0 {
            tracing::warn!(
                "Kentik API returned {} invalid cloud exports, skipping them",
                response.invalid_exports_count
            );
        }

        let mut exports = Vec::with_capacity(response.exports.len());
        for wire in response.exports {
            match CloudExport::try_from(wire) {
                Ok(export) => exports.push(export),
                Err(e) => tracing::warn!("Skipping undecodable cloud export: {}", e),
            }
        }
        Ok(exports)
    }
}

/// Decode a response body
fn decode<T: DeserializeOwned>(text: &str) -> std::result::Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// `message` of a JSON error body, or the raw body
fn error_message(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string())
}
