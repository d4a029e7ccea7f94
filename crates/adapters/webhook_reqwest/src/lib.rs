//! # autorule-adapter-webhook-reqwest
//!
//! Outbound HTTP for `webhook` actions, built on [reqwest](https://docs.rs/reqwest).
//!
//! ## Responsibilities
//! - Implement the `HttpClient` port from `autorule-app::ports::executors`
//! - Apply a per-request timeout and report it as `AutomationError::Timeout`
//! - Return the response status; status interpretation stays in the core
//!
//! ## Dependency rule
//! Depends on `autorule-app` (for port traits) and `autorule-domain` (for domain types).

use std::time::Duration;

use autorule_app::ports::{HttpClient, HttpRequest};
use autorule_domain::automation::HttpMethod;
use autorule_domain::error::AutomationError;

/// Errors raised while performing a request.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The client could not be built.
    #[error("cannot build HTTP client")]
    Build(#[source] reqwest::Error),

    /// The request failed before a response arrived.
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<WebhookError> for AutomationError {
    fn from(err: WebhookError) -> Self {
        Self::Internal(Box::new(err))
    }
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    /// Build a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Build`] if the TLS backend cannot be set up.
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WebhookError::Build)?;
        Ok(Self { client, timeout })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn perform(&self, request: HttpRequest) -> Result<u16, AutomationError> {
        let HttpRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let mut builder = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
        };
        for (name, value) in &headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                tracing::debug!(status, "webhook answered");
                Ok(status)
            }
            Err(err) if err.is_timeout() => Err(AutomationError::Timeout {
                timeout_ms: self.timeout_ms(),
            }),
            Err(source) => Err(WebhookError::Request { url, source }.into()),
        }
    }
}
