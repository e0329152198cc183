//! reqwest-backed transport
//!
//! One request per call, JSON in and out. Non-success statuses are classified
//! into [`TransportErrorCode`]s; the raw body is only logged after sanitizing.

use super::{CallContext, HttpMethod, Transport, TransportRequest, TransportResponse};
use crate::config::HttpConfig;
use crate::error::{TransportError, TransportErrorCode};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull a human-readable message out of an API error body
///
/// Understands `{"message": ..}`, `{"error": {"message": ..}}` and
/// `{"error": ".."}`; anything else falls back to the status line.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.get("message")
            .and_then(|m| m.as_str())
            .or_else(|| v.get("error").and_then(|e| e.get("message")).and_then(|m| m.as_str()))
            .or_else(|| v.get("error").and_then(|e| e.as_str()))
            .map(|s| s.to_string())
    });

    match message {
        Some(m) => format!("API request failed: {} - {}", status, m),
        None => format!("API request failed: {}", status),
    }
}

/// HTTP transport for REST APIs
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    /// Create a new transport from configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = match config.base_url.as_deref() {
            Some(raw) if !raw.is_empty() => {
                Some(Url::parse(raw).with_context(|| format!("Invalid base URL: {}", raw))?)
            }
            _ => None,
        };

        Ok(Self { client, base_url })
    }

    /// Create a transport rooted at `base_url` with default settings
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let config = HttpConfig {
            base_url: Some(base_url.to_string()),
            ..HttpConfig::default()
        };
        Self::new(&config)
    }

    /// Resolve a request path to an absolute URL
    fn resolve(&self, path: &str) -> Result<Url, TransportError> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }

        let Some(base) = &self.base_url else {
            return Err(TransportError::new(
                TransportErrorCode::InvalidRequest,
                format!("relative path without base URL: {}", path),
            ));
        };

        // Url::join would drop the last base segment without a trailing slash
        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| {
            TransportError::new(
                TransportErrorCode::InvalidRequest,
                format!("invalid URL {}: {}", joined, e),
            )
        })
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = self.resolve(&request.path)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request: {}", e);
            TransportError::new(
                TransportErrorCode::Network,
                format!("failed to send request: {}", e),
            )
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            TransportError::new(
                TransportErrorCode::Network,
                format!("failed to read response body: {}", e),
            )
        })?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(TransportError::from_status(
                status.as_u16(),
                error_message(status, &body),
            ));
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(TransportResponse::default());
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            TransportError::new(
                TransportErrorCode::InvalidResponse,
                format!("failed to parse response JSON: {}", e),
            )
        })?;

        Ok(TransportResponse::from_value(value))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        ctx: &CallContext,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        if ctx.is_cancelled() {
            return Err(TransportError::cancelled());
        }

        tokio::select! {
            result = self.send(request) => result,
            _ = ctx.cancelled() => Err(TransportError::cancelled()),
        }
    }
}
