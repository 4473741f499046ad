//! HTTP client utilities.
//!
//! Provides the shared HTTP client and the response handling every upstream
//! call goes through, so probes and discovery report failures identically.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{MonitorError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest upstream body excerpt kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// Build a configured HTTP client.
///
/// `timeout` is the client-wide ceiling; individual requests may set a
/// shorter one.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("modelwatch/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| MonitorError::Network(e.to_string()))
}

/// Get or create a default HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn default_client() -> Result<Client> {
    build_client(DEFAULT_TIMEOUT)
}

/// Send a request with a per-call timeout and decode a JSON body.
///
/// Non-2xx responses become [`MonitorError::UpstreamStatus`] carrying the
/// best message the body offers.
///
/// # Errors
///
/// Returns error on network failure, timeout, non-2xx status, or JSON parse
/// failure.
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder, timeout: Duration) -> Result<T> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| map_send_error(&e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(upstream_error(status, &body));
    }

    response.json().await.map_err(|e| {
        if e.is_timeout() {
            MonitorError::Timeout(timeout.as_secs())
        } else {
            MonitorError::ParseResponse(e.to_string())
        }
    })
}

/// Classify a transport-level reqwest failure.
#[must_use]
pub fn map_send_error(err: &reqwest::Error, timeout: Duration) -> MonitorError {
    if err.is_timeout() {
        MonitorError::Timeout(timeout.as_secs())
    } else {
        MonitorError::Network(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured { message: String },
    Plain(String),
}

/// Build an upstream error from a non-2xx status and its body.
///
/// Preference order for the message: `{"error":{"message":..}}`,
/// `{"error":".."}`, the raw body (truncated), the canonical status reason.
#[must_use]
pub fn upstream_error(status: StatusCode, body: &str) -> MonitorError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| match envelope.error {
            ErrorBody::Structured { message } | ErrorBody::Plain(message) => message,
        })
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| truncate(trimmed, MAX_ERROR_BODY))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    MonitorError::UpstreamStatus {
        status: status.as_u16(),
        message,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
