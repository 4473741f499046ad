//! Integration tests for the OpenAI-compatible client and the prober
//! against wiremock mock endpoints.
//!
//! Covers:
//! - Model listing and bearer authentication
//! - Chat replies, empty replies and error envelopes
//! - `unknown field` rejections retried as non-chat
//! - Timeouts and unreachable hosts

mod common;

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modelwatch::core::discovery::{FALLBACK_MODELS, discover};
use modelwatch::core::models::{CatalogSource, ProbeState};
use modelwatch::core::prober::{EMPTY_CHAT_RESPONSE, NON_CHAT_RESPONSE, Prober};
use modelwatch::core::upstream::{ChatProbe, ModelApi, OpenAiCompatApi};
use modelwatch::error::MonitorError;

use common::fixtures::{api_base, chat_reply, error_body, model_list, mount_chat, mount_models};
use common::logger::TestLogger;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(2);

fn client(server: &MockServer, key: Option<&str>) -> OpenAiCompatApi {
    OpenAiCompatApi::new(
        &api_base(server),
        key.map(String::from),
        PROBE_TIMEOUT,
        DISCOVERY_TIMEOUT,
    )
    .expect("client build")
}

fn probe(model: &str) -> ChatProbe {
    ChatProbe {
        model: model.to_string(),
        prompt: "Hello, are you working?".to_string(),
        max_tokens: 16,
    }
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn list_models_sends_bearer_token() {
    let log = TestLogger::new("list_models_sends_bearer_token");
    log.phase("setup");
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_list(&["gpt-4", "whisper-1"])))
        .expect(1)
        .mount(&server)
        .await;

    log.phase("execute");
    let ids = client(&server, Some("sk-test")).list_models().await.unwrap();

    log.phase("verify");
    assert_eq!(ids, vec!["gpt-4", "whisper-1"]);
    log.finish_ok();
}

#[tokio::test]
async fn list_models_unauthorized_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("Invalid API key")))
        .mount(&server)
        .await;

    let err = client(&server, None).list_models().await.unwrap_err();
    assert_eq!(err.http_status(), Some(401));
    assert_eq!(err.to_string(), "HTTP 401: Invalid API key");
}

#[tokio::test]
async fn list_models_garbage_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, None).list_models().await.unwrap_err();
    assert!(matches!(err, MonitorError::ParseResponse(_)), "{err:?}");
}

// =============================================================================
// Chat completions
// =============================================================================

#[tokio::test]
async fn chat_completion_returns_first_choice() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        "gpt-4",
        ResponseTemplate::new(200).set_body_json(chat_reply("Yes, I am.")),
    )
    .await;

    let reply = client(&server, None)
        .chat_completion(&probe("gpt-4"))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("Yes, I am."));
}

#[tokio::test]
async fn chat_completion_timeout_is_reported() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        "gpt-4",
        ResponseTemplate::new(200)
            .set_body_json(chat_reply("late"))
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let api = OpenAiCompatApi::new(
        &api_base(&server),
        None,
        Duration::from_millis(200),
        DISCOVERY_TIMEOUT,
    )
    .unwrap();
    let err = api.chat_completion(&probe("gpt-4")).await.unwrap_err();
    assert!(matches!(err, MonitorError::Timeout(_)), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_host_is_network_error() {
    let api = OpenAiCompatApi::new(
        "http://127.0.0.1:9/v1",
        None,
        PROBE_TIMEOUT,
        DISCOVERY_TIMEOUT,
    )
    .unwrap();
    let err = api.list_models().await.unwrap_err();
    assert!(
        matches!(err, MonitorError::Network(_) | MonitorError::Timeout(_)),
        "{err:?}"
    );
}

// =============================================================================
// Prober over HTTP
// =============================================================================

#[tokio::test]
async fn prober_marks_rate_limited_model_offline() {
    let log = TestLogger::new("prober_marks_rate_limited_model_offline");
    let server = MockServer::start().await;
    mount_chat(
        &server,
        "claude-3",
        ResponseTemplate::new(429).set_body_json(error_body("Rate limit reached")),
    )
    .await;

    let prober = Prober::new(Arc::new(client(&server, None)));
    let status = prober.probe("claude-3").await;

    assert_eq!(status.status, ProbeState::Offline);
    assert!(status.error.as_deref().unwrap().starts_with("HTTP 429"));
    assert!(status.response.is_none());
    log.finish_ok();
}

#[tokio::test]
async fn prober_empty_reply_is_ok() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        "gpt-4",
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
    )
    .await;

    let status = Prober::new(Arc::new(client(&server, None)))
        .probe("gpt-4")
        .await;
    assert_eq!(status.status, ProbeState::Online);
    assert_eq!(status.response.as_deref(), Some(EMPTY_CHAT_RESPONSE));
}

#[tokio::test]
async fn prober_retries_unknown_field_as_non_chat() {
    let server = MockServer::start().await;
    mount_chat(
        &server,
        "gpt-image-1",
        ResponseTemplate::new(400).set_body_json(error_body("unknown field `messages`")),
    )
    .await;
    mount_models(&server, &["gpt-image-1", "gpt-4"]).await;

    let status = Prober::new(Arc::new(client(&server, None)))
        .probe("gpt-image-1")
        .await;
    assert_eq!(status.status, ProbeState::Online);
    assert_eq!(status.response.as_deref(), Some(NON_CHAT_RESPONSE));
}

#[tokio::test]
async fn prober_non_chat_missing_from_listing_is_offline() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4"]).await;

    let status = Prober::new(Arc::new(client(&server, None)))
        .probe("whisper-1")
        .await;
    assert_eq!(status.status, ProbeState::Offline);
    assert_eq!(status.error.as_deref(), Some("Model not found in API"));
}

// =============================================================================
// Discovery over HTTP
// =============================================================================

#[tokio::test]
async fn discovery_server_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let catalog = discover(&client(&server, None)).await;
    assert_eq!(catalog.source(), CatalogSource::Fallback);
    assert_eq!(catalog.len(), FALLBACK_MODELS.len());
}

#[tokio::test]
async fn discovery_dedupes_upstream_listing() {
    let server = MockServer::start().await;
    mount_models(&server, &["gpt-4", "gpt-4", "claude-3"]).await;

    let catalog = discover(&client(&server, None)).await;
    assert_eq!(catalog.source(), CatalogSource::Upstream);
    assert_eq!(catalog.to_vec(), vec!["claude-3", "gpt-4"]);
}
