//! Upstream payloads and mock-server wiring.

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `GET /models` body listing `ids`.
#[must_use]
pub fn model_list(ids: &[&str]) -> Value {
    json!({
        "object": "list",
        "data": ids
            .iter()
            .map(|id| json!({ "id": id, "object": "model", "owned_by": "system" }))
            .collect::<Vec<_>>(),
    })
}

/// `POST /chat/completions` body replying with `text`.
#[must_use]
pub fn chat_reply(text: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop",
        }],
    })
}

/// OpenAI-style error envelope.
#[must_use]
pub fn error_body(message: &str) -> Value {
    json!({ "error": { "message": message, "type": "invalid_request_error" } })
}

/// Serve `GET /models` with `ids`.
pub async fn mount_models(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_list(ids)))
        .mount(server)
        .await;
}

/// Serve chat completions for `model` with `response`.
pub async fn mount_chat(server: &MockServer, model: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": model })))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Base URL the monitor should use for `server`.
#[must_use]
pub fn api_base(server: &MockServer) -> String {
    server.uri()
}
