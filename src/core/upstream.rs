//! Upstream inference API access.
//!
//! [`ModelApi`] is the seam between the monitor and the network: the
//! prober and discovery only ever talk to this trait. [`OpenAiCompatApi`]
//! implements it for any gateway speaking the OpenAI REST dialect.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{build_client, send_json};
use crate::error::Result;

/// Operations the monitor needs from an inference API.
#[async_trait]
pub trait ModelApi: Send + Sync {
    /// List the identifiers of every model the API exposes.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Send a single-turn chat completion and return the reply text, if any.
    async fn chat_completion(&self, request: &ChatProbe) -> Result<Option<String>>;
}

/// Minimal chat request used to check a model is responsive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatProbe {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// =============================================================================
// OpenAI-compatible implementation
// =============================================================================

/// [`ModelApi`] over `GET /models` and `POST /chat/completions`.
pub struct OpenAiCompatApi {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    probe_timeout: Duration,
    discovery_timeout: Duration,
}

impl OpenAiCompatApi {
    /// Create a client for `base_url` (e.g. `https://api.example.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        probe_timeout: Duration,
        discovery_timeout: Duration,
    ) -> Result<Self> {
        let client = build_client(probe_timeout.max(discovery_timeout))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            probe_timeout,
            discovery_timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl ModelApi for OpenAiCompatApi {
    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let request = self.authorize(self.client.get(&url));
        let list: ModelList = send_json(request, self.discovery_timeout).await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    async fn chat_completion(&self, probe: &ChatProbe) -> Result<Option<String>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &probe.model,
            messages: [ChatMessage {
                role: "user",
                content: &probe.prompt,
            }],
            max_tokens: probe.max_tokens,
        };
        let request = self.authorize(self.client.post(&url).json(&body));
        let response: ChatResponse = send_json(request, self.probe_timeout).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_wire_shape() {
        let body = ChatRequest {
            model: "gpt-4",
            messages: [ChatMessage {
                role: "user",
                content: "Hello, are you working?",
            }],
            max_tokens: 16,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello, are you working?");
        assert_eq!(json["max_tokens"], 16);
    }

    #[test]
    fn chat_response_tolerates_missing_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.as_ref().unwrap().content.is_none());

        let parsed: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn model_list_ignores_extra_fields() {
        let parsed: ModelList = serde_json::from_str(
            r#"{"object":"list","data":[{"id":"gpt-4","owned_by":"openai"},{"id":"whisper-1"}]}"#,
        )
        .unwrap();
        let ids: Vec<_> = parsed.data.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gpt-4", "whisper-1"]);
    }

    #[test]
    fn blank_api_key_is_dropped_and_base_trimmed() {
        let api = OpenAiCompatApi::new(
            "https://api.example.com/v1/",
            Some("  ".to_string()),
            Duration::from_secs(60),
            Duration::from_secs(30),
        )
        .unwrap();
        assert!(api.api_key.is_none());
        assert_eq!(api.base_url(), "https://api.example.com/v1");
    }
}
