//! Single-model liveness probe.
//!
//! A probe never fails: every upstream error is folded into an `offline`
//! [`ModelStatus`] so the batch runner can treat all outcomes uniformly.

use std::sync::Arc;
use std::time::Instant;

use super::classifier::{ProbeKind, classify};
use super::models::ModelStatus;
use super::upstream::{ChatProbe, ModelApi};
use crate::error::{MonitorError, Result};

/// Prompt sent to chat models.
pub const DEFAULT_PROBE_PROMPT: &str = "Hello, are you working?";

/// Output cap for chat probes. Some gateways reject values below 16.
pub const DEFAULT_PROBE_MAX_TOKENS: u32 = 16;

/// Response recorded when a chat model answers with no text.
pub const EMPTY_CHAT_RESPONSE: &str = "OK";

/// Response recorded for a non-chat model found in the catalog.
pub const NON_CHAT_RESPONSE: &str = "Model available (non-chat)";

/// Issues liveness checks against one upstream API.
#[derive(Clone)]
pub struct Prober {
    api: Arc<dyn ModelApi>,
    prompt: String,
    max_tokens: u32,
}

impl Prober {
    #[must_use]
    pub fn new(api: Arc<dyn ModelApi>) -> Self {
        Self {
            api,
            prompt: DEFAULT_PROBE_PROMPT.to_string(),
            max_tokens: DEFAULT_PROBE_MAX_TOKENS,
        }
    }

    /// Override the chat prompt and output cap.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>, max_tokens: u32) -> Self {
        self.prompt = prompt.into();
        self.max_tokens = max_tokens;
        self
    }

    /// Probe `model` and return its status record.
    ///
    /// Chat-classified models that the upstream rejects with an
    /// `unknown field` error are retried once as non-chat.
    pub async fn probe(&self, model: &str) -> ModelStatus {
        let kind = classify(model);
        let start = Instant::now();

        let result = match kind {
            ProbeKind::Chat => match self.probe_chat(model).await {
                Err(err) if err.is_unknown_field() => {
                    tracing::debug!(
                        model,
                        error = %err,
                        "Chat probe rejected as malformed, retrying as non-chat"
                    );
                    self.probe_non_chat(model).await
                }
                other => other,
            },
            ProbeKind::NonChat => self.probe_non_chat(model).await,
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                tracing::debug!(model, kind = %kind, duration_ms, "Probe succeeded");
                ModelStatus::online(model, response)
            }
            Err(err) => {
                tracing::debug!(model, kind = %kind, duration_ms, error = %err, "Probe failed");
                ModelStatus::offline(model, err.to_string())
            }
        }
    }

    async fn probe_chat(&self, model: &str) -> Result<String> {
        let request = ChatProbe {
            model: model.to_string(),
            prompt: self.prompt.clone(),
            max_tokens: self.max_tokens,
        };
        let reply = self.api.chat_completion(&request).await?;
        Ok(reply
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_CHAT_RESPONSE.to_string()))
    }

    async fn probe_non_chat(&self, model: &str) -> Result<String> {
        let models = self.api.list_models().await?;
        if models.iter().any(|m| m == model) {
            Ok(NON_CHAT_RESPONSE.to_string())
        } else {
            Err(MonitorError::ModelNotFound(model.to_string()))
        }
    }
}
