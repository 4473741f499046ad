//! Probe strategy selection from a model identifier.
//!
//! Catalogs returned by OpenAI-compatible gateways carry no capability
//! metadata, so the probe shape is guessed from the identifier. Both keyword
//! tables are plain data; adding a family means adding a string.

use serde::{Deserialize, Serialize};

/// How a model should be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Minimal chat completion.
    Chat,
    /// Catalog existence check only.
    NonChat,
}

impl ProbeKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::NonChat => "non-chat",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Families and suffixes that suggest a conversational model.
pub const CHAT_INDICATORS: &[&str] = &[
    "gpt", "claude", "gemini", "llama", "mistral", "qwen", "deepseek", "chat", "instruct",
    "turbo", "sonnet", "haiku", "opus",
];

/// Audio, embedding, image and legacy completion families.
pub const NON_CHAT_INDICATORS: &[&str] = &[
    "tts",
    "whisper",
    "embedding",
    "ada",
    "babbage",
    "curie",
    "davinci",
    "dall-e",
    "midjourney",
    "stable-diffusion",
    "clip",
    "codex",
];

/// Choose the probe strategy for `identifier`.
///
/// Case-insensitive substring match. Non-chat indicators win over chat
/// indicators (`gpt-4o-mini-tts` is a speech model). Identifiers matching
/// neither table default to [`ProbeKind::Chat`]: most catalogs are
/// dominated by chat models, and a wrong guess is corrected by the
/// prober's `unknown field` retry.
#[must_use]
pub fn classify(identifier: &str) -> ProbeKind {
    let lower = identifier.to_lowercase();

    if NON_CHAT_INDICATORS.iter().any(|k| lower.contains(k)) {
        return ProbeKind::NonChat;
    }
    if CHAT_INDICATORS.iter().any(|k| lower.contains(k)) {
        return ProbeKind::Chat;
    }
    ProbeKind::Chat
}
