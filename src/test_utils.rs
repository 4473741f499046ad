//! Test utilities for modelwatch.
//!
//! Provides a scriptable in-memory upstream, status factories and a
//! temporary directory helper for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use modelwatch::test_utils::*;
//!
//! let api = FakeModelApi::new(["gpt-4", "whisper-1"])
//!     .with_outcome("gpt-4", FakeOutcome::status(429, "Rate limit reached"));
//! let dir = TestDir::new();
//! dir.create_file("config.toml", "[probe]\nbatch_size = 5");
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::models::{ModelStatus, ProbeState, StatusMap};
use crate::core::upstream::{ChatProbe, ModelApi};
use crate::error::{MonitorError, Result};

// =============================================================================
// Fake upstream
// =============================================================================

/// Scripted answer for one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeOutcome {
    /// 2xx with this completion text.
    Reply(String),
    /// 2xx with no completion text.
    NoContent,
    /// Non-2xx with this status and message.
    Status { status: u16, message: String },
    /// Request timed out after this many seconds.
    Timeout(u64),
    /// Connection-level failure.
    Network(String),
    /// The call panics.
    Panic,
}

impl FakeOutcome {
    #[must_use]
    pub fn reply(text: &str) -> Self {
        Self::Reply(text.to_string())
    }

    #[must_use]
    pub fn status(status: u16, message: &str) -> Self {
        Self::Status {
            status,
            message: message.to_string(),
        }
    }

    fn into_error(self, model: &str) -> MonitorError {
        match self {
            Self::Status { status, message } => MonitorError::UpstreamStatus { status, message },
            Self::Timeout(secs) => MonitorError::Timeout(secs),
            Self::Network(msg) => MonitorError::Network(msg),
            Self::Reply(_) | Self::NoContent | Self::Panic => {
                MonitorError::Other(anyhow::anyhow!("{model}: outcome is not an error"))
            }
        }
    }
}

/// In-memory [`ModelApi`] with per-model scripted outcomes and call counters.
///
/// Models without a scripted outcome answer chat probes with `"pong"`.
/// Outcomes and the catalog can be changed between cycles.
pub struct FakeModelApi {
    catalog: Mutex<Vec<String>>,
    outcomes: Mutex<HashMap<String, FakeOutcome>>,
    listing_failure: Mutex<Option<FakeOutcome>>,
    latency: Duration,
    chat_calls: Mutex<HashMap<String, usize>>,
    finished_chat_calls: AtomicUsize,
    last_chat: Mutex<Option<ChatProbe>>,
    list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeModelApi {
    /// Create a fake whose `GET /models` returns `catalog`.
    #[must_use]
    pub fn new<I, S>(catalog: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog: Mutex::new(catalog.into_iter().map(Into::into).collect()),
            outcomes: Mutex::new(HashMap::new()),
            listing_failure: Mutex::new(None),
            latency: Duration::ZERO,
            chat_calls: Mutex::new(HashMap::new()),
            finished_chat_calls: AtomicUsize::new(0),
            last_chat: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Script the chat outcome for `model`.
    #[must_use]
    pub fn with_outcome(self, model: &str, outcome: FakeOutcome) -> Self {
        self.set_outcome(model, outcome);
        self
    }

    /// Make every call sleep for `latency` (use with paused tokio time).
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `GET /models` time out.
    #[must_use]
    pub fn with_listing_failure_timeout(self, secs: u64) -> Self {
        self.set_listing_failure(Some(FakeOutcome::Timeout(secs)));
        self
    }

    /// Change the chat outcome for `model`.
    pub fn set_outcome(&self, model: &str, outcome: FakeOutcome) {
        lock(&self.outcomes).insert(model.to_string(), outcome);
    }

    /// Replace the catalog returned by `GET /models`.
    pub fn set_catalog<S: Into<String>>(&self, models: impl IntoIterator<Item = S>) {
        *lock(&self.catalog) = models.into_iter().map(Into::into).collect();
    }

    /// Make `GET /models` fail with `outcome`, or succeed again with `None`.
    pub fn set_listing_failure(&self, outcome: Option<FakeOutcome>) {
        *lock(&self.listing_failure) = outcome;
    }

    /// Number of chat probes sent for `model`.
    #[must_use]
    pub fn chat_calls(&self, model: &str) -> usize {
        lock(&self.chat_calls).get(model).copied().unwrap_or(0)
    }

    /// Number of chat probes sent for any model.
    #[must_use]
    pub fn total_chat_calls(&self) -> usize {
        lock(&self.chat_calls).values().sum()
    }

    /// Number of chat probes that ran to completion. Probes whose task was
    /// aborted mid-call are counted by [`Self::chat_calls`] only.
    #[must_use]
    pub fn finished_chat_calls(&self) -> usize {
        self.finished_chat_calls.load(Ordering::SeqCst)
    }

    /// Number of `GET /models` calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running upstream calls observed.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The most recent chat request.
    #[must_use]
    pub fn last_chat_probe(&self) -> Option<ChatProbe> {
        lock(&self.last_chat).clone()
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ModelApi for FakeModelApi {
    async fn list_models(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let failure = lock(&self.listing_failure).clone();
        let catalog = lock(&self.catalog).clone();
        self.leave();

        match failure {
            Some(outcome) => Err(outcome.into_error("GET /models")),
            None => Ok(catalog),
        }
    }

    async fn chat_completion(&self, request: &ChatProbe) -> Result<Option<String>> {
        *lock(&self.chat_calls).entry(request.model.clone()).or_insert(0) += 1;
        *lock(&self.last_chat) = Some(request.clone());
        self.enter().await;
        let outcome = lock(&self.outcomes).get(&request.model).cloned();
        self.leave();
        self.finished_chat_calls.fetch_add(1, Ordering::SeqCst);

        match outcome {
            None => Ok(Some("pong".to_string())),
            Some(FakeOutcome::Reply(text)) => Ok(Some(text)),
            Some(FakeOutcome::NoContent) => Ok(None),
            Some(FakeOutcome::Panic) => panic!("fake upstream panic for {}", request.model),
            Some(other) => Err(other.into_error(&request.model)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// =============================================================================
// Status factories
// =============================================================================

/// Build a status record in the given state.
#[must_use]
pub fn make_test_status(model: &str, state: ProbeState) -> ModelStatus {
    match state {
        ProbeState::Online => ModelStatus::online(model, "pong"),
        ProbeState::Offline => ModelStatus::offline(model, "HTTP 503: Service Unavailable"),
        ProbeState::Error => ModelStatus::errored(model, "probe task panicked: boom"),
    }
}

/// Build a status map from `(model, state)` pairs.
#[must_use]
pub fn make_test_status_map(entries: &[(&str, ProbeState)]) -> StatusMap {
    entries
        .iter()
        .map(|(model, state)| ((*model).to_string(), make_test_status(model, *state)))
        .collect()
}

// =============================================================================
// Temporary directories
// =============================================================================

/// An isolated temporary directory, removed on drop.
///
/// # Examples
///
/// ```rust,ignore
/// use modelwatch::test_utils::TestDir;
///
/// let dir = TestDir::new();
/// dir.create_file("config.toml", "[cache]\nttl_seconds = 30");
/// assert!(dir.path().join("config.toml").exists());
/// ```
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file in the temporary directory with the given content.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
