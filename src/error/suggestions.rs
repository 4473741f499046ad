//! Fix suggestion database for modelwatch errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Primary fix commands in order of preference.
    /// These should be copy-paste ready for the terminal.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

// =============================================================================
// Network
// =============================================================================

/// Suggestions for a request that exceeded its timeout.
#[must_use]
pub fn timeout_suggestions(seconds: u64) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![format!("MODELWATCH_PROBE_TIMEOUT={} modelwatch refresh", seconds * 2)],
            format!("The upstream API did not answer within {seconds}s."),
        )
        .with_prevention("Slow models are reported offline; raise the timeout if that is expected."),
    ]
}

/// Suggestions for a connection-level failure.
#[must_use]
pub fn network_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["modelwatch models".to_string()],
        format!("Could not reach the upstream API: {message}. Check MODELWATCH_API_BASE and connectivity."),
    )]
}

// =============================================================================
// Upstream
// =============================================================================

/// Suggestions keyed off the upstream HTTP status.
#[must_use]
pub fn upstream_status_suggestions(status: u16, message: &str) -> Vec<FixSuggestion> {
    match status {
        401 | 403 => vec![
            FixSuggestion::new(
                vec!["export MODELWATCH_API_KEY=<key>".to_string()],
                format!("The upstream API rejected the credentials ({status}): {message}"),
            )
            .with_prevention("OPENAI_API_KEY is read when MODELWATCH_API_KEY is unset."),
        ],
        429 => vec![
            FixSuggestion::new(
                vec!["MODELWATCH_BATCH_SIZE=5 modelwatch refresh".to_string()],
                format!("The upstream API is rate limiting probes: {message}"),
            )
            .with_prevention("Smaller batches or a concurrency cap reduce burst load."),
        ],
        _ => Vec::new(),
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Suggestions for an unparseable config file.
#[must_use]
pub fn config_parse_suggestions(path: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![format!("$EDITOR {path}")],
        format!("The config file is not valid TOML: {message}"),
    )]
}

/// Suggestions for an out-of-range config value.
#[must_use]
pub fn config_invalid_suggestions(key: &str, value: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        Vec::new(),
        format!("'{key}' = '{value}' is not accepted: {message}"),
    )]
}

// =============================================================================
// Orchestration
// =============================================================================

/// Suggestions for a refresh cycle that could not complete.
#[must_use]
pub fn cycle_failed_suggestions(reason: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["modelwatch refresh --log-level debug".to_string()],
        format!("The refresh cycle aborted: {reason}. The previous snapshot is still served."),
    )]
}
