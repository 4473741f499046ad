//! Error types for modelwatch.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five categories:
//! - **Network**: Connection failures and timeouts talking to the upstream API
//! - **Upstream**: Non-2xx responses and malformed payloads from the upstream API
//! - **Configuration**: Config file parsing, validation, or missing values
//! - **Orchestration**: Refresh-cycle failures (poisoned state, no runtime for timers)
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Each error has a stable error code (e.g., `MW-U001`) for programmatic handling.
//!
//! Most of these never reach a caller of the monitor: probe and discovery
//! failures are folded into status records and the fallback catalog. Only
//! configuration errors and [`MonitorError::CycleFailed`] escape the
//! lifecycle and refresh contracts.

pub mod suggestions;

use thiserror::Error;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network issues (timeout, DNS, connection refused).
    Network,
    /// Upstream API rejected the request or answered with garbage.
    Upstream,
    /// Configuration issues (parse errors, invalid values).
    Configuration,
    /// Refresh cycle could not run to completion.
    Orchestration,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Upstream => "Upstream API error",
            Self::Configuration => "Configuration error",
            Self::Orchestration => "Refresh cycle error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Network => "N",
            Self::Upstream => "U",
            Self::Configuration => "C",
            Self::Orchestration => "O",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Refresh cycle failed
    RefreshFailed = 2,
    /// Invalid configuration or unparseable upstream payload
    ParseError = 3,
    /// Timeout
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for modelwatch operations.
#[derive(Error, Debug)]
pub enum MonitorError {
    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timed out after the configured duration.
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// Connection-level failure (DNS, refused, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Upstream errors (Category: Upstream)
    // ==========================================================================
    /// Upstream answered with a non-2xx status.
    ///
    /// `message` is the structured `{error:{message}}` payload when present,
    /// otherwise the raw body or the canonical status reason.
    #[error("HTTP {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Upstream answered 2xx with a body we could not understand.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// A non-chat model was not present in the upstream catalog.
    #[error("Model not found in API")]
    ModelNotFound(String),

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid {
        key: String,
        value: String,
        message: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Orchestration errors (Category: Orchestration)
    // ==========================================================================
    /// A refresh cycle could not run to completion.
    #[error("refresh cycle failed: {reason}")]
    CycleFailed { reason: String },

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MonitorError {
    /// Map error to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::ParseResponse(_) => ExitCode::ParseError,

            Self::Timeout(_) => ExitCode::Timeout,

            Self::CycleFailed { .. } => ExitCode::RefreshFailed,

            Self::Network(_)
            | Self::UpstreamStatus { .. }
            | Self::ModelNotFound(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::UpstreamStatus { .. } | Self::ParseResponse(_) | Self::ModelNotFound(_) => {
                ErrorCategory::Upstream
            }

            Self::Config(_) | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }

            Self::CycleFailed { .. } => ErrorCategory::Orchestration,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `MW-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "MW-N001",
            Self::Network(_) => "MW-N099",

            Self::UpstreamStatus { .. } => "MW-U001",
            Self::ParseResponse(_) => "MW-U002",
            Self::ModelNotFound(_) => "MW-U003",

            Self::ConfigParse { .. } => "MW-C001",
            Self::ConfigInvalid { .. } => "MW-C002",
            Self::Config(_) => "MW-C099",

            Self::CycleFailed { .. } => "MW-O001",

            Self::Io(_) => "MW-X001",
            Self::Json(_) => "MW-X002",
            Self::Other(_) => "MW-X099",
        }
    }

    /// Returns whether the error is potentially recoverable by retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status carried by an upstream rejection, if any.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the upstream rejected a chat-shaped request as malformed.
    ///
    /// Matches the `unknown field` wording some OpenAI-compatible gateways
    /// use when a non-chat model receives a `messages` array. This is a
    /// string heuristic; gateways that phrase it differently are not caught.
    #[must_use]
    pub fn is_unknown_field(&self) -> bool {
        match self {
            Self::UpstreamStatus { message, .. } | Self::ParseResponse(message) => {
                message.contains("unknown field")
            }
            _ => false,
        }
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::Timeout(seconds) => suggestions::timeout_suggestions(*seconds),
            Self::Network(msg) => suggestions::network_suggestions(msg),
            Self::UpstreamStatus { status, message } => {
                suggestions::upstream_status_suggestions(*status, message)
            }
            Self::ConfigParse { path, message } => {
                suggestions::config_parse_suggestions(path, message)
            }
            Self::ConfigInvalid {
                key,
                value,
                message,
            } => suggestions::config_invalid_suggestions(key, value, message),
            Self::CycleFailed { reason } => suggestions::cycle_failed_suggestions(reason),
            Self::ParseResponse(_)
            | Self::ModelNotFound(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => Vec::new(),
        }
    }
}

/// Result type alias for modelwatch operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

// =============================================================================
// Tests
// =============================================================================
