//! Error rendering for modelwatch.
//!
//! Human mode prints the error code, message and the first copy-paste fix.
//! JSON mode prints a structured object for machine consumption.

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::{FixSuggestion, MonitorError};

/// Render an error for stderr.
#[must_use]
pub fn render_error(
    error: &MonitorError,
    format: OutputFormat,
    no_color: bool,
    pretty: bool,
) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_human(error, no_color),
    }
}

fn render_human(error: &MonitorError, no_color: bool) -> String {
    let suggestions = error.fix_suggestions();
    let header = format!("Error [{}]: {error}", error.error_code());

    let mut lines = vec![if no_color {
        header
    } else {
        header.red().bold().to_string()
    }];

    if let Some(suggestion) = suggestions.first() {
        lines.push(format!("  {}", suggestion.context));
        if let Some(cmd) = first_command(suggestion) {
            let cmd = if no_color {
                cmd.to_string()
            } else {
                cmd.cyan().to_string()
            };
            lines.push(format!("Fix: {cmd}"));
        }
        if let Some(prevention) = &suggestion.prevention {
            lines.push(format!("Tip: {prevention}"));
        }
    }

    lines.join("\n")
}

/// First command that is not a shell comment.
fn first_command(suggestion: &FixSuggestion) -> Option<&str> {
    suggestion
        .commands
        .iter()
        .map(String::as_str)
        .find(|cmd| !cmd.trim_start().starts_with('#'))
}

#[derive(Serialize)]
struct ErrorJson {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    exit_code: i32,
    suggestions: Vec<SuggestionJson>,
}

#[derive(Serialize)]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
}

impl ErrorJson {
    fn from_error(error: &MonitorError) -> Self {
        Self {
            error_code: error.error_code(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            http_status: error.http_status(),
            exit_code: error.exit_code().into(),
            suggestions: error
                .fix_suggestions()
                .into_iter()
                .map(|s| SuggestionJson {
                    commands: s.commands,
                    context: s.context,
                    prevention: s.prevention,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorJson,
}

fn render_error_json(error: &MonitorError, pretty: bool) -> String {
    let envelope = ErrorEnvelope {
        error: ErrorJson::from_error(error),
    };
    let rendered = if pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    };
    rendered.unwrap_or_else(|_| {
        format!(
            r#"{{"error":{{"error_code":"{}","message":"serialization failed"}}}}"#,
            error.error_code()
        )
    })
}
