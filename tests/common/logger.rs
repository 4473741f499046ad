//! Structured test logging.
//!
//! ```rust,ignore
//! let log = TestLogger::new("probe_marks_rate_limited_model_offline");
//! log.phase("setup");
//! // ...
//! log.phase("verify");
//! log.finish_ok();
//! ```
//!
//! - `TEST_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//! - `TEST_LOG_JSON`: "1" or "true" for one JSON object per line

use std::cell::RefCell;
use std::env;
use std::fmt::Display;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    test: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u64>,
}

/// Per-test logger tracking phases and elapsed time.
pub struct TestLogger {
    name: String,
    start: Instant,
    phase: RefCell<Option<String>>,
    min_level: LogLevel,
    json: bool,
}

impl TestLogger {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let logger = Self {
            name: name.to_string(),
            start: Instant::now(),
            phase: RefCell::new(None),
            min_level: env::var("TEST_LOG_LEVEL")
                .ok()
                .and_then(|s| LogLevel::parse(&s))
                .unwrap_or(LogLevel::Info),
            json: env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        };
        logger.emit(LogLevel::Debug, "start", None);
        logger
    }

    pub fn phase(&self, phase: &str) {
        *self.phase.borrow_mut() = Some(phase.to_string());
        self.emit(LogLevel::Debug, &format!("phase: {phase}"), None);
    }

    pub fn debug(&self, message: impl Display) {
        self.emit(LogLevel::Debug, &message.to_string(), None);
    }

    pub fn info(&self, message: impl Display) {
        self.emit(LogLevel::Info, &message.to_string(), None);
    }

    pub fn http_request(&self, method: &str, url: &str) {
        self.emit(LogLevel::Debug, &format!("{method} {url}"), None);
    }

    pub fn finish_ok(&self) {
        let elapsed = self.elapsed_ms();
        self.emit(LogLevel::Info, "PASSED", Some(elapsed));
    }

    pub fn finish_err(&self, reason: impl Display) {
        let elapsed = self.elapsed_ms();
        self.emit(LogLevel::Error, &format!("FAILED: {reason}"), Some(elapsed));
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn emit(&self, level: LogLevel, message: &str, duration_ms: Option<u64>) {
        if level < self.min_level {
            return;
        }
        let phase = self.phase.borrow();
        if self.json {
            let entry = LogEntry {
                timestamp: Utc::now(),
                level,
                test: &self.name,
                message,
                phase: phase.as_deref(),
                duration_ms,
            };
            if let Ok(line) = serde_json::to_string(&entry) {
                eprintln!("{line}");
            }
            return;
        }
        let phase = phase.as_deref().map(|p| format!("[{p}] ")).unwrap_or_default();
        let duration = duration_ms.map(|ms| format!(" ({ms}ms)")).unwrap_or_default();
        eprintln!("{level:<5} {} {phase}{message}{duration}", self.name);
    }
}
