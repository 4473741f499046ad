//! Configuration file loading and resolution.
//!
//! Loads configuration from:
//! - Linux: `~/.config/modelwatch/config.toml`
//! - macOS: `~/Library/Application Support/dev.modelwatch.modelwatch/config.toml`
//! - Windows: `%APPDATA%/modelwatch/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `MODELWATCH_API_BASE`: Upstream base URL
//! - `MODELWATCH_API_KEY` (or `OPENAI_API_KEY`): Bearer token
//! - `MODELWATCH_BATCH_SIZE`: Models per probe batch
//! - `MODELWATCH_MAX_CONCURRENT_BATCHES`: Batches in flight at once (0 = unbounded)
//! - `MODELWATCH_PROBE_TIMEOUT`: Chat probe timeout in seconds
//! - `MODELWATCH_DISCOVERY_TIMEOUT`: Model listing timeout in seconds
//! - `MODELWATCH_CACHE_TTL`: Seconds before the cache counts as stale
//! - `MODELWATCH_REFRESH_INTERVAL`: Seconds between timer refreshes
//! - `MODELWATCH_PRELOAD_OFFSET`: Seconds from start to the first preload refresh
//! - `MODELWATCH_REFRESH_MODE`: `interval`, `lazy` or `auto`
//! - `MODELWATCH_FORMAT`: Output format (human, json)
//! - `MODELWATCH_NO_COLOR` or `NO_COLOR`: Disable colors
//! - `MODELWATCH_PRETTY`: Pretty-print JSON output
//! - `MODELWATCH_CONFIG`: Override config file path

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat};
use crate::core::prober::{DEFAULT_PROBE_MAX_TOKENS, DEFAULT_PROBE_PROMPT};
use crate::core::scheduler::RefreshPolicy;
use crate::error::{MonitorError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

pub const ENV_API_BASE: &str = "MODELWATCH_API_BASE";
pub const ENV_API_KEY: &str = "MODELWATCH_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "OPENAI_API_KEY";
pub const ENV_BATCH_SIZE: &str = "MODELWATCH_BATCH_SIZE";
pub const ENV_MAX_CONCURRENT_BATCHES: &str = "MODELWATCH_MAX_CONCURRENT_BATCHES";
pub const ENV_PROBE_TIMEOUT: &str = "MODELWATCH_PROBE_TIMEOUT";
pub const ENV_DISCOVERY_TIMEOUT: &str = "MODELWATCH_DISCOVERY_TIMEOUT";
pub const ENV_CACHE_TTL: &str = "MODELWATCH_CACHE_TTL";
pub const ENV_REFRESH_INTERVAL: &str = "MODELWATCH_REFRESH_INTERVAL";
pub const ENV_PRELOAD_OFFSET: &str = "MODELWATCH_PRELOAD_OFFSET";
pub const ENV_REFRESH_MODE: &str = "MODELWATCH_REFRESH_MODE";
pub const ENV_FORMAT: &str = "MODELWATCH_FORMAT";
pub const ENV_NO_COLOR: &str = "MODELWATCH_NO_COLOR";
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
pub const ENV_PRETTY: &str = "MODELWATCH_PRETTY";
pub const ENV_CONFIG: &str = "MODELWATCH_CONFIG";

/// Variables set by hosts that cannot keep background timers alive.
pub const SERVERLESS_MARKERS: &[&str] = &["VERCEL", "AWS_LAMBDA_FUNCTION_NAME", "NETLIFY"];

pub const DEFAULT_API_BASE: &str = "https://samuraiapi.in/v1";

// =============================================================================
// Refresh mode
// =============================================================================

/// Refresh policy as written by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Background timers.
    Interval,
    /// Refresh on read when stale.
    Lazy,
    /// `lazy` on serverless hosts, `interval` elsewhere.
    #[default]
    Auto,
}

impl RefreshMode {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "interval" | "timer" => Some(Self::Interval),
            "lazy" | "on-demand" => Some(Self::Lazy),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Lazy => "lazy",
            Self::Auto => "auto",
        }
    }

    /// Replace `Auto` by a concrete mode, looking for serverless markers.
    #[must_use]
    pub fn resolve(self, env: &impl Fn(&str) -> Option<String>) -> Self {
        match self {
            Self::Auto => {
                let marker = SERVERLESS_MARKERS.iter().copied().find(|key| env(*key).is_some());
                if let Some(marker) = marker {
                    tracing::debug!(marker, "Serverless host detected, using lazy refresh");
                    Self::Lazy
                } else {
                    Self::Interval
                }
            }
            concrete => concrete,
        }
    }
}

// =============================================================================
// Config sources
// =============================================================================

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Tracks the source of each monitor setting.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub api_base: ConfigSource,
    pub api_key: ConfigSource,
    pub batch_size: ConfigSource,
    pub max_concurrent_batches: ConfigSource,
    pub probe_timeout: ConfigSource,
    pub discovery_timeout: ConfigSource,
    pub cache_ttl: ConfigSource,
    pub refresh_interval: ConfigSource,
    pub preload_offset: ConfigSource,
    pub refresh_mode: ConfigSource,
}

// =============================================================================
// Monitor configuration
// =============================================================================

/// Settings the CLI can override.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base: Option<String>,
    pub refresh_mode: Option<RefreshMode>,
}

impl ConfigOverrides {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            api_base: cli.api_base.clone(),
            refresh_mode: cli.mode,
        }
    }
}

/// Fully resolved monitor settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
    /// 0 means unbounded.
    pub max_concurrent_batches: usize,
    pub probe_timeout: Duration,
    pub discovery_timeout: Duration,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub preload_offset: Duration,
    /// Never `Auto` once resolved.
    pub refresh_mode: RefreshMode,
    pub probe_prompt: String,
    pub probe_max_tokens: u32,
    pub sources: ConfigSources,
}

impl MonitorConfig {
    /// Resolve from CLI overrides, the process environment and `file`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ConfigInvalid`] for unparsable or
    /// out-of-range values.
    pub fn resolve(overrides: &ConfigOverrides, file: &Config) -> Result<Self> {
        Self::resolve_with(overrides, file, &|key: &str| std::env::var(key).ok())
    }

    /// [`resolve`](Self::resolve) with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ConfigInvalid`] for unparsable or
    /// out-of-range values.
    pub fn resolve_with(
        overrides: &ConfigOverrides,
        file: &Config,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();
        let mut sources = ConfigSources::default();

        let api_base = match (&overrides.api_base, env(ENV_API_BASE), &file.api.base_url) {
            (Some(cli), _, _) => {
                sources.api_base = ConfigSource::Cli;
                cli.clone()
            }
            (None, Some(from_env), _) => {
                sources.api_base = ConfigSource::Env;
                from_env
            }
            (None, None, Some(from_file)) => {
                sources.api_base = ConfigSource::ConfigFile;
                from_file.clone()
            }
            (None, None, None) => DEFAULT_API_BASE.to_string(),
        };

        let api_key = if let Some(key) = env(ENV_API_KEY).or_else(|| env(ENV_API_KEY_FALLBACK)) {
            sources.api_key = ConfigSource::Env;
            Some(key)
        } else if let Some(key) = file.api.api_key.clone() {
            sources.api_key = ConfigSource::ConfigFile;
            Some(key)
        } else {
            None
        };

        let batch_size = layered(
            &env,
            ENV_BATCH_SIZE,
            (file.probe.batch_size, defaults.probe.batch_size),
            &mut sources.batch_size,
        )?;
        let max_concurrent_batches = layered(
            &env,
            ENV_MAX_CONCURRENT_BATCHES,
            (file.probe.max_concurrent_batches, defaults.probe.max_concurrent_batches),
            &mut sources.max_concurrent_batches,
        )?;
        let probe_timeout = layered_secs(
            &env,
            ENV_PROBE_TIMEOUT,
            (file.probe.timeout_seconds, defaults.probe.timeout_seconds),
            &mut sources.probe_timeout,
        )?;
        let discovery_timeout = layered_secs(
            &env,
            ENV_DISCOVERY_TIMEOUT,
            (file.api.discovery_timeout_seconds, defaults.api.discovery_timeout_seconds),
            &mut sources.discovery_timeout,
        )?;
        let cache_ttl = layered_secs(
            &env,
            ENV_CACHE_TTL,
            (file.cache.ttl_seconds, defaults.cache.ttl_seconds),
            &mut sources.cache_ttl,
        )?;
        let refresh_interval = layered_secs(
            &env,
            ENV_REFRESH_INTERVAL,
            (file.refresh.interval_seconds, defaults.refresh.interval_seconds),
            &mut sources.refresh_interval,
        )?;
        let preload_offset = layered_secs(
            &env,
            ENV_PRELOAD_OFFSET,
            (file.refresh.preload_offset_seconds, defaults.refresh.preload_offset_seconds),
            &mut sources.preload_offset,
        )?;

        let requested_mode = if let Some(mode) = overrides.refresh_mode {
            sources.refresh_mode = ConfigSource::Cli;
            mode
        } else if let Some(raw) = env(ENV_REFRESH_MODE) {
            sources.refresh_mode = ConfigSource::Env;
            RefreshMode::from_arg(&raw).ok_or_else(|| MonitorError::ConfigInvalid {
                key: ENV_REFRESH_MODE.to_string(),
                value: raw.clone(),
                message: "expected interval, lazy or auto".to_string(),
            })?
        } else {
            if file.refresh.mode != RefreshMode::default() {
                sources.refresh_mode = ConfigSource::ConfigFile;
            }
            file.refresh.mode
        };

        let config = Self {
            api_base,
            api_key,
            batch_size,
            max_concurrent_batches,
            probe_timeout,
            discovery_timeout,
            cache_ttl,
            refresh_interval,
            preload_offset,
            refresh_mode: requested_mode.resolve(&env),
            probe_prompt: file.probe.prompt.clone(),
            probe_max_tokens: file.probe.max_tokens,
            sources,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ConfigInvalid`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://")) {
            return Err(invalid(
                "api_base",
                &self.api_base,
                "must start with http:// or https://",
            ));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "0", "must be at least 1"));
        }
        for (key, value) in [
            ("probe_timeout", self.probe_timeout),
            ("discovery_timeout", self.discovery_timeout),
            ("cache_ttl", self.cache_ttl),
            ("refresh_interval", self.refresh_interval),
            ("preload_offset", self.preload_offset),
        ] {
            if value < Duration::from_secs(1) {
                return Err(invalid(key, &value.as_secs().to_string(), "must be at least 1 second"));
            }
        }
        if self.preload_offset >= self.refresh_interval {
            return Err(invalid(
                "preload_offset",
                &self.preload_offset.as_secs().to_string(),
                &format!(
                    "must be less than refresh_interval ({}s)",
                    self.refresh_interval.as_secs()
                ),
            ));
        }
        if self.probe_prompt.trim().is_empty() {
            return Err(invalid("probe.prompt", "", "must not be empty"));
        }
        Ok(())
    }

    /// The scheduler policy these settings describe.
    #[must_use]
    pub const fn refresh_policy(&self) -> RefreshPolicy {
        match self.refresh_mode {
            RefreshMode::Lazy => RefreshPolicy::Lazy,
            RefreshMode::Interval | RefreshMode::Auto => RefreshPolicy::Interval {
                period: self.refresh_interval,
                preload_offset: self.preload_offset,
            },
        }
    }
}

fn invalid(key: &str, value: &str, message: &str) -> MonitorError {
    MonitorError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

/// Env value if set, else the file value (which may be the default).
fn layered<T>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    (from_file, default): (T, T),
    source: &mut ConfigSource,
) -> Result<T>
where
    T: std::str::FromStr + PartialEq + Copy,
{
    if let Some(raw) = env(key) {
        *source = ConfigSource::Env;
        return raw
            .parse()
            .map_err(|_| invalid(key, &raw, "expected a non-negative integer"));
    }
    if from_file != default {
        *source = ConfigSource::ConfigFile;
    }
    Ok(from_file)
}

fn layered_secs(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    values: (u64, u64),
    source: &mut ConfigSource,
) -> Result<Duration> {
    layered(env, key, values, source).map(Duration::from_secs)
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// Monitor settings plus output preferences.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub monitor: MonitorConfig,
    pub format: OutputFormat,
    pub no_color: bool,
    pub pretty: bool,
    /// Config file that was read, if any.
    pub config_path: PathBuf,
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and
    /// config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or any
    /// resolved value is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config_path = std::env::var(ENV_CONFIG)
            .map_or_else(|_| Config::config_path(), PathBuf::from);
        let file = Config::load_from(&config_path)?;
        let monitor = MonitorConfig::resolve(&ConfigOverrides::from_cli(cli), &file)?;

        Ok(Self {
            monitor,
            format: Self::resolve_format(cli, &file)?,
            no_color: cli.no_color
                || is_env_truthy(ENV_NO_COLOR)
                || std::env::var(ENV_NO_COLOR_STD).is_ok()
                || !file.output.color,
            pretty: cli.pretty || is_env_truthy(ENV_PRETTY) || file.output.pretty,
            config_path,
        })
    }

    fn resolve_format(cli: &Cli, file: &Config) -> Result<OutputFormat> {
        if cli.json || cli.format != OutputFormat::Human {
            return Ok(cli.effective_format());
        }
        if let Ok(format_env) = std::env::var(ENV_FORMAT) {
            return parse_format(&format_env);
        }
        file.output.format.as_deref().map_or(Ok(OutputFormat::Human), parse_format)
    }
}

fn parse_format(s: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(s.trim(), true).map_err(|_| MonitorError::ConfigInvalid {
        key: "format".to_string(),
        value: s.to_string(),
        message: "valid formats: human, json".to_string(),
    })
}

fn is_env_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

// =============================================================================
// Config file
// =============================================================================

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub probe: ProbeConfig,
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub output: OutputConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub discovery_timeout_seconds: u64,
}

/// `[probe]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub batch_size: usize,
    /// 0 means unbounded.
    pub max_concurrent_batches: usize,
    pub timeout_seconds: u64,
    pub prompt: String,
    pub max_tokens: u32,
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

/// `[refresh]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub mode: RefreshMode,
    pub interval_seconds: u64,
    pub preload_offset_seconds: u64,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json).
    pub format: Option<String>,
    pub color: bool,
    pub pretty: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            discovery_timeout_seconds: 30,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::core::batch::DEFAULT_BATCH_SIZE,
            max_concurrent_batches: 0,
            timeout_seconds: crate::core::http::DEFAULT_TIMEOUT.as_secs(),
            prompt: DEFAULT_PROBE_PROMPT.to_string(),
            max_tokens: DEFAULT_PROBE_MAX_TOKENS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: super::cache::DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            mode: RefreshMode::Auto,
            interval_seconds: crate::core::scheduler::DEFAULT_REFRESH_INTERVAL.as_secs(),
            preload_offset_seconds: crate::core::scheduler::DEFAULT_PRELOAD_OFFSET.as_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MonitorError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }
}
