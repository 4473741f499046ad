//! Configuration loading and the status cache.

pub mod cache;
pub mod config;
pub mod paths;

pub use cache::{CacheStore, DEFAULT_CACHE_TTL};
pub use config::{
    Config, ConfigOverrides, ConfigSource, ConfigSources, ENV_API_BASE, ENV_API_KEY, ENV_CONFIG,
    ENV_REFRESH_MODE, MonitorConfig, RefreshMode, ResolvedConfig,
};
pub use paths::AppPaths;
