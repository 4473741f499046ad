//! modelwatch - Model Availability Monitor
//!
//! Discovers the models an OpenAI-compatible inference API exposes, probes
//! each one in bounded batches, and serves the results from a TTL-bounded
//! status cache refreshed on a schedule or on demand.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use modelwatch::ModelMonitor;
//! use modelwatch::core::upstream::OpenAiCompatApi;
//!
//! # tokio_test::block_on(async {
//! let api = OpenAiCompatApi::new(
//!     "https://api.example.com/v1",
//!     None,
//!     Duration::from_secs(60),
//!     Duration::from_secs(30),
//! )?;
//! let monitor = ModelMonitor::builder(Arc::new(api)).build();
//! monitor.start().await?;
//!
//! let snapshot = monitor.get_snapshot().await;
//! println!("{}/{} online", snapshot.stats.online, snapshot.stats.total);
//!
//! monitor.stop();
//! # Ok::<(), modelwatch::MonitorError>(())
//! # }).unwrap();
//! ```

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod render;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use core::monitor::{ModelMonitor, MonitorBuilder};
pub use error::{ExitCode, MonitorError, Result};

// Re-export test utilities for external test crates
#[cfg(any(test, feature = "test-utils"))]
pub use test_utils::*;
