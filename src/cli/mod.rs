//! CLI argument parsing and command dispatch.

pub mod args;
pub mod classify;
pub mod models;
pub mod refresh;
pub mod status;
pub mod watch;

pub use args::{Cli, Commands, OutputFormat};
