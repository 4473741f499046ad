//! `status` command: read the snapshot, refreshing first when needed.

use crate::core::monitor::ModelMonitor;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the status command.
///
/// A fresh process always starts with an empty cache, so this runs one
/// discovery and probe cycle before printing.
///
/// # Errors
///
/// Returns an error if the monitor cannot be built, the cycle cannot store
/// its results, or rendering fails.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    let monitor = ModelMonitor::from_config(&config.monitor)?;
    let refreshed = monitor.ensure_fresh().await?;
    tracing::debug!(refreshed, "Status cache checked");

    let snapshot = monitor.snapshot();
    let output = render::render_snapshot(
        "status",
        &snapshot,
        config.format,
        config.pretty,
        config.no_color,
    )?;
    println!("{output}");
    Ok(())
}
