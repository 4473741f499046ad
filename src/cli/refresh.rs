//! `refresh` command: rediscover and probe every model now.

use crate::core::monitor::ModelMonitor;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the refresh command.
///
/// # Errors
///
/// Returns [`crate::MonitorError::CycleFailed`] when the cycle did not
/// complete, which maps to a non-zero exit code.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    let monitor = ModelMonitor::from_config(&config.monitor)?;
    let report = monitor.force_refresh().await?;

    let output = render::render_refresh(&report, config.format, config.pretty, config.no_color)?;
    println!("{output}");
    Ok(())
}
