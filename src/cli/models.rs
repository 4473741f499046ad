//! `models` command: discovery only, no probes.

use crate::core::monitor::ModelMonitor;
use crate::error::Result;
use crate::render;
use crate::storage::config::ResolvedConfig;

/// Execute the models command.
///
/// # Errors
///
/// Returns an error if the monitor cannot be built or rendering fails.
/// Discovery failures are not errors; the built-in catalog is printed.
pub async fn execute(config: &ResolvedConfig) -> Result<()> {
    let monitor = ModelMonitor::from_config(&config.monitor)?;
    let catalog = monitor.discover_catalog().await?;
    let output = render::render_catalog(&catalog, config.format, config.pretty, config.no_color)?;
    println!("{output}");
    Ok(())
}
