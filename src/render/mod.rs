//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::core::classifier::ProbeKind;
use crate::core::models::{ModelCatalog, MonitorSnapshot, RefreshReport};
use crate::error::Result;

pub use error::render_error;

/// Render the read-contract snapshot. `command` names the envelope in JSON mode.
pub fn render_snapshot(
    command: &str,
    snapshot: &MonitorSnapshot,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_snapshot(snapshot, no_color)),
        OutputFormat::Json => robot::render_snapshot(command, snapshot, pretty),
    }
}

/// Render the result of a manual refresh.
pub fn render_refresh(
    report: &RefreshReport,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_refresh(report, no_color)),
        OutputFormat::Json => robot::render_refresh(report, pretty),
    }
}

pub fn render_catalog(
    catalog: &ModelCatalog,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_catalog(catalog, no_color)),
        OutputFormat::Json => robot::render_catalog(catalog, pretty),
    }
}

pub fn render_classification(
    rows: &[(String, ProbeKind)],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_classification(rows, no_color)),
        OutputFormat::Json => robot::render_classification(rows, pretty),
    }
}
