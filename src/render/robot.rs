//! Robot-mode output (JSON).
//!
//! Every command wraps its payload in the same envelope so scripts can
//! dispatch on `command` and pin `schemaVersion`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::classifier::ProbeKind;
use crate::core::models::{ModelCatalog, MonitorSnapshot, RefreshReport};
use crate::error::Result;

pub const SCHEMA_VERSION: &str = "modelwatch.v1";

/// Top-level JSON envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command: command.into(),
            data,
        }
    }
}

/// One row of `classify` output.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedModel<'a> {
    pub model: &'a str,
    pub probe: ProbeKind,
}

fn to_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(output)?)
    } else {
        Ok(serde_json::to_string(output)?)
    }
}

pub fn render_snapshot(
    command: &str,
    snapshot: &MonitorSnapshot,
    pretty: bool,
) -> Result<String> {
    to_json(&RobotOutput::new(command, snapshot), pretty)
}

pub fn render_refresh(report: &RefreshReport, pretty: bool) -> Result<String> {
    to_json(&RobotOutput::new("refresh", report), pretty)
}

pub fn render_catalog(catalog: &ModelCatalog, pretty: bool) -> Result<String> {
    to_json(&RobotOutput::new("models", catalog), pretty)
}

pub fn render_classification(rows: &[(String, ProbeKind)], pretty: bool) -> Result<String> {
    let data: Vec<ClassifiedModel<'_>> = rows
        .iter()
        .map(|(model, probe)| ClassifiedModel {
            model,
            probe: *probe,
        })
        .collect();
    to_json(&RobotOutput::new("classify", data), pretty)
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::core::models::{CacheSnapshot, CatalogSource, ProbeState, StatusStats};
    use crate::test_utils::make_test_status_map;

    fn snapshot() -> MonitorSnapshot {
        let data = make_test_status_map(&[
            ("gpt-4", ProbeState::Online),
            ("claude-3", ProbeState::Offline),
        ]);
        let now = Utc::now();
        MonitorSnapshot {
            stats: StatusStats::from_statuses(&data),
            cache: CacheSnapshot::compute(now, TimeDelta::seconds(120), now),
            data,
        }
    }

    #[test]
    fn snapshot_envelope_shape() {
        let json = render_snapshot("status", &snapshot(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(value["command"], "status");
        assert_eq!(value["data"]["stats"]["total"], 2);
        assert_eq!(value["data"]["stats"]["uptime"], "50.0");
        assert_eq!(value["data"]["data"]["gpt-4"]["status"], "online");
        assert_eq!(value["data"]["cache"]["isStale"], false);
    }

    #[test]
    fn pretty_output_is_multiline() {
        let catalog = ModelCatalog::new(["gpt-4"], CatalogSource::Upstream);
        let compact = render_catalog(&catalog, false).unwrap();
        let pretty = render_catalog(&catalog, true).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(value["data"]["source"], "upstream");
        assert_eq!(value["data"]["models"][0], "gpt-4");
    }

    #[test]
    fn classification_rows() {
        let rows = vec![
            ("gpt-4".to_string(), ProbeKind::Chat),
            ("whisper-1".to_string(), ProbeKind::NonChat),
        ];
        let value: serde_json::Value =
            serde_json::from_str(&render_classification(&rows, false).unwrap()).unwrap();
        assert_eq!(value["command"], "classify");
        assert_eq!(value["data"][1]["probe"], "non_chat");
    }
}
