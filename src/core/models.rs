//! Core data models for model availability monitoring.
//!
//! These types are what every consumer of the monitor sees. Field names
//! serialize in camelCase so the JSON shape matches what dashboards built
//! against the status endpoint already expect.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Status map keyed by model identifier.
///
/// A `BTreeMap` keeps rendered output and JSON stable across cycles.
pub type StatusMap = BTreeMap<String, ModelStatus>;

// =============================================================================
// Model Status
// =============================================================================

/// Outcome of the most recent probe of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    /// The model answered the probe.
    Online,
    /// The probe ran and the upstream rejected it or never answered.
    Offline,
    /// The probe task itself failed (panicked or was cancelled).
    Error,
}

impl ProbeState {
    /// Lowercase label used in logs and human output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ProbeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One status record per known model identifier.
///
/// # Fields
/// - `model`: identifier, unique key in a [`StatusMap`].
/// - `status`: probe outcome.
/// - `last_checked`: when the probe that produced this record finished.
/// - `response`: short text returned on success.
/// - `error`: human-readable failure description.
///
/// `response` and `error` are mutually exclusive in practice; the
/// constructors below are the only places that set them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub model: String,
    pub status: ProbeState,
    pub last_checked: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelStatus {
    /// Record a successful probe.
    #[must_use]
    pub fn online(model: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status: ProbeState::Online,
            last_checked: Utc::now(),
            response: Some(response.into()),
            error: None,
        }
    }

    /// Record a probe the upstream rejected or never answered.
    #[must_use]
    pub fn offline(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status: ProbeState::Offline,
            last_checked: Utc::now(),
            response: None,
            error: Some(error.into()),
        }
    }

    /// Record a probe task that failed outside the prober's own handling.
    #[must_use]
    pub fn errored(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status: ProbeState::Error,
            last_checked: Utc::now(),
            response: None,
            error: Some(error.into()),
        }
    }

    /// Whether the model answered its last probe.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == ProbeState::Online
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Where the current catalog came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Returned by the upstream `GET /models` endpoint.
    Upstream,
    /// Built-in list substituted after a discovery failure.
    #[default]
    Fallback,
}

/// Set of model identifiers known to be queryable upstream.
///
/// Duplicates returned by the upstream collapse into one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    models: BTreeSet<String>,
    source: CatalogSource,
}

impl ModelCatalog {
    /// Build a catalog from any list of identifiers.
    #[must_use]
    pub fn new<I, S>(models: I, source: CatalogSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            source,
        }
    }

    /// Identifiers in stable (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(String::as_str)
    }

    /// Identifiers as an owned, sorted list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.models.iter().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, model: &str) -> bool {
        self.models.contains(model)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    #[must_use]
    pub const fn source(&self) -> CatalogSource {
        self.source
    }
}

// =============================================================================
// Cache Snapshot
// =============================================================================

/// Freshness view of the cache, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    /// When the last refresh cycle wrote to the cache.
    pub last_update: DateTime<Utc>,
    /// `last_update + ttl`.
    pub next_update: DateTime<Utc>,
    /// Whole seconds since `last_update`, never negative.
    pub age_seconds: u64,
    /// `age_seconds > ttl`.
    pub is_stale: bool,
}

impl CacheSnapshot {
    /// Derive the snapshot for `last_update` as seen at `now`.
    #[must_use]
    pub fn compute(last_update: DateTime<Utc>, ttl: TimeDelta, now: DateTime<Utc>) -> Self {
        let age_seconds = u64::try_from((now - last_update).num_seconds()).unwrap_or(0);
        let ttl_seconds = u64::try_from(ttl.num_seconds()).unwrap_or(0);
        Self {
            last_update,
            next_update: last_update
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            age_seconds,
            is_stale: age_seconds > ttl_seconds,
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Aggregate counts over a status map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStats {
    pub total: usize,
    pub online: usize,
    /// Everything that is not online, including `error` records.
    pub offline: usize,
    /// Online percentage with one decimal (`"66.7"`), or `"0"` when empty.
    pub uptime: String,
}

impl StatusStats {
    /// Compute stats for a status map.
    #[must_use]
    pub fn from_statuses(statuses: &StatusMap) -> Self {
        let total = statuses.len();
        let online = statuses.values().filter(|s| s.is_online()).count();
        Self {
            total,
            online,
            offline: total - online,
            uptime: format_uptime(online, total),
        }
    }
}

/// Percentage of online models with one decimal, ties rounded up.
fn format_uptime(online: usize, total: usize) -> String {
    if total == 0 {
        return "0".to_string();
    }
    let tenths = (online * 1000 + total / 2) / total;
    format!("{}.{}", tenths / 10, tenths % 10)
}

// =============================================================================
// Read / Refresh contract payloads
// =============================================================================

/// Everything a consumer of the read contract receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub data: StatusMap,
    pub stats: StatusStats,
    pub cache: CacheSnapshot,
}

/// Result of a manual refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    /// Always `true` in a report returned by the monitor; a failed cycle is
    /// reported as an error instead of a report.
    pub success: bool,
    /// Catalog the cycle probed.
    pub models: Vec<String>,
    pub count: usize,
    pub catalog_source: CatalogSource,
    pub message: String,
    /// Status map as stored after the cycle.
    pub statuses: StatusMap,
}
