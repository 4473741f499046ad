//! In-memory status cache.
//!
//! Holds the latest [`StatusMap`] and the time of the last refresh write.
//! Every consumer reads from here; only refresh cycles write.
//!
//! # Memory model
//! - One `RwLock` guards the map and the timestamp together.
//! - A refresh cycle writes once, after all of its probes have settled, so a
//!   reader sees either the complete previous cycle or the complete new one.
//! - Entries from earlier cycles stay until a later cycle overwrites them.
//! - Reads clone out of the lock; no caller ever holds the guard.
//! - Reads never fail. Only [`CacheStore::write`] reports a poisoned lock.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::core::models::{CacheSnapshot, MonitorSnapshot, StatusMap, StatusStats};
use crate::error::{MonitorError, Result};

/// Default time-to-live for cached statuses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

#[derive(Debug)]
struct CacheState {
    statuses: StatusMap,
    last_update: DateTime<Utc>,
    writes: u64,
}

/// Latest-snapshot status cache with TTL-based staleness.
#[derive(Debug)]
pub struct CacheStore {
    state: RwLock<CacheState>,
    ttl: TimeDelta,
}

impl CacheStore {
    /// Create an empty cache.
    ///
    /// The refresh timestamp starts at construction time, so a new cache is
    /// empty but not stale; callers decide freshness on emptiness as well.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                statuses: StatusMap::new(),
                last_update: Utc::now(),
                writes: 0,
            }),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Freshness view as of now.
    #[must_use]
    pub fn snapshot(&self) -> CacheSnapshot {
        self.snapshot_at(Utc::now())
    }

    /// Freshness view as of `now`.
    #[must_use]
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> CacheSnapshot {
        CacheSnapshot::compute(self.read_state().last_update, self.ttl, now)
    }

    /// Copy of the current status map.
    #[must_use]
    pub fn read(&self) -> StatusMap {
        self.read_state().statuses.clone()
    }

    /// Stats over the current status map.
    #[must_use]
    pub fn stats(&self) -> StatusStats {
        StatusStats::from_statuses(&self.read_state().statuses)
    }

    /// Data, stats and freshness taken under one read lock.
    #[must_use]
    pub fn monitor_snapshot(&self) -> MonitorSnapshot {
        let now = Utc::now();
        let state = self.read_state();
        MonitorSnapshot {
            data: state.statuses.clone(),
            stats: StatusStats::from_statuses(&state.statuses),
            cache: CacheSnapshot::compute(state.last_update, self.ttl, now),
        }
    }

    /// Merge `results` into the cache and reset the refresh timestamp.
    ///
    /// Returns the full map as stored after the merge.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleFailed`] if a writer panicked mid-write.
    pub fn write(&self, results: StatusMap) -> Result<StatusMap> {
        self.write_at(results, Utc::now())
    }

    /// [`write`](Self::write) with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleFailed`] if a writer panicked mid-write.
    pub fn write_at(&self, results: StatusMap, at: DateTime<Utc>) -> Result<StatusMap> {
        let written = results.len();
        let mut state = self.write_state()?;
        state.statuses.extend(results);
        state.last_update = at;
        state.writes += 1;

        tracing::info!(
            written,
            total = state.statuses.len(),
            at = %at.to_rfc3339(),
            "Cache updated"
        );
        Ok(state.statuses.clone())
    }

    /// Whether the cache holds no statuses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_state().statuses.is_empty()
    }

    /// Whether a refresh is due: the cache is empty or older than its TTL.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        let now = Utc::now();
        let state = self.read_state();
        state.statuses.is_empty() || CacheSnapshot::compute(state.last_update, self.ttl, now).is_stale
    }

    /// Number of completed writes since construction.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.read_state().writes
    }

    // A poisoned lock still holds the last complete write; readers keep
    // serving it while writers refuse.
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, CacheState>> {
        self.state.write().map_err(|_| MonitorError::CycleFailed {
            reason: "status cache lock poisoned".to_string(),
        })
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeState;
    use crate::test_utils::make_test_status_map;

    #[test]
    fn new_cache_is_empty_and_not_stale() {
        let cache = CacheStore::default();
        assert!(cache.is_empty());
        assert!(!cache.snapshot().is_stale);
        assert!(cache.needs_refresh(), "empty cache needs a refresh");
        assert_eq!(cache.stats().uptime, "0");
    }

    #[test]
    fn write_resets_staleness() {
        let cache = CacheStore::new(Duration::from_secs(120));
        let old = Utc::now() - TimeDelta::seconds(600);
        cache
            .write_at(make_test_status_map(&[("gpt-4", ProbeState::Online)]), old)
            .unwrap();
        assert!(cache.snapshot().is_stale);
        assert!(cache.needs_refresh());

        cache
            .write(make_test_status_map(&[("gpt-4", ProbeState::Offline)]))
            .unwrap();
        let snapshot = cache.snapshot();
        assert!(!snapshot.is_stale);
        assert!(snapshot.age_seconds <= 1);
        assert!(!cache.needs_refresh());
    }

    #[test]
    fn staleness_is_monotonic_after_ttl() {
        let cache = CacheStore::new(Duration::from_secs(120));
        let written = Utc::now();
        cache
            .write_at(make_test_status_map(&[("gpt-4", ProbeState::Online)]), written)
            .unwrap();

        let mut seen_stale = false;
        for secs in (0..=600).step_by(7) {
            let snapshot = cache.snapshot_at(written + TimeDelta::seconds(secs));
            assert_eq!(snapshot.age_seconds, u64::try_from(secs).unwrap());
            if seen_stale {
                assert!(snapshot.is_stale, "stale flag cleared at {secs}s");
            }
            seen_stale |= snapshot.is_stale;
            assert_eq!(snapshot.is_stale, secs > 120);
        }
        assert!(seen_stale);
    }

    #[test]
    fn writes_merge_with_previous_entries() {
        let cache = CacheStore::default();
        cache
            .write(make_test_status_map(&[
                ("gpt-4", ProbeState::Online),
                ("retired-model", ProbeState::Online),
            ]))
            .unwrap();
        let stored = cache
            .write(make_test_status_map(&[("gpt-4", ProbeState::Offline)]))
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored["gpt-4"].status, ProbeState::Offline);
        assert_eq!(stored["retired-model"].status, ProbeState::Online);
        assert_eq!(cache.write_count(), 2);
    }

    #[test]
    fn monitor_snapshot_is_consistent() {
        let cache = CacheStore::default();
        cache
            .write(make_test_status_map(&[
                ("gpt-4", ProbeState::Online),
                ("claude-3-haiku", ProbeState::Online),
                ("whisper-1", ProbeState::Offline),
            ]))
            .unwrap();

        let snapshot = cache.monitor_snapshot();
        assert_eq!(snapshot.data.len(), 3);
        assert_eq!(snapshot.stats.total, 3);
        assert_eq!(snapshot.stats.online, 2);
        assert_eq!(snapshot.stats.uptime, "66.7");
        assert_eq!(snapshot.cache.next_update, snapshot.cache.last_update + cache.ttl());
    }

    #[test]
    fn poisoned_lock_fails_writes_but_serves_reads() {
        let cache = std::sync::Arc::new(CacheStore::default());
        cache
            .write(make_test_status_map(&[("gpt-4", ProbeState::Online)]))
            .unwrap();

        let writer = cache.clone();
        let joined = std::thread::spawn(move || {
            let _guard = writer.state.write().unwrap();
            panic!("writer died");
        })
        .join();
        assert!(joined.is_err());

        assert_eq!(cache.read().len(), 1);
        let err = cache.write(StatusMap::new()).unwrap_err();
        assert!(matches!(err, MonitorError::CycleFailed { .. }));
    }
}
