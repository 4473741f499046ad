//! Bulk probing of a whole catalog.
//!
//! The catalog is cut into fixed-size batches. Every probe runs as its own
//! tokio task and each batch settles all of its tasks before reporting, so
//! one failing or panicking probe only ever affects its own record.

use std::num::NonZeroUsize;
use std::time::Instant;

use futures::StreamExt;
use futures::future::join_all;
use tokio::task::{JoinError, JoinHandle};

use super::models::{ModelCatalog, ModelStatus, StatusMap};
use super::prober::Prober;

/// Default number of models probed together in one batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Fans probes out across a catalog.
#[derive(Clone)]
pub struct BatchRunner {
    prober: Prober,
    batch_size: NonZeroUsize,
    max_concurrent_batches: Option<NonZeroUsize>,
}

impl BatchRunner {
    /// Create a runner. `max_concurrent_batches = None` runs every batch at
    /// once, so up to `catalog.len()` probes may be in flight.
    #[must_use]
    pub const fn new(
        prober: Prober,
        batch_size: NonZeroUsize,
        max_concurrent_batches: Option<NonZeroUsize>,
    ) -> Self {
        Self {
            prober,
            batch_size,
            max_concurrent_batches,
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Probe every model in `catalog` and return one record per identifier.
    ///
    /// Never fails; the returned map's key set equals the catalog.
    pub async fn run_all(&self, catalog: &ModelCatalog) -> StatusMap {
        let models = catalog.to_vec();
        let batches: Vec<Vec<String>> = models
            .chunks(self.batch_size.get())
            .map(<[String]>::to_vec)
            .collect();

        tracing::info!(
            total = models.len(),
            batches = batches.len(),
            batch_size = self.batch_size.get(),
            "Probing catalog"
        );
        let start = Instant::now();

        let pending = batches
            .into_iter()
            .enumerate()
            .map(|(index, batch)| self.run_batch(index, batch));

        let settled: Vec<StatusMap> = match self.max_concurrent_batches {
            Some(limit) => {
                futures::stream::iter(pending)
                    .buffer_unordered(limit.get())
                    .collect()
                    .await
            }
            None => join_all(pending).await,
        };

        let mut merged = StatusMap::new();
        for batch in settled {
            for (model, status) in batch {
                merged.entry(model).or_insert(status);
            }
        }

        let online = merged.values().filter(|s| s.is_online()).count();
        tracing::info!(
            total = merged.len(),
            online,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Catalog probe complete"
        );

        merged
    }

    async fn run_batch(&self, index: usize, batch: Vec<String>) -> StatusMap {
        let mut tasks = ProbeTasks(
            batch
                .iter()
                .map(|model| {
                    let prober = self.prober.clone();
                    let model = model.clone();
                    tokio::spawn(async move { prober.probe(&model).await })
                })
                .collect(),
        );
        let results = join_all(tasks.0.iter_mut()).await;

        let statuses: StatusMap = batch
            .into_iter()
            .zip(results)
            .map(|(model, result)| {
                let status = result.unwrap_or_else(|err| {
                    let reason = describe_join_error(err);
                    tracing::warn!(model = %model, error = %reason, "Probe task failed");
                    ModelStatus::errored(&model, reason)
                });
                (model, status)
            })
            .collect();

        tracing::debug!(
            batch = index,
            size = statuses.len(),
            online = statuses.values().filter(|s| s.is_online()).count(),
            "Batch settled"
        );
        statuses
    }
}

/// Spawned probes of one batch. Dropping the batch future (for example when
/// `stop()` aborts the timer task mid-cycle) aborts any probe still running.
struct ProbeTasks(Vec<JoinHandle<ModelStatus>>);

impl Drop for ProbeTasks {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "probe task cancelled".to_string();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("probe task panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::models::{CatalogSource, ProbeState};
    use crate::test_utils::{FakeModelApi, FakeOutcome};

    fn runner(api: &Arc<FakeModelApi>, batch_size: usize, limit: Option<usize>) -> BatchRunner {
        BatchRunner::new(
            Prober::new(api.clone()),
            NonZeroUsize::new(batch_size).unwrap(),
            limit.and_then(NonZeroUsize::new),
        )
    }

    fn catalog(n: usize) -> ModelCatalog {
        ModelCatalog::new((0..n).map(|i| format!("gpt-test-{i:02}")), CatalogSource::Upstream)
    }

    #[tokio::test]
    async fn every_catalog_entry_gets_one_record() {
        for (size, batch) in [(0, 3), (1, 3), (7, 3), (9, 3), (10, 1), (4, 10)] {
            let cat = catalog(size);
            let api = Arc::new(FakeModelApi::new(cat.to_vec()));
            let statuses = runner(&api, batch, None).run_all(&cat).await;

            let keys: Vec<_> = statuses.keys().cloned().collect();
            assert_eq!(keys, cat.to_vec(), "size={size} batch={batch}");
            for model in cat.iter() {
                assert_eq!(api.chat_calls(model), 1, "{model} probed once");
            }
        }
    }

    #[tokio::test]
    async fn partial_failures_do_not_abort_siblings() {
        let cat = ModelCatalog::new(["gpt-4", "claude-3-haiku", "gemini-pro"], CatalogSource::Upstream);
        let api = Arc::new(
            FakeModelApi::new(cat.to_vec())
                .with_outcome("claude-3-haiku", FakeOutcome::status(500, "internal error")),
        );
        let statuses = runner(&api, 2, None).run_all(&cat).await;

        assert_eq!(statuses["gpt-4"].status, ProbeState::Online);
        assert_eq!(statuses["claude-3-haiku"].status, ProbeState::Offline);
        assert_eq!(statuses["gemini-pro"].status, ProbeState::Online);
    }

    #[tokio::test]
    async fn panicking_probe_becomes_error_record() {
        let cat = ModelCatalog::new(["gpt-4", "claude-3-haiku"], CatalogSource::Upstream);
        let api = Arc::new(FakeModelApi::new(cat.to_vec()).with_outcome("gpt-4", FakeOutcome::Panic));
        let statuses = runner(&api, 5, None).run_all(&cat).await;

        let broken = &statuses["gpt-4"];
        assert_eq!(broken.status, ProbeState::Error);
        assert!(broken.error.as_deref().unwrap().starts_with("probe task panicked"));
        assert_eq!(statuses["claude-3-haiku"].status, ProbeState::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_run_aborts_in_flight_tasks() {
        let cat = catalog(4);
        let api = Arc::new(FakeModelApi::new(cat.to_vec()).with_latency(std::time::Duration::from_secs(10)));
        let runner = runner(&api, 2, None);

        let cut_short =
            tokio::time::timeout(std::time::Duration::from_secs(1), runner.run_all(&cat)).await;
        assert!(cut_short.is_err());
        assert_eq!(api.total_chat_calls(), 4, "all probes were started");

        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(api.finished_chat_calls(), 0, "no probe outlives the run");
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_batches_run_together() {
        let cat = catalog(6);
        let api = Arc::new(FakeModelApi::new(cat.to_vec()).with_latency(std::time::Duration::from_millis(50)));
        runner(&api, 2, None).run_all(&cat).await;
        assert_eq!(api.max_in_flight(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_batch_limit_bounds_in_flight_probes() {
        let cat = catalog(6);
        let api = Arc::new(FakeModelApi::new(cat.to_vec()).with_latency(std::time::Duration::from_millis(50)));
        let statuses = runner(&api, 2, Some(1)).run_all(&cat).await;
        assert_eq!(statuses.len(), 6);
        assert_eq!(api.max_in_flight(), 2);
    }
}
