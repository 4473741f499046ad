//! The model availability monitor.
//!
//! [`ModelMonitor`] owns the catalog, the status cache and the refresh
//! scheduler, and exposes three contracts:
//! - read: [`ModelMonitor::snapshot`] / [`ModelMonitor::get_snapshot`]
//! - refresh: [`ModelMonitor::force_refresh`]
//! - lifecycle: [`ModelMonitor::start`], [`ModelMonitor::stop`],
//!   [`ModelMonitor::is_active`]
//!
//! Monitors are independent: each one has its own cache and timers, and
//! clones share the same instance.
//!
//! # Refresh serialization
//! At most one refresh cycle runs per monitor. Timer ticks that find a
//! cycle in flight are skipped. A forced refresh waits for the in-flight
//! cycle and returns its result instead of probing again.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::{Duration, Instant};

use super::batch::{BatchRunner, DEFAULT_BATCH_SIZE};
use super::discovery::discover;
use super::models::{ModelCatalog, MonitorSnapshot, RefreshReport};
use super::prober::{DEFAULT_PROBE_MAX_TOKENS, DEFAULT_PROBE_PROMPT, Prober};
use super::scheduler::{RefreshPolicy, RefreshTrigger, Scheduler, SchedulerState, TimerSet};
use super::upstream::{ModelApi, OpenAiCompatApi};
use crate::error::{MonitorError, Result};
use crate::storage::cache::{CacheStore, DEFAULT_CACHE_TTL};
use crate::storage::config::MonitorConfig;

const REFRESHED_MESSAGE: &str = "Model list refreshed successfully";
const JOINED_MESSAGE: &str = "Joined refresh already in flight";

/// Model availability monitor service.
#[derive(Clone)]
pub struct ModelMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn ModelApi>,
    runner: BatchRunner,
    cache: CacheStore,
    catalog: RwLock<ModelCatalog>,
    refresh_lock: tokio::sync::Mutex<()>,
    cycles: AtomicU64,
    last_report: Mutex<Option<RefreshReport>>,
    policy: RefreshPolicy,
    scheduler: Mutex<Scheduler>,
}

/// Builder for [`ModelMonitor`].
pub struct MonitorBuilder {
    api: Arc<dyn ModelApi>,
    batch_size: NonZeroUsize,
    max_concurrent_batches: Option<NonZeroUsize>,
    cache_ttl: Duration,
    policy: RefreshPolicy,
    prompt: String,
    max_tokens: u32,
}

impl MonitorBuilder {
    /// Models per batch. Zero is treated as one.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Batches allowed in flight at once; zero means unbounded.
    #[must_use]
    pub fn max_concurrent_batches(mut self, limit: usize) -> Self {
        self.max_concurrent_batches = NonZeroUsize::new(limit);
        self
    }

    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn probe_prompt(mut self, prompt: impl Into<String>, max_tokens: u32) -> Self {
        self.prompt = prompt.into();
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn build(self) -> ModelMonitor {
        let prober = Prober::new(self.api.clone()).with_prompt(self.prompt, self.max_tokens);
        let runner = BatchRunner::new(prober, self.batch_size, self.max_concurrent_batches);

        ModelMonitor {
            inner: Arc::new(Inner {
                api: self.api,
                runner,
                cache: CacheStore::new(self.cache_ttl),
                catalog: RwLock::new(ModelCatalog::default()),
                refresh_lock: tokio::sync::Mutex::new(()),
                cycles: AtomicU64::new(0),
                last_report: Mutex::new(None),
                policy: self.policy,
                scheduler: Mutex::new(Scheduler::new()),
            }),
        }
    }
}

impl ModelMonitor {
    /// Start building a monitor over `api` with default settings.
    #[must_use]
    pub fn builder(api: Arc<dyn ModelApi>) -> MonitorBuilder {
        MonitorBuilder {
            api,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            max_concurrent_batches: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            policy: RefreshPolicy::default(),
            prompt: DEFAULT_PROBE_PROMPT.to_string(),
            max_tokens: DEFAULT_PROBE_MAX_TOKENS,
        }
    }

    /// Build a monitor talking to the API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let api = OpenAiCompatApi::new(
            &config.api_base,
            config.api_key.clone(),
            config.probe_timeout,
            config.discovery_timeout,
        )?;
        Ok(Self::builder(Arc::new(api))
            .batch_size(config.batch_size)
            .max_concurrent_batches(config.max_concurrent_batches)
            .cache_ttl(config.cache_ttl)
            .policy(config.refresh_policy())
            .probe_prompt(config.probe_prompt.clone(), config.probe_max_tokens)
            .build())
    }

    // -------------------------------------------------------------------------
    // Read contract
    // -------------------------------------------------------------------------

    /// Current cache contents. Never touches the network.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.inner.cache.monitor_snapshot()
    }

    /// Current cache contents, refreshed first under the lazy policy if the
    /// cache is empty or stale.
    ///
    /// A failed lazy refresh is logged and the existing cache is served.
    pub async fn get_snapshot(&self) -> MonitorSnapshot {
        if self.inner.policy.is_lazy() {
            if let Err(err) = self.ensure_fresh().await {
                tracing::error!(error = %err, "Lazy refresh failed, serving cached statuses");
            }
        }
        self.snapshot()
    }

    /// Run one discovery and probe cycle if the cache is empty or stale.
    ///
    /// Returns whether a cycle ran. Concurrent callers share one cycle.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleFailed`] if the cycle could not store
    /// its results.
    pub async fn ensure_fresh(&self) -> Result<bool> {
        if !self.inner.cache.needs_refresh() {
            return Ok(false);
        }
        let _guard = self.inner.refresh_lock.lock().await;
        if !self.inner.cache.needs_refresh() {
            tracing::debug!("Cache refreshed while waiting, skipping lazy refresh");
            return Ok(false);
        }
        self.inner.run_cycle(RefreshTrigger::Lazy).await?;
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Refresh contract
    // -------------------------------------------------------------------------

    /// Rediscover the catalog and probe every model, ignoring staleness.
    ///
    /// If a cycle is already in flight, waits for it and returns its
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleFailed`] if the cycle could not store
    /// its results.
    pub async fn force_refresh(&self) -> Result<RefreshReport> {
        let seen = self.inner.cycles.load(Ordering::SeqCst);
        let _guard = self.inner.refresh_lock.lock().await;

        if self.inner.cycles.load(Ordering::SeqCst) != seen {
            if let Some(mut report) = self.inner.last_report() {
                tracing::info!(count = report.count, "Forced refresh joined in-flight cycle");
                report.message = JOINED_MESSAGE.to_string();
                return Ok(report);
            }
        }
        self.inner.run_cycle(RefreshTrigger::Manual).await
    }

    /// Run discovery alone and store the resulting catalog.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleFailed`] if the catalog lock is poisoned.
    pub async fn discover_catalog(&self) -> Result<ModelCatalog> {
        let catalog = discover(self.inner.api.as_ref()).await;
        self.inner.store_catalog(catalog.clone())?;
        Ok(catalog)
    }

    // -------------------------------------------------------------------------
    // Lifecycle contract
    // -------------------------------------------------------------------------

    /// Run the startup cycle and start the background timers.
    ///
    /// Idempotent while starting or running. Under the lazy policy no timers
    /// exist and this only logs.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::CycleFailed`] if there is no tokio runtime to
    /// host the timers or the startup cycle fails. The monitor is left idle.
    pub async fn start(&self) -> Result<()> {
        let RefreshPolicy::Interval {
            period,
            preload_offset,
        } = self.inner.policy
        else {
            tracing::info!("Lazy refresh policy, background monitoring not started");
            return Ok(());
        };

        let began = self.inner.scheduler().begin_start();
        if !began {
            tracing::debug!("Background monitoring already started");
            return Ok(());
        }

        if tokio::runtime::Handle::try_current().is_err() {
            self.inner.scheduler().fail_start();
            return Err(MonitorError::CycleFailed {
                reason: "no tokio runtime available to host refresh timers".to_string(),
            });
        }

        let startup = {
            let _guard = self.inner.refresh_lock.lock().await;
            self.inner.run_cycle(RefreshTrigger::Startup).await
        };
        if let Err(err) = startup {
            self.inner.scheduler().fail_start();
            tracing::error!(error = %err, "Failed to start background monitoring");
            return Err(err);
        }

        let weak = Arc::downgrade(&self.inner);
        let running = self
            .inner
            .scheduler()
            .finish_start(|| TimerSet::spawn(period, preload_offset, timer_callback(weak)));

        if running {
            tracing::info!(
                period_secs = period.as_secs(),
                preload_offset_secs = preload_offset.as_secs(),
                "Background monitoring started"
            );
        } else {
            tracing::info!("Monitor stopped during startup, timers not started");
        }
        Ok(())
    }

    /// Cancel the background timers. A no-op when not running.
    pub fn stop(&self) {
        if self.inner.scheduler().stop() {
            tracing::info!("Background monitoring stopped");
        } else {
            tracing::debug!("Stop requested while not running");
        }
    }

    /// Whether background timers are live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.scheduler().is_active()
    }

    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler().state()
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// The catalog the next timer cycle will probe.
    #[must_use]
    pub fn catalog(&self) -> ModelCatalog {
        self.inner.catalog()
    }

    /// Number of refresh cycles that stored results.
    #[must_use]
    pub fn cycles_completed(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn policy(&self) -> RefreshPolicy {
        self.inner.policy
    }
}

impl std::fmt::Debug for ModelMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMonitor")
            .field("policy", &self.inner.policy)
            .field("state", &self.scheduler_state())
            .field("cycles", &self.cycles_completed())
            .finish_non_exhaustive()
    }
}

type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn timer_callback(weak: Weak<Inner>) -> impl Fn(RefreshTrigger) -> TickFuture + Clone + Send + Sync {
    move |trigger| {
        let weak = weak.clone();
        Box::pin(async move {
            if let Some(inner) = weak.upgrade() {
                inner.refresh_if_idle(trigger).await;
            }
        })
    }
}

impl Inner {
    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog(&self) -> ModelCatalog {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_catalog(&self, catalog: ModelCatalog) -> Result<()> {
        let mut slot = self.catalog.write().map_err(|_| MonitorError::CycleFailed {
            reason: "model catalog lock poisoned".to_string(),
        })?;
        *slot = catalog;
        Ok(())
    }

    fn last_report(&self) -> Option<RefreshReport> {
        self.last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Timer entry point: run a cycle unless one is already in flight.
    async fn refresh_if_idle(&self, trigger: RefreshTrigger) {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            tracing::debug!(trigger = %trigger, "Refresh already in flight, skipping");
            return;
        };
        if let Err(err) = self.run_cycle(trigger).await {
            tracing::error!(trigger = %trigger, error = %err, "Scheduled refresh failed");
        }
    }

    /// One refresh cycle. Callers must hold `refresh_lock`.
    async fn run_cycle(&self, trigger: RefreshTrigger) -> Result<RefreshReport> {
        let start = Instant::now();
        tracing::info!(trigger = %trigger, "Refresh cycle started");

        let catalog = if trigger.runs_discovery() {
            let catalog = discover(self.api.as_ref()).await;
            self.store_catalog(catalog.clone())?;
            catalog
        } else {
            self.catalog()
        };

        let results = self.runner.run_all(&catalog).await;
        let statuses = self.cache.write(results)?;
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;

        let report = RefreshReport {
            success: true,
            models: catalog.to_vec(),
            count: catalog.len(),
            catalog_source: catalog.source(),
            message: REFRESHED_MESSAGE.to_string(),
            statuses,
        };
        *self.last_report.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());

        tracing::info!(
            trigger = %trigger,
            cycle,
            total = report.count,
            online = report.statuses.values().filter(|s| s.is_online()).count(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Refresh cycle complete"
        );
        Ok(report)
    }
}
