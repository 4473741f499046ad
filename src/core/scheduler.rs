//! Refresh scheduling.
//!
//! The policy is chosen once, at construction time:
//! - [`RefreshPolicy::Interval`] keeps two periodic timers alive while the
//!   monitor is running.
//! - [`RefreshPolicy::Lazy`] keeps no timers; reads refresh on demand.
//!
//! Lifecycle of the interval policy:
//!
//! ```text
//! Idle ──start()──► Starting ──ok──► Running ──stop()──► Stopped
//!   ▲                  │                                   │
//!   └──────failure─────┘◄──────────────start()─────────────┘
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Default period of the main refresh timer.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(120);

/// Default lead of the preload timer over the main timer.
pub const DEFAULT_PRELOAD_OFFSET: Duration = Duration::from_secs(60);

/// How the monitor keeps its cache fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Background timers: a main refresh every `period`, and a preload
    /// refresh `preload_offset` after start, repeating every `period`.
    Interval {
        period: Duration,
        preload_offset: Duration,
    },
    /// No background work; stale or empty reads trigger a refresh.
    Lazy,
}

impl RefreshPolicy {
    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Interval { .. } => "interval",
            Self::Lazy => "lazy",
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::Interval {
            period: DEFAULT_REFRESH_INTERVAL,
            preload_offset: DEFAULT_PRELOAD_OFFSET,
        }
    }
}

/// What caused a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    MainTimer,
    PreloadTimer,
    Manual,
    Lazy,
}

impl RefreshTrigger {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::MainTimer => "main_timer",
            Self::PreloadTimer => "preload_timer",
            Self::Manual => "manual",
            Self::Lazy => "lazy",
        }
    }

    /// Whether the cycle re-reads the catalog before probing.
    ///
    /// Timer cycles probe the catalog found at start.
    #[must_use]
    pub const fn runs_discovery(&self) -> bool {
        !matches!(self, Self::MainTimer | Self::PreloadTimer)
    }
}

impl std::fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of the interval scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Starting,
    Running,
    Stopped,
}

/// The two periodic refresh tasks of a running monitor.
///
/// Dropping the set stops both timers.
#[derive(Debug)]
pub struct TimerSet {
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    /// Spawn the main and preload timers on the current runtime.
    ///
    /// The main timer first fires one `period` from now; the preload timer
    /// first fires after `preload_offset`. Both then repeat every `period`.
    /// A tick that finds the previous `on_tick` still running is delayed,
    /// not queued.
    pub fn spawn<F, Fut>(period: Duration, preload_offset: Duration, on_tick: F) -> Self
    where
        F: Fn(RefreshTrigger) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let now = Instant::now();

        let handles = vec![
            spawn_timer(
                now + period,
                period,
                RefreshTrigger::MainTimer,
                stop_rx.clone(),
                on_tick.clone(),
            ),
            spawn_timer(
                now + preload_offset,
                period,
                RefreshTrigger::PreloadTimer,
                stop_rx,
                on_tick,
            ),
        ];

        Self { stop_tx, handles }
    }

    /// Signal both timers to stop and abort any tick in progress.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(true);
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_timer<F, Fut>(
    first: Instant,
    period: Duration,
    trigger: RefreshTrigger,
    mut stop_rx: watch::Receiver<bool>,
    on_tick: F,
) -> JoinHandle<()>
where
    F: Fn(RefreshTrigger) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!(trigger = %trigger, "Refresh timer fired");
                    on_tick(trigger).await;
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!(trigger = %trigger, "Refresh timer stopped");
    })
}

/// Lifecycle bookkeeping for the interval policy.
///
/// Holds no async state itself; the monitor drives the transitions and
/// runs the startup cycle between [`begin_start`](Self::begin_start) and
/// [`finish_start`](Self::finish_start).
#[derive(Debug)]
pub struct Scheduler {
    state: SchedulerState,
    timers: Option<TimerSet>,
}

impl Scheduler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            timers: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Timers are live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// Move to `Starting`. Returns `false` when already starting or running.
    pub fn begin_start(&mut self) -> bool {
        match self.state {
            SchedulerState::Idle | SchedulerState::Stopped => {
                self.state = SchedulerState::Starting;
                true
            }
            SchedulerState::Starting | SchedulerState::Running => false,
        }
    }

    /// Complete a start. `spawn` is only called if no `stop()` arrived
    /// while starting. Returns whether the scheduler is now running.
    pub fn finish_start(&mut self, spawn: impl FnOnce() -> TimerSet) -> bool {
        if self.state != SchedulerState::Starting {
            return false;
        }
        self.timers = Some(spawn());
        self.state = SchedulerState::Running;
        true
    }

    /// Revert a failed start.
    pub fn fail_start(&mut self) {
        if self.state == SchedulerState::Starting {
            self.state = SchedulerState::Idle;
        }
    }

    /// Stop timers. A no-op while `Idle` or `Stopped`.
    ///
    /// Returns whether anything was stopped.
    pub fn stop(&mut self) -> bool {
        match self.state {
            SchedulerState::Idle | SchedulerState::Stopped => false,
            SchedulerState::Starting | SchedulerState::Running => {
                if let Some(timers) = self.timers.take() {
                    timers.stop();
                }
                self.state = SchedulerState::Stopped;
                true
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    fn recorder() -> (
        Arc<Mutex<Vec<(RefreshTrigger, Instant)>>>,
        impl Fn(RefreshTrigger) -> std::future::Ready<()> + Clone + Send + Sync + 'static,
    ) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let on_tick = move |trigger: RefreshTrigger| {
            sink.lock().unwrap().push((trigger, Instant::now()));
            std::future::ready(())
        };
        (fired, on_tick)
    }

    #[test]
    fn start_is_guarded() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.begin_start());
        assert!(!scheduler.begin_start(), "second start while starting");
        assert_eq!(scheduler.state(), SchedulerState::Starting);
        assert!(!scheduler.is_active());
    }

    #[test]
    fn failed_start_reverts_to_idle() {
        let mut scheduler = Scheduler::new();
        assert!(scheduler.begin_start());
        scheduler.fail_start();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.begin_start(), "can retry after failure");
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let mut scheduler = Scheduler::new();
        assert!(!scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_start_prevents_timers() {
        let (fired, on_tick) = recorder();
        let mut scheduler = Scheduler::new();
        assert!(scheduler.begin_start());
        assert!(scheduler.stop());

        let spawned = scheduler.finish_start(|| {
            TimerSet::spawn(Duration::from_secs(2), Duration::from_secs(1), on_tick)
        });
        assert!(!spawned);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timers_fire_at_offset_then_period() {
        let (fired, on_tick) = recorder();
        let start = Instant::now();
        let timers = TimerSet::spawn(Duration::from_secs(120), Duration::from_secs(60), on_tick);

        tokio::time::sleep(Duration::from_secs(250)).await;
        timers.stop();

        let fired = fired.lock().unwrap().clone();
        let offsets: Vec<(RefreshTrigger, u64)> = fired
            .iter()
            .map(|(trigger, at)| (*trigger, (*at - start).as_secs()))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (RefreshTrigger::PreloadTimer, 60),
                (RefreshTrigger::MainTimer, 120),
                (RefreshTrigger::PreloadTimer, 180),
                (RefreshTrigger::MainTimer, 240),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timers_never_fire_again() {
        let (fired, on_tick) = recorder();
        let mut scheduler = Scheduler::new();
        assert!(scheduler.begin_start());
        assert!(scheduler.finish_start(|| {
            TimerSet::spawn(Duration::from_secs(10), Duration::from_secs(5), on_tick)
        }));
        assert!(scheduler.is_active());

        tokio::time::sleep(Duration::from_secs(11)).await;
        let before = fired.lock().unwrap().len();
        assert_eq!(before, 2);

        assert!(scheduler.stop());
        assert!(!scheduler.is_active());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.lock().unwrap().len(), before);

        assert!(scheduler.begin_start(), "restart from stopped");
    }

    #[test]
    fn timer_triggers_skip_discovery() {
        assert!(!RefreshTrigger::MainTimer.runs_discovery());
        assert!(!RefreshTrigger::PreloadTimer.runs_discovery());
        assert!(RefreshTrigger::Manual.runs_discovery());
        assert!(RefreshTrigger::Lazy.runs_discovery());
        assert!(RefreshTrigger::Startup.runs_discovery());
    }
}
