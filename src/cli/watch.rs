//! `watch` command: background monitoring with periodic redraws.
//!
//! Starts the monitor's scheduler, re-renders the cached snapshot every
//! `interval`, and stops the scheduler on Ctrl+C.

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::core::monitor::ModelMonitor;
use crate::error::{MonitorError, Result};
use crate::render;
use crate::storage::config::ResolvedConfig;

/// State tracking across watch iterations.
#[derive(Debug, Default)]
pub struct WatchState {
    pub frames: u64,
    pub last_frame_at: Option<DateTime<Utc>>,
    /// Refresh cycles completed when the last frame was drawn.
    pub cycles_seen: u64,
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame. Returns whether a cycle finished since the last one.
    pub fn record(&mut self, cycles: u64) -> bool {
        let changed = self.frames == 0 || cycles != self.cycles_seen;
        self.frames += 1;
        self.cycles_seen = cycles;
        self.last_frame_at = Some(Utc::now());
        changed
    }
}

/// Execute the watch command until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the interval is zero, the startup cycle fails, or
/// rendering fails.
pub async fn execute(args: &WatchArgs, config: &ResolvedConfig) -> Result<()> {
    let redraw = Duration::from_secs(args.interval);
    if redraw.is_zero() {
        return Err(MonitorError::Config(
            "Watch interval must be greater than 0 seconds".to_string(),
        ));
    }

    let monitor = ModelMonitor::from_config(&config.monitor)?;

    // Ctrl+C handler for clean shutdown.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(());
    });

    run_watch(
        &monitor,
        redraw,
        async {
            let _ = shutdown_rx.await;
        },
        |frame| println!("{frame}"),
        config.format,
        config.pretty,
        config.no_color,
    )
    .await
}

/// Drive the watch loop until `shutdown` resolves, handing each rendered
/// frame to `emit`. The monitor is stopped before returning.
///
/// # Errors
///
/// Returns an error if the startup cycle fails or rendering fails.
pub async fn run_watch<S, E>(
    monitor: &ModelMonitor,
    redraw: Duration,
    shutdown: S,
    mut emit: E,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()>
where
    S: Future<Output = ()>,
    E: FnMut(String),
{
    monitor.start().await?;
    tracing::info!(
        policy = monitor.policy().label(),
        interval_secs = redraw.as_secs(),
        "Watching models"
    );

    let mut state = WatchState::new();
    let mut ticker = interval(redraw);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = render_frame(monitor, &mut state, &mut emit, format, pretty, no_color).await {
                    break Err(err);
                }
            }
            () = &mut shutdown => {
                tracing::debug!(frames = state.frames, "Watch interrupted");
                break render_frame(monitor, &mut state, &mut emit, format, pretty, no_color).await;
            }
        }
    };

    monitor.stop();
    outcome
}

async fn render_frame<E: FnMut(String)>(
    monitor: &ModelMonitor,
    state: &mut WatchState,
    emit: &mut E,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let snapshot = monitor.get_snapshot().await;
    if state.record(monitor.cycles_completed()) {
        tracing::debug!(cycles = state.cycles_seen, "New refresh results");
    }
    emit(render::render_snapshot(
        "watch", &snapshot, format, pretty, no_color,
    )?);
    Ok(())
}
