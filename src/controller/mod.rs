//! Refresh controller: the polling loop that owns the feed state.
//!
//! One spawned task runs the whole lifecycle, `Idle -> Fetching ->
//! (Ready | Retrying)`, cycling back to Fetching on the recurring interval,
//! on a scheduled retry, or on a manual refetch. Because each cycle is
//! awaited inline by that single task, overlapping fetch passes cannot
//! happen; interval ticks that fire mid-cycle are skipped, not queued.
//!
//! Consumers hold a [`FeedHandle`]: a watch channel carrying the latest
//! [`FeedState`] plus a command channel for refetch and shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::aggregator::Aggregator;
use crate::config::RefreshTuning;
use crate::domain::{ConsolidatedSnapshot, DataQuality};
use crate::fetchers::DomainFetcher;
use crate::validator::{self, ValidationReport};

/// Tuning for the retry-on-invalid-validation path.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Consecutive invalid cycles tolerated before settling best-effort.
    pub max_retries: u32,
    /// Linear backoff unit.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retry `attempt` (1-based): `base_delay * attempt`,
    /// saturating on overflow.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

/// Lifecycle phase of the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before the first fetch pass.
    Idle,
    /// A fetch pass is in progress.
    Fetching,
    /// Settled on the latest snapshot, waiting for the next trigger.
    Ready,
    /// Last pass validated invalid; another pass is scheduled.
    Retrying,
}

/// Consumer-visible feed state, replaced wholesale on every transition.
#[derive(Debug, Clone)]
pub struct FeedState {
    pub phase: Phase,
    /// Latest settled snapshot. Stays in place while a retry is pending, so
    /// consumers always keep something renderable.
    pub snapshot: Option<ConsolidatedSnapshot>,
    /// Fatal findings from the most recent validation pass.
    pub errors: Vec<String>,
    /// Non-fatal findings from the most recent validation pass.
    pub warnings: Vec<String>,
    /// Consecutive invalid cycles so far; zero after a valid one.
    pub attempts: u32,
}

impl FeedState {
    fn initial() -> Self {
        Self {
            phase: Phase::Idle,
            snapshot: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            attempts: 0,
        }
    }

    /// True while a fetch pass is in progress.
    pub fn loading(&self) -> bool {
        self.phase == Phase::Fetching
    }

    /// Instant the displayed snapshot was assembled.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot.as_ref().map(|s| s.last_updated)
    }

    /// Quality of the displayed snapshot.
    pub fn quality(&self) -> Option<DataQuality> {
        self.snapshot.as_ref().map(|s| s.quality)
    }
}

/// Action chosen after a validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Publish the snapshot and wait for the next trigger.
    Settle,
    /// Schedule another fetch pass after the delay.
    RetryAfter(Duration),
}

/// Decide what follows a validation pass.
///
/// `attempts` counts consecutive invalid cycles including the one just
/// finished. Valid snapshots settle immediately; invalid ones retry with
/// linear backoff until the attempt budget is spent, then settle
/// best-effort so consumers are never starved.
pub fn next_step(is_valid: bool, attempts: u32, policy: &RetryPolicy) -> NextStep {
    if is_valid || attempts >= policy.max_retries {
        NextStep::Settle
    } else {
        NextStep::RetryAfter(policy.delay_for(attempts))
    }
}

enum Command {
    Refetch,
    Shutdown,
}

enum Trigger {
    Tick,
    Retry,
    Cmd(Option<Command>),
}

/// Owns the refresh loop. Constructed and consumed by [`RefreshController::spawn`].
pub struct RefreshController {
    aggregator: Aggregator,
    policy: RetryPolicy,
    refresh_interval: Duration,
    state_tx: watch::Sender<FeedState>,
    commands: mpsc::Receiver<Command>,
    /// Last collected snapshot, published or not; seeds the next cycle.
    latest: Option<ConsolidatedSnapshot>,
    attempts: u32,
    retry_at: Option<Instant>,
}

impl RefreshController {
    /// Spawn the refresh loop over `fetchers` and hand back its handle.
    ///
    /// The first fetch pass starts immediately; the recurring interval
    /// begins one period later.
    pub fn spawn(fetchers: Vec<Arc<dyn DomainFetcher>>, tuning: &RefreshTuning) -> FeedHandle {
        let (state_tx, state_rx) = watch::channel(FeedState::initial());
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let controller = RefreshController {
            aggregator: Aggregator::new(fetchers, tuning.fetch_timeout),
            policy: RetryPolicy {
                max_retries: tuning.max_retries,
                base_delay: tuning.retry_base_delay,
            },
            refresh_interval: tuning.refresh_interval,
            state_tx,
            commands: cmd_rx,
            latest: None,
            attempts: 0,
            retry_at: None,
        };
        let task = tokio::spawn(controller.run());

        FeedHandle {
            state_rx,
            commands: cmd_tx,
            task: Some(task),
        }
    }

    async fn run(mut self) {
        info!(
            "Refresh loop started (interval: {}s, max retries: {})",
            self.refresh_interval.as_secs(),
            self.policy.max_retries
        );
        let mut ticker = interval_at(
            Instant::now() + self.refresh_interval,
            self.refresh_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Consumers should never wait a full interval for first data.
        self.cycle().await;

        loop {
            let trigger = if let Some(at) = self.retry_at {
                tokio::select! {
                    _ = ticker.tick() => Trigger::Tick,
                    _ = sleep_until(at) => Trigger::Retry,
                    cmd = self.commands.recv() => Trigger::Cmd(cmd),
                }
            } else {
                tokio::select! {
                    _ = ticker.tick() => Trigger::Tick,
                    cmd = self.commands.recv() => Trigger::Cmd(cmd),
                }
            };

            match trigger {
                Trigger::Tick => self.cycle().await,
                Trigger::Retry => {
                    self.retry_at = None;
                    self.cycle().await;
                }
                Trigger::Cmd(Some(Command::Refetch)) => {
                    // Manual refetch starts the attempt count over and
                    // drops any pending retry timer.
                    self.attempts = 0;
                    self.retry_at = None;
                    self.cycle().await;
                }
                Trigger::Cmd(Some(Command::Shutdown)) | Trigger::Cmd(None) => {
                    info!("Refresh loop shutting down");
                    break;
                }
            }
        }
    }

    /// One full pass: fetch, validate, then settle or schedule a retry.
    async fn cycle(&mut self) {
        self.state_tx.send_modify(|state| {
            state.phase = Phase::Fetching;
        });

        let mut snapshot = self.aggregator.collect(self.latest.as_ref()).await;
        let report = validator::validate(&snapshot);
        snapshot.quality = report.quality();
        self.latest = Some(snapshot.clone());

        if report.is_valid() {
            self.attempts = 0;
        } else {
            self.attempts += 1;
        }

        match next_step(report.is_valid(), self.attempts, &self.policy) {
            NextStep::Settle => {
                self.retry_at = None;
                if !report.is_valid() {
                    error!(
                        "Validation still failing after {} attempts, settling best-effort: {:?}",
                        self.attempts, report.errors
                    );
                }
                info!(
                    "Refresh cycle {} settled: quality {:?}, {}",
                    snapshot.update_id, snapshot.quality, snapshot.source
                );
                self.publish_settled(snapshot, report);
            }
            NextStep::RetryAfter(delay) => {
                self.retry_at = Some(Instant::now() + delay);
                warn!(
                    "Validation failed (attempt {}/{}), retrying in {:?}: {:?}",
                    self.attempts, self.policy.max_retries, delay, report.errors
                );
                self.publish_retrying(report);
            }
        }
    }

    fn publish_settled(&self, snapshot: ConsolidatedSnapshot, report: ValidationReport) {
        let attempts = self.attempts;
        self.state_tx.send_modify(|state| {
            state.phase = Phase::Ready;
            state.snapshot = Some(snapshot);
            state.errors = report.errors;
            state.warnings = report.warnings;
            state.attempts = attempts;
        });
    }

    fn publish_retrying(&self, report: ValidationReport) {
        let attempts = self.attempts;
        self.state_tx.send_modify(|state| {
            state.phase = Phase::Retrying;
            state.errors = report.errors;
            state.warnings = report.warnings;
            state.attempts = attempts;
        });
    }
}

/// Consumer handle to a running refresh loop.
///
/// Dropping the handle aborts the loop and its timers.
pub struct FeedHandle {
    state_rx: watch::Receiver<FeedState>,
    commands: mpsc::Sender<Command>,
    task: Option<JoinHandle<()>>,
}

impl FeedHandle {
    /// Current feed state.
    pub fn state(&self) -> FeedState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Reset the attempt counter and start a fetch pass now, cancelling any
    /// pending scheduled retry.
    pub async fn refetch(&self) {
        if self.commands.send(Command::Refetch).await.is_err() {
            warn!("Refresh loop is gone; refetch ignored");
        }
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CrewRoster, Domain, DomainData, DomainSnapshot, LaunchSchedule, MarsSeason, MarsSolReport,
        OrbitalPosition, SatelliteCensus, SnapshotSource, SpaceWeatherIndex,
    };
    use crate::errors::FetchResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticFetcher {
        origin: SnapshotSource,
        data: DomainData,
    }

    #[async_trait]
    impl DomainFetcher for StaticFetcher {
        fn domain(&self) -> Domain {
            self.data.domain()
        }

        fn origin(&self) -> SnapshotSource {
            self.origin
        }

        async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
            Ok(self.data.clone())
        }

        fn fallback(&self) -> DomainData {
            self.data.clone()
        }
    }

    /// Weather fetcher scripted per call; the last kp value repeats.
    struct ScriptedWeatherFetcher {
        script: Vec<f64>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DomainFetcher for ScriptedWeatherFetcher {
        fn domain(&self) -> Domain {
            Domain::SpaceWeather
        }

        fn origin(&self) -> SnapshotSource {
            SnapshotSource::Calculated
        }

        async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let kp = self.script[call.min(self.script.len() - 1)];
            Ok(DomainData::SpaceWeather(SpaceWeatherIndex {
                kp_index: kp,
                activity: SpaceWeatherIndex::activity_label(kp).to_string(),
            }))
        }

        fn fallback(&self) -> DomainData {
            DomainData::SpaceWeather(SpaceWeatherIndex {
                kp_index: 2.0,
                activity: "quiet".to_string(),
            })
        }
    }

    /// Full fetcher fleet: five in-band static domains plus the scripted
    /// weather domain. A kp of 10 makes a cycle validate invalid.
    fn fleet(weather_script: Vec<f64>, calls: Arc<AtomicUsize>) -> Vec<Arc<dyn DomainFetcher>> {
        vec![
            Arc::new(StaticFetcher {
                origin: SnapshotSource::Live,
                data: DomainData::Orbit(OrbitalPosition {
                    latitude: 12.3,
                    longitude: -45.6,
                    altitude_km: 420.0,
                    velocity_kmh: 27_559.0,
                    ground_track_km: None,
                    moving: false,
                }),
            }),
            Arc::new(StaticFetcher {
                origin: SnapshotSource::Live,
                data: DomainData::Crew(CrewRoster {
                    count: 7,
                    names: Vec::new(),
                }),
            }),
            Arc::new(ScriptedWeatherFetcher {
                script: weather_script,
                calls,
            }),
            Arc::new(StaticFetcher {
                origin: SnapshotSource::Calculated,
                data: DomainData::Satellites(SatelliteCensus {
                    active: 9_400,
                    tracked_debris: 29_000,
                }),
            }),
            Arc::new(StaticFetcher {
                origin: SnapshotSource::Calculated,
                data: DomainData::MarsSol(MarsSolReport {
                    sol: 54_100,
                    season: MarsSeason::Summer,
                    est_temp_c: -42.0,
                }),
            }),
            Arc::new(StaticFetcher {
                origin: SnapshotSource::Live,
                data: DomainData::Launch(LaunchSchedule {
                    mission: "Crew-12".to_string(),
                    vehicle: Some("Falcon 9".to_string()),
                    launch_at: Utc::now() + chrono::Duration::days(2),
                    countdown_s: 2 * 86_400,
                }),
            }),
        ]
    }

    fn tuning(interval_s: u64, base_delay_s: u64) -> RefreshTuning {
        RefreshTuning {
            refresh_interval: Duration::from_secs(interval_s),
            fetch_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(base_delay_s),
        }
    }

    #[test]
    fn test_next_step_applies_linear_backoff() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
        };
        assert_eq!(next_step(true, 0, &policy), NextStep::Settle);
        assert_eq!(
            next_step(false, 1, &policy),
            NextStep::RetryAfter(Duration::from_millis(2000))
        );
        assert_eq!(
            next_step(false, 2, &policy),
            NextStep::RetryAfter(Duration::from_millis(4000))
        );
        assert_eq!(next_step(false, 3, &policy), NextStep::Settle);
        assert_eq!(next_step(true, 2, &policy), NextStep::Settle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_settles_ready_with_high_quality() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = RefreshController::spawn(fleet(vec![3.0], Arc::clone(&calls)), &tuning(300, 2));
        let mut rx = handle.subscribe();

        let state = rx
            .wait_for(|s| s.phase == Phase::Ready)
            .await
            .unwrap()
            .clone();

        assert!(!state.loading());
        assert_eq!(state.attempts, 0);
        assert!(state.errors.is_empty());
        let snapshot = state.snapshot.unwrap();
        assert_eq!(snapshot.update_id, 1);
        assert_eq!(snapshot.quality, DataQuality::High);
        assert_eq!(snapshot.source, "3 live, 3 calculated, 0 fallback");
        assert_eq!(snapshot.domains.len(), Domain::ALL.len());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_triggers_follow_up_cycles() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = RefreshController::spawn(fleet(vec![3.0], Arc::clone(&calls)), &tuning(300, 2));
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.snapshot.as_ref().map_or(false, |x| x.update_id >= 1))
            .await
            .unwrap();

        // Virtual time advances through the 300 s interval.
        let state = rx
            .wait_for(|s| s.snapshot.as_ref().map_or(false, |x| x.update_id >= 3))
            .await
            .unwrap()
            .clone();

        let snapshot = state.snapshot.unwrap();
        assert!(snapshot.update_id >= 3);
        assert_eq!(snapshot.quality, DataQuality::High);
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_settles_best_effort_low() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle =
            RefreshController::spawn(fleet(vec![10.0], Arc::clone(&calls)), &tuning(300, 2));
        let mut rx = handle.subscribe();

        let state = rx
            .wait_for(|s| s.phase == Phase::Ready)
            .await
            .unwrap()
            .clone();

        // One initial pass plus two retries, then settle rather than hang.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.attempts, 3);
        assert!(!state.errors.is_empty());
        let snapshot = state.snapshot.unwrap();
        assert_eq!(snapshot.quality, DataQuality::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_cycle_resets_attempt_counter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle =
            RefreshController::spawn(fleet(vec![10.0, 3.0], Arc::clone(&calls)), &tuning(300, 2));
        let mut rx = handle.subscribe();

        let state = rx
            .wait_for(|s| s.phase == Phase::Ready)
            .await
            .unwrap()
            .clone();

        // Invalid first pass, then the scheduled retry recovers.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.attempts, 0);
        assert!(state.errors.is_empty());
        let snapshot = state.snapshot.unwrap();
        assert_eq!(snapshot.update_id, 2);
        assert_eq!(snapshot.quality, DataQuality::High);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_cancels_pending_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        // Retry is 60 s out; the interval far beyond that.
        let handle =
            RefreshController::spawn(fleet(vec![10.0, 3.0], Arc::clone(&calls)), &tuning(10_000, 60));
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.phase == Phase::Retrying).await.unwrap();
        handle.refetch().await;

        let state = rx
            .wait_for(|s| s.phase == Phase::Ready)
            .await
            .unwrap()
            .clone();
        assert_eq!(state.attempts, 0);
        assert_eq!(state.snapshot.unwrap().quality, DataQuality::High);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Past the cancelled retry deadline no extra pass ever runs.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_stays_renderable_while_retrying() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = RefreshController::spawn(
            fleet(vec![3.0, 10.0, 3.0], Arc::clone(&calls)),
            &tuning(300, 2),
        );
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.phase == Phase::Ready).await.unwrap();

        // Interval fires, the second pass validates invalid.
        let retrying = rx
            .wait_for(|s| s.phase == Phase::Retrying)
            .await
            .unwrap()
            .clone();
        assert!(!retrying.errors.is_empty());
        assert_eq!(retrying.attempts, 1);
        // The good snapshot from cycle one is still on display.
        let held = retrying.snapshot.unwrap();
        assert_eq!(held.update_id, 1);
        assert_eq!(held.quality, DataQuality::High);

        // The retry recovers and publishes a fresh snapshot.
        let state = rx
            .wait_for(|s| {
                s.phase == Phase::Ready
                    && s.snapshot.as_ref().map_or(false, |x| x.update_id >= 3)
            })
            .await
            .unwrap()
            .clone();
        assert_eq!(state.snapshot.unwrap().quality, DataQuality::High);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = RefreshController::spawn(fleet(vec![3.0], Arc::clone(&calls)), &tuning(300, 2));
        let mut rx = handle.subscribe();

        rx.wait_for(|s| s.phase == Phase::Ready).await.unwrap();
        handle.shutdown().await;

        // The loop is gone; no further cycles run.
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
