//! Metrics collection session
//!
//! One session spans a single task run: `start()` spawns a background
//! sampling thread, `stop()` signals it and joins before returning, so no
//! sampling activity ever outlives the session. The render loop shares
//! exactly two pieces of state with the sampler: the metric store and an
//! atomic frame counter.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use super::platform::PlatformSampler;
use super::store::{MetricKind, MetricStore};

/// Ceiling applied to the computed FPS value. Hardcoded: it is applied
/// even when the configured target frame rate is higher.
pub const FPS_CAP: f64 = 60.0;

/// Frame time recorded when an interval saw no frames at all.
pub const IDLE_FRAME_TIME_MS: f64 = 5000.0;

/// Lifecycle of a collection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

/// State shared with the sampling thread.
struct SessionShared {
    running: AtomicBool,
    frame_count: AtomicU64,
}

/// Owns the metric store, the platform sampler, and the sampling thread.
pub struct MetricsCollector {
    store: Arc<MetricStore>,
    sampler: Arc<Mutex<Box<dyn PlatformSampler>>>,
    shared: Arc<SessionShared>,
    sampling_interval: Duration,
    state: SessionState,
    started_at: Option<Instant>,
    worker: Option<JoinHandle<()>>,
}

impl MetricsCollector {
    /// A zero sampling interval would turn the loop into a busy spin, so
    /// it is rejected up front; the engine treats this as fatal.
    pub fn new(sampler: Box<dyn PlatformSampler>, sampling_interval: Duration) -> Result<Self> {
        if sampling_interval.is_zero() {
            anyhow::bail!("sampling interval must be positive");
        }
        trace!(interval_ms = sampling_interval.as_millis() as u64, "collector created");
        Ok(Self {
            store: Arc::new(MetricStore::new()),
            sampler: Arc::new(Mutex::new(sampler)),
            shared: Arc::new(SessionShared {
                running: AtomicBool::new(false),
                frame_count: AtomicU64::new(0),
            }),
            sampling_interval,
            state: SessionState::Idle,
            started_at: None,
            worker: None,
        })
    }

    pub fn store(&self) -> Arc<MetricStore> {
        Arc::clone(&self.store)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// One increment per rendered frame, called from the render loop.
    pub fn increment_frame_count(&self) {
        self.shared.frame_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_count(&self) -> u64 {
        self.shared.frame_count.load(Ordering::Relaxed)
    }

    /// Begin background sampling. Calling this while a session is already
    /// running is a caller error.
    pub fn start(&mut self) -> Result<()> {
        if self.state == SessionState::Running {
            anyhow::bail!("collection session is already running");
        }

        self.shared.frame_count.store(0, Ordering::Relaxed);
        self.shared.running.store(true, Ordering::Relaxed);
        self.started_at = Some(Instant::now());

        let shared = Arc::clone(&self.shared);
        let store = Arc::clone(&self.store);
        let sampler = Arc::clone(&self.sampler);
        let interval = self.sampling_interval;
        self.worker = Some(std::thread::spawn(move || {
            sampling_loop(&shared, &store, &sampler, interval);
        }));

        self.state = SessionState::Running;
        debug!("metrics collection started");
        Ok(())
    }

    /// Signal the sampling thread and block until it has exited. After
    /// this returns no further writes reach the store until the next
    /// `start()`.
    pub fn stop(&mut self) {
        if self.state != SessionState::Running {
            debug!(state = ?self.state, "stop requested outside a running session");
            return;
        }

        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("sampling thread panicked before join");
            }
        }
        self.state = SessionState::Stopped;

        let elapsed = self
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or_default();
        debug!(
            elapsed_secs = elapsed,
            frames = self.frame_count(),
            "metrics collection stopped"
        );
    }

    /// Discard collected series and reset the frame counter for the next
    /// run. Only valid between sessions.
    pub fn clear_metrics(&self) {
        if self.state == SessionState::Running {
            warn!("clear requested while collecting; ignoring");
            return;
        }
        self.store.clear();
        self.shared.frame_count.store(0, Ordering::Relaxed);
        trace!("metrics cleared for a new benchmark run");
    }
}

impl Drop for MetricsCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sampling_loop(
    shared: &SessionShared,
    store: &MetricStore,
    sampler: &Mutex<Box<dyn PlatformSampler>>,
    interval: Duration,
) {
    let mut last_fps_time = Instant::now();
    let mut last_frame_count = 0u64;

    trace!("sampling loop started");
    while shared.running.load(Ordering::Relaxed) {
        let tick_start = Instant::now();

        let elapsed_secs = tick_start.duration_since(last_fps_time).as_secs_f64();
        if elapsed_secs >= 1.0 {
            let frames = shared.frame_count.load(Ordering::Relaxed);
            let fps = fps_over_interval(frames.saturating_sub(last_frame_count), elapsed_secs);
            let frame_time = frame_time_ms(fps);

            store.record("FPS", fps, MetricKind::Gauge);
            store.record("Frame time (ms)", frame_time, MetricKind::Gauge);
            info!("FPS: {fps:.2}  -  Frame time: {frame_time:.2} ms");

            last_frame_count = frames;
            last_fps_time = tick_start;
        }

        let readings = sampler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sample();
        for reading in readings {
            store.record(&reading.name, reading.value, MetricKind::Gauge);
        }

        // Keep the tick cadence at the configured rate regardless of how
        // long the sampling work took; never sleep a negative duration.
        if let Some(sleep) = interval.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(sleep);
        }
    }
    trace!("sampling loop finished");
}

fn fps_over_interval(frames: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (frames as f64 / elapsed_secs).min(FPS_CAP)
}

fn frame_time_ms(fps: f64) -> f64 {
    if fps > 0.0 {
        1000.0 / fps
    } else {
        IDLE_FRAME_TIME_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::platform::Reading;

    struct StaticSampler;

    impl PlatformSampler for StaticSampler {
        fn name(&self) -> &'static str {
            "static"
        }

        fn sample(&mut self) -> Vec<Reading> {
            vec![Reading::new("stub", 1.0)]
        }
    }

    fn test_collector(interval_ms: u64) -> MetricsCollector {
        MetricsCollector::new(Box::new(StaticSampler), Duration::from_millis(interval_ms))
            .expect("collector")
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(MetricsCollector::new(Box::new(StaticSampler), Duration::ZERO).is_err());
    }

    #[test]
    fn fps_is_capped_at_sixty() {
        assert_eq!(fps_over_interval(1000, 1.0), 60.0);
        assert!((fps_over_interval(30, 1.0) - 30.0).abs() < f64::EPSILON);
        assert_eq!(fps_over_interval(10, 0.0), 0.0);
    }

    #[test]
    fn frame_time_uses_sentinel_when_idle() {
        assert!((frame_time_ms(60.0) - 16.666_666_666_666_668).abs() < 1e-9);
        assert_eq!(frame_time_ms(0.0), IDLE_FRAME_TIME_MS);
    }

    #[test]
    fn start_stop_transitions_and_joins() {
        let mut collector = test_collector(10);
        assert_eq!(collector.state(), SessionState::Idle);

        collector.start().expect("start");
        assert_eq!(collector.state(), SessionState::Running);
        std::thread::sleep(Duration::from_millis(80));

        collector.stop();
        assert_eq!(collector.state(), SessionState::Stopped);
        let recorded = collector.store().series_len("stub").expect("stub series");
        assert!(recorded >= 2, "expected several ticks, got {recorded}");
    }

    #[test]
    fn no_writes_after_stop_returns() {
        let mut collector = test_collector(5);
        collector.start().expect("start");
        std::thread::sleep(Duration::from_millis(40));
        collector.stop();

        let len_at_stop = collector.store().series_len("stub");
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(collector.store().series_len("stub"), len_at_stop);
    }

    #[test]
    fn session_can_restart_after_stop() {
        let mut collector = test_collector(5);
        collector.start().expect("first start");
        std::thread::sleep(Duration::from_millis(20));
        collector.stop();

        collector.clear_metrics();
        assert!(collector.store().is_empty());

        collector.start().expect("restart");
        std::thread::sleep(Duration::from_millis(20));
        collector.stop();
        assert!(collector.store().series_len("stub").is_some());
    }

    #[test]
    fn double_start_is_rejected() {
        let mut collector = test_collector(50);
        collector.start().expect("start");
        assert!(collector.start().is_err());
        collector.stop();
    }

    #[test]
    fn clear_is_refused_while_running() {
        let mut collector = test_collector(5);
        collector.start().expect("start");
        std::thread::sleep(Duration::from_millis(30));

        collector.clear_metrics();
        assert!(
            collector.store().series_len("stub").is_some(),
            "running session must not be cleared"
        );
        collector.stop();
    }

    #[test]
    fn frame_counter_counts_increments() {
        let collector = test_collector(50);
        for _ in 0..5 {
            collector.increment_frame_count();
        }
        assert_eq!(collector.frame_count(), 5);
    }
}
