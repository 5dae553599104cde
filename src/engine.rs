//! Benchmark orchestration
//!
//! Runs each render task for a fixed wall-clock duration with the frame
//! loop paced to the configured target rate, while the collection session
//! samples in the background. The two loops only meet through the metric
//! store and the frame counter; `start`/`stop` bracket every task run so
//! the store is quiescent whenever it is cleared or aggregated.

use anyhow::Result;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::RunSettings;
use crate::display::DisplayContext;
use crate::environment;
use crate::metrics::platform::select_sampler;
use crate::metrics::MetricsCollector;
use crate::report::BenchmarkReport;
use crate::tasks::RenderTask;

/// Failures that abort the run before any task executes. Everything else
/// is absorbed at the task or reading it belongs to.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to initialize display context")]
    DisplayInit(#[source] anyhow::Error),

    #[error("failed to construct metrics collector")]
    Collector(#[source] anyhow::Error),
}

pub struct BenchmarkEngine {
    display: Box<dyn DisplayContext>,
    collector: MetricsCollector,
    tasks: Vec<Box<dyn RenderTask>>,
    settings: RunSettings,
    report: BenchmarkReport,
}

impl BenchmarkEngine {
    /// Bring up the display and the collector, capture the static
    /// environment, and register the task sequence.
    pub fn initialize(
        mut display: Box<dyn DisplayContext>,
        tasks: Vec<Box<dyn RenderTask>>,
        settings: RunSettings,
    ) -> Result<Self, EngineError> {
        display.initialize().map_err(EngineError::DisplayInit)?;

        let sampler = select_sampler(settings.platform);
        let collector = MetricsCollector::new(sampler, settings.sampling_interval)
            .map_err(EngineError::Collector)?;

        let report = BenchmarkReport::new(environment::collect(display.as_ref(), &settings));

        for task in &tasks {
            debug!(task = task.name(), "task registered");
        }

        debug!("benchmark engine initialized");
        Ok(Self {
            display,
            collector,
            tasks,
            settings,
            report,
        })
    }

    /// Run every registered task in sequence and return the completed
    /// report.
    pub fn run(mut self) -> Result<BenchmarkReport> {
        let mut tasks = std::mem::take(&mut self.tasks);
        if tasks.is_empty() {
            warn!("no render tasks selected, report will be empty");
        }

        let duration = self.settings.duration;
        for task in tasks.iter_mut() {
            self.run_one(task.as_mut(), duration)?;
        }

        Ok(self.report)
    }

    /// Run a single task for `duration`. A setup failure skips the task;
    /// a frame failure aborts only this task's loop. Returns whether a
    /// report section was produced.
    fn run_one(&mut self, task: &mut dyn RenderTask, duration: Duration) -> Result<bool> {
        info!(
            task = task.name(),
            secs = duration.as_secs_f64(),
            "running benchmark task"
        );

        if let Err(err) = task.setup() {
            warn!(task = task.name(), %err, "task setup failed, skipping");
            task.teardown();
            return Ok(false);
        }

        self.collector.clear_metrics();
        self.collector.start()?;

        let frame_budget = frame_budget(self.settings.target_frame_rate);
        let start = Instant::now();
        let deadline = start + duration;
        let mut previous_frame = start;

        while Instant::now() < deadline {
            let frame_start = Instant::now();
            let elapsed_ms = frame_start.duration_since(start).as_secs_f64() * 1000.0;
            let delta_ms = frame_start.duration_since(previous_frame).as_secs_f64() * 1000.0;
            previous_frame = frame_start;

            task.update(elapsed_ms, delta_ms);
            if let Err(err) = task.render(self.display.width(), self.display.height()) {
                error!(task = task.name(), %err, "frame failed, aborting task run");
                break;
            }

            self.display.present();
            self.collector.increment_frame_count();

            if let Some(budget) = frame_budget {
                if let Some(sleep) = budget.checked_sub(frame_start.elapsed()) {
                    std::thread::sleep(sleep);
                }
            }
        }

        self.collector.stop();
        task.teardown();

        self.report
            .add_section(task.name(), self.collector.store().snapshot());
        info!(
            task = task.name(),
            frames = self.collector.frame_count(),
            "benchmark run completed"
        );
        Ok(true)
    }
}

/// Per-frame time budget for the target rate; `None` means render as fast
/// as possible.
fn frame_budget(target_frame_rate: u32) -> Option<Duration> {
    if target_frame_rate == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(1.0 / f64::from(target_frame_rate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HeadlessDisplay;
    use crate::metrics::platform::Platform;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct NoopTask {
        name: String,
    }

    impl NoopTask {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
            }
        }
    }

    impl RenderTask for NoopTask {
        fn name(&self) -> &str {
            &self.name
        }

        fn setup(&mut self) -> Result<()> {
            Ok(())
        }

        fn update(&mut self, _elapsed_ms: f64, _delta_ms: f64) {}

        fn render(&mut self, _width: u32, _height: u32) -> Result<()> {
            Ok(())
        }

        fn teardown(&mut self) {}
    }

    struct FailingSetupTask;

    impl RenderTask for FailingSetupTask {
        fn name(&self) -> &str {
            "FailingSetup"
        }

        fn setup(&mut self) -> Result<()> {
            anyhow::bail!("resources unavailable")
        }

        fn update(&mut self, _elapsed_ms: f64, _delta_ms: f64) {}

        fn render(&mut self, _width: u32, _height: u32) -> Result<()> {
            panic!("render must not run after failed setup");
        }

        fn teardown(&mut self) {}
    }

    /// Records the wall-clock start of every frame it renders.
    struct FrameClockTask {
        stamps: Arc<Mutex<Vec<Instant>>>,
    }

    impl RenderTask for FrameClockTask {
        fn name(&self) -> &str {
            "FrameClock"
        }

        fn setup(&mut self) -> Result<()> {
            Ok(())
        }

        fn update(&mut self, _elapsed_ms: f64, _delta_ms: f64) {}

        fn render(&mut self, _width: u32, _height: u32) -> Result<()> {
            self.stamps
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(Instant::now());
            Ok(())
        }

        fn teardown(&mut self) {}
    }

    fn settings(duration_ms: u64, sampling_ms: u64, target_fps: u32) -> RunSettings {
        RunSettings {
            duration: Duration::from_millis(duration_ms),
            sampling_interval: Duration::from_millis(sampling_ms),
            target_frame_rate: target_fps,
            window_width: 64,
            window_height: 48,
            platform: Platform::Generic,
            output_dir: PathBuf::from("/tmp"),
        }
    }

    fn engine(tasks: Vec<Box<dyn RenderTask>>, settings: RunSettings) -> BenchmarkEngine {
        BenchmarkEngine::initialize(Box::new(HeadlessDisplay::new(64, 48)), tasks, settings)
            .expect("engine init")
    }

    #[test]
    fn frame_budget_is_none_when_unthrottled() {
        assert_eq!(frame_budget(0), None);
        let budget = frame_budget(60).expect("budget");
        assert!((budget.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn two_second_run_collects_samples_and_aggregates() {
        let engine = engine(
            vec![Box::new(NoopTask::new("Noop"))],
            settings(2_000, 500, 60),
        );
        let report = engine.run().expect("run");

        assert_eq!(report.results.len(), 1);
        let section = &report.results[0];
        assert_eq!(section.task, "Noop");

        let fps = section.metrics.get("FPS").expect("FPS series");
        assert!(!fps.values.is_empty());
        assert!(fps.minimum.is_some() && fps.maximum.is_some());
        assert!(fps.average.is_some() && fps.std_dev.is_some());

        let frame_time = section
            .metrics
            .get("Frame time (ms)")
            .expect("frame time series");
        assert!(!frame_time.values.is_empty());

        // The generic sampler ticks at 500ms over 2s: at least 3 samples.
        let cpu = section.metrics.get("CPU load").expect("CPU load series");
        assert!(cpu.values.len() >= 3, "got {} samples", cpu.values.len());
    }

    #[test]
    fn setup_failure_skips_task_but_not_sequence() {
        let engine = engine(
            vec![
                Box::new(FailingSetupTask),
                Box::new(NoopTask::new("Survivor")),
            ],
            settings(100, 20, 0),
        );
        let report = engine.run().expect("run");

        let names: Vec<&str> = report.results.iter().map(|s| s.task.as_str()).collect();
        assert_eq!(names, vec!["Survivor"]);
    }

    #[test]
    fn target_rate_paces_consecutive_frames() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let engine = engine(
            vec![Box::new(FrameClockTask {
                stamps: Arc::clone(&stamps),
            })],
            settings(300, 50, 60),
        );
        engine.run().expect("run");

        let stamps = stamps.lock().unwrap_or_else(|e| e.into_inner());
        assert!(stamps.len() >= 2, "expected multiple frames");
        for pair in stamps.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap >= Duration::from_millis(15),
                "frame gap underran the 60Hz budget: {gap:?}"
            );
        }
    }

    #[test]
    fn zero_target_rate_runs_unthrottled() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let engine = engine(
            vec![Box::new(FrameClockTask {
                stamps: Arc::clone(&stamps),
            })],
            settings(100, 50, 0),
        );
        engine.run().expect("run");

        let count = stamps.lock().unwrap_or_else(|e| e.into_inner()).len();
        assert!(count > 50, "unthrottled loop only produced {count} frames");
    }

    #[test]
    fn cleared_store_isolates_task_sections() {
        let engine = engine(
            vec![
                Box::new(NoopTask::new("First")),
                Box::new(NoopTask::new("Second")),
            ],
            settings(1_100, 100, 0),
        );
        let report = engine.run().expect("run");
        assert_eq!(report.results.len(), 2);

        // Each section only carries its own run's samples: counts stay in
        // the same order of magnitude instead of accumulating.
        let first = &report.results[0].metrics["CPU load"];
        let second = &report.results[1].metrics["CPU load"];
        assert!(second.values.len() < first.values.len() * 2 + 2);
    }
}
