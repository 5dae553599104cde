//! framebench - embedded render benchmark
//!
//! Runs a fixed sequence of render tasks for a bounded duration each,
//! samples system and platform performance counters concurrently, and
//! writes JSON and HTML reports of the run.

mod config;
mod display;
mod engine;
mod environment;
mod metrics;
mod output;
mod report;
mod tasks;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, RunSettings};
use crate::display::{DisplayContext, HeadlessDisplay};
use crate::engine::BenchmarkEngine;
use crate::metrics::platform::Platform;
use crate::report::BenchmarkReport;

/// framebench - render benchmark for embedded devices
#[derive(Parser)]
#[command(name = "framebench")]
#[command(author = "ForgeMyPC")]
#[command(version)]
#[command(about = "Benchmark render tasks while collecting system metrics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark sequence (default)
    Run(RunArgs),

    /// List available render tasks
    List,

    /// Detect and display the static environment
    Detect,

    /// Show configuration path and current values
    Config,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Duration for each render task in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Metric sampling interval in milliseconds
    #[arg(long)]
    sampling_rate: Option<u64>,

    /// Target frame rate; 0 renders as fast as possible
    #[arg(long)]
    target_fps: Option<u32>,

    /// Hardware family for platform metrics
    #[arg(long, value_enum)]
    platform: Option<Platform>,

    /// Window width (0 = fullscreen)
    #[arg(long)]
    width: Option<u32>,

    /// Window height (0 = fullscreen)
    #[arg(long)]
    height: Option<u32>,

    /// Directory to write reports into
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only run the named tasks (repeatable, case-insensitive)
    #[arg(short, long)]
    task: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config.log.level);

    match cli.command {
        Some(Commands::Run(args)) => run_benchmarks(&config, args),
        None => run_benchmarks(&config, RunArgs::default()),
        Some(Commands::List) => {
            for name in tasks::task_names() {
                println!("- {name}");
            }
            Ok(())
        }
        Some(Commands::Detect) => detect_environment(&config),
        Some(Commands::Config) => show_config(&config),
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_benchmarks(config: &Config, args: RunArgs) -> Result<()> {
    let settings = resolve_settings(config, &args);
    if settings.duration.is_zero() {
        anyhow::bail!("benchmark duration must be at least 1 second");
    }

    let selected = tasks::select_tasks(&args.task);
    let display = Box::new(HeadlessDisplay::new(
        settings.window_width,
        settings.window_height,
    ));

    let engine = match BenchmarkEngine::initialize(display, selected, settings.clone()) {
        Ok(engine) => engine,
        Err(err) => {
            error!(%err, "fatal initialization failure, aborting run");
            return Err(err.into());
        }
    };

    let report = engine.run()?;
    let (json_path, html_path) = output::write_reports(&report, &settings.output_dir)?;
    print_summary(&report, &json_path, &html_path);
    Ok(())
}

/// CLI flags override config file values.
fn resolve_settings(config: &Config, args: &RunArgs) -> RunSettings {
    let mut settings = RunSettings::from_config(config);
    if let Some(duration) = args.duration {
        settings.duration = std::time::Duration::from_secs(duration);
    }
    if let Some(sampling_rate) = args.sampling_rate {
        settings.sampling_interval = std::time::Duration::from_millis(sampling_rate);
    }
    if let Some(target_fps) = args.target_fps {
        settings.target_frame_rate = target_fps;
    }
    if let Some(platform) = args.platform {
        settings.platform = platform;
    }
    if let Some(width) = args.width {
        settings.window_width = width;
    }
    if let Some(height) = args.height {
        settings.window_height = height;
    }
    if let Some(output_dir) = &args.output_dir {
        settings.output_dir = output_dir.clone();
    }
    settings
}

fn detect_environment(config: &Config) -> Result<()> {
    let settings = RunSettings::from_config(config);
    let mut display = HeadlessDisplay::new(settings.window_width, settings.window_height);
    display
        .initialize()
        .map_err(engine::EngineError::DisplayInit)?;

    for (key, value) in environment::collect(&display, &settings) {
        println!("{}: {}", key.bright_white(), value);
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let path = Config::config_path()?;
    println!("{} {}", "Config file:".bright_white(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, defaults in effect)".bright_yellow());
    }
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn print_summary(report: &BenchmarkReport, json_path: &Path, html_path: &Path) {
    println!("\n{}", "Benchmark complete".bright_green().bold());
    for section in &report.results {
        match section.metrics.get("FPS").and_then(|s| s.average) {
            Some(avg) => println!(
                "  {:<12} {} FPS (avg)",
                section.task.bright_white(),
                format!("{avg:.2}").bright_cyan()
            ),
            None => println!(
                "  {:<12} {}",
                section.task.bright_white(),
                "no FPS samples (run shorter than one interval)".bright_yellow()
            ),
        }
    }
    println!();
    println!("  JSON report: {}", json_path.display());
    println!("  HTML report: {}", html_path.display());
}
