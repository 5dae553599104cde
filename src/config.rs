//! Configuration management for framebench
//!
//! Config file location:
//! - Linux: ~/.config/framebench/config.toml
//! - Device builds usually ship a read-only config under /etc instead.
//!
//! You can override the config location by setting `FRAMEBENCH_CONFIG_PATH`.
//! CLI flags override file values; the engine itself only ever sees the
//! resolved [`RunSettings`], never this file.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::metrics::platform::Platform;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Benchmark pacing and sampling settings
    #[serde(default)]
    pub benchmark: BenchmarkConfig,

    /// Window dimensions (0 means fullscreen)
    #[serde(default)]
    pub window: WindowConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging defaults
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

            let config: Config = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config from {}", config_path.display())
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, toml)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("FRAMEBENCH_CONFIG_PATH") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        let proj_dirs = ProjectDirs::from("com", "forgemypc", "framebench")
            .context("Could not determine project directories")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// Benchmark pacing and sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Duration each render task runs, in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Metric sampling interval in milliseconds
    #[serde(default = "default_sampling_rate_ms")]
    pub sampling_rate_ms: u64,

    /// Target frame rate; 0 renders as fast as possible
    #[serde(default = "default_target_frame_rate")]
    pub target_frame_rate: u32,

    /// Hardware family for platform metrics
    #[serde(default)]
    pub platform: Platform,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            sampling_rate_ms: default_sampling_rate_ms(),
            target_frame_rate: default_target_frame_rate(),
            platform: Platform::default(),
        }
    }
}

fn default_duration_secs() -> u64 {
    30
}

fn default_sampling_rate_ms() -> u64 {
    1000
}

fn default_target_frame_rate() -> u32 {
    60
}

/// Window dimensions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Width of the application window. 0 for fullscreen.
    #[serde(default)]
    pub width: u32,

    /// Height of the application window. 0 for fullscreen.
    #[serde(default)]
    pub height: u32,
}

/// Report output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory to save reports in
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

/// Logging defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolved values the engine runs with. Plain data: file values merged
/// with CLI overrides before orchestration starts.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub duration: Duration,
    pub sampling_interval: Duration,
    pub target_frame_rate: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub platform: Platform,
    pub output_dir: PathBuf,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            duration: Duration::from_secs(config.benchmark.duration_secs),
            sampling_interval: Duration::from_millis(config.benchmark.sampling_rate_ms),
            target_frame_rate: config.benchmark.target_frame_rate,
            window_width: config.window.width,
            window_height: config.window.height,
            platform: config.benchmark.platform,
            output_dir: config.output.dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.benchmark.duration_secs, 30);
        assert_eq!(config.benchmark.sampling_rate_ms, 1000);
        assert_eq!(config.benchmark.target_frame_rate, 60);
        assert_eq!(config.benchmark.platform, Platform::Auto);
        assert_eq!(config.window.width, 0);
        assert_eq!(config.output.dir, PathBuf::from("/tmp"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();

        assert!(toml.contains("duration_secs"));
        assert!(toml.contains("sampling_rate_ms"));
        assert!(toml.contains("target_frame_rate"));
        assert!(toml.contains("[window]"));
        assert!(toml.contains("[log]"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("[benchmark]\nduration_secs = 5\n").unwrap();
        assert_eq!(config.benchmark.duration_secs, 5);
        assert_eq!(config.benchmark.sampling_rate_ms, 1000);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn run_settings_resolve_durations() {
        let settings = RunSettings::from_config(&Config::default());
        assert_eq!(settings.duration, Duration::from_secs(30));
        assert_eq!(settings.sampling_interval, Duration::from_millis(1000));
    }
}
