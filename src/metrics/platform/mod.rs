//! Platform metric samplers
//!
//! A sampler produces zero or more named readings per sampling tick from
//! OS and platform debug sources. The generic sampler works on any Linux
//! host; the hardware-family variants add GPU load and heap readings
//! parsed from vendor debug files. A missing or malformed platform file is
//! never fatal: the reading is skipped with a log line and sampling
//! continues.

mod amlogic;
mod broadcom;
mod realtek;

pub use amlogic::AmlogicSampler;
pub use broadcom::BroadcomSampler;
pub use realtek::RealtekSampler;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::{debug, info, warn};

/// One named reading produced by a sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub name: String,
    pub value: f64,
}

impl Reading {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A source of per-tick platform readings.
///
/// Implementations are selected once at startup and driven synchronously
/// from the sampling loop, so `sample` must not block for longer than the
/// sampling interval in the common case.
pub trait PlatformSampler: Send {
    fn name(&self) -> &'static str;

    /// Read the platform's current counters.
    ///
    /// Failures local to one data source skip that reading only.
    fn sample(&mut self) -> Vec<Reading>;
}

/// Hardware family to sample platform metrics for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Probe for a known hardware family, fall back to generic.
    Auto,
    Generic,
    Amlogic,
    Broadcom,
    Realtek,
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Auto
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Auto => "auto",
            Platform::Generic => "generic",
            Platform::Amlogic => "amlogic",
            Platform::Broadcom => "broadcom",
            Platform::Realtek => "realtek",
        };
        write!(f, "{name}")
    }
}

/// Build the sampler for the configured hardware family.
pub fn select_sampler(platform: Platform) -> Box<dyn PlatformSampler> {
    let resolved = match platform {
        Platform::Auto => detect_platform(),
        other => other,
    };

    let sampler: Box<dyn PlatformSampler> = match resolved {
        Platform::Amlogic => Box::new(AmlogicSampler::new()),
        Platform::Broadcom => Box::new(BroadcomSampler::new()),
        Platform::Realtek => Box::new(RealtekSampler::new()),
        Platform::Generic | Platform::Auto => Box::new(GenericSampler::new()),
    };
    info!(sampler = sampler.name(), "platform sampler selected");
    sampler
}

/// Probe vendor-specific nodes to identify the hardware family.
fn detect_platform() -> Platform {
    if Path::new("/proc/brcm").exists() {
        return Platform::Broadcom;
    }
    if Path::new("/sys/class/mpgpu").exists() {
        return Platform::Amlogic;
    }
    if Path::new("/sys/devices/platform/98080000.gpu").exists() {
        return Platform::Realtek;
    }
    debug!("no vendor nodes found, using generic sampler");
    Platform::Generic
}

/// Portable sampler: CPU load, CPU temperature, and system memory usage.
///
/// CPU and memory figures come from sysinfo, which computes load deltas
/// between successive refreshes; the instance therefore lives for the
/// whole process so consecutive ticks measure real intervals. Temperature
/// is read from the thermal sysfs zone used by the target devices.
pub struct GenericSampler {
    system: System,
    thermal_candidates: Vec<PathBuf>,
}

const THERMAL_ZONE_CANDIDATES: &[&str] = &[
    "/sys/class/thermal/thermal_zone0/temp",
    "/sys/class/hwmon/hwmon0/temp1_input",
];

impl GenericSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            thermal_candidates: THERMAL_ZONE_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }

    #[cfg(test)]
    fn with_thermal_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            system: System::new(),
            thermal_candidates: candidates,
        }
    }

    fn cpu_load(&mut self) -> f64 {
        self.system.refresh_cpu_usage();
        f64::from(self.system.global_cpu_usage())
    }

    fn memory_usage(&mut self) -> Option<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            warn!("total memory reported as zero, skipping memory reading");
            return None;
        }
        Some(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn cpu_temperature(&self) -> Option<f64> {
        let path = first_existing(&self.thermal_candidates)?;
        match fs::read_to_string(&path) {
            Ok(raw) => match parse_millidegrees(&raw) {
                Some(celsius) => Some(celsius),
                None => {
                    warn!(path = %path.display(), "unparseable thermal zone value");
                    None
                }
            },
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read thermal zone");
                None
            }
        }
    }
}

impl Default for GenericSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSampler for GenericSampler {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn sample(&mut self) -> Vec<Reading> {
        let mut readings = vec![Reading::new("CPU load", self.cpu_load())];
        if let Some(temp) = self.cpu_temperature() {
            readings.push(Reading::new("CPU temperature", temp));
        }
        if let Some(memory) = self.memory_usage() {
            readings.push(Reading::new("System memory usage", memory));
        }
        readings
    }
}

/// First path in `candidates` that exists on this system.
pub(crate) fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}

/// Thermal zone files report millidegrees Celsius.
fn parse_millidegrees(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    Some(value / 1000.0)
}

/// Parse a token like `42.5%` or `42.5`, tolerating surrounding noise.
pub(crate) fn parse_percent_token(token: &str) -> Option<f64> {
    token.trim().trim_end_matches('%').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn millidegrees_parse_to_celsius() {
        assert_eq!(parse_millidegrees("48250\n"), Some(48.25));
        assert_eq!(parse_millidegrees("garbage"), None);
    }

    #[test]
    fn percent_token_tolerates_suffix() {
        assert_eq!(parse_percent_token("42.5%"), Some(42.5));
        assert_eq!(parse_percent_token(" 7 "), Some(7.0));
        assert_eq!(parse_percent_token("n/a"), None);
    }

    #[test]
    fn first_existing_prefers_earlier_candidates() {
        let dir = TempDir::new().expect("temp dir");
        let present = dir.path().join("zone1");
        std::fs::File::create(&present)
            .expect("create file")
            .write_all(b"1000")
            .expect("write");

        let candidates = vec![dir.path().join("zone0"), present.clone()];
        assert_eq!(first_existing(&candidates), Some(present));
        assert_eq!(first_existing(&[dir.path().join("missing")]), None);
    }

    #[test]
    fn missing_thermal_zone_skips_temperature() {
        let dir = TempDir::new().expect("temp dir");
        let mut sampler =
            GenericSampler::with_thermal_candidates(vec![dir.path().join("absent")]);

        let readings = sampler.sample();
        assert!(readings.iter().any(|r| r.name == "CPU load"));
        assert!(!readings.iter().any(|r| r.name == "CPU temperature"));
    }

    #[test]
    fn thermal_zone_file_feeds_temperature_reading() {
        let dir = TempDir::new().expect("temp dir");
        let zone = dir.path().join("temp");
        std::fs::write(&zone, "51500\n").expect("write zone");

        let mut sampler = GenericSampler::with_thermal_candidates(vec![zone]);
        let readings = sampler.sample();
        let temp = readings
            .iter()
            .find(|r| r.name == "CPU temperature")
            .expect("temperature reading");
        assert!((temp.value - 51.5).abs() < f64::EPSILON);
    }
}
