//! Broadcom set-top metrics
//!
//! GPU load comes from the v3d debugfs `gpu_load` file, which reports
//! load averages over three windows plus one line per client process:
//!
//! ```text
//! load average: 32.1% @ 16ms, 30.5% @ 0.5s, 28.9% @ 16s
//!  1234  31.0%  29.8%  27.5%  westeros
//! ```
//!
//! Graphics heap usage comes from `/proc/brcm/core`, where the `GFX0` row
//! carries the used percentage in its seventh column.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{first_existing, parse_percent_token, GenericSampler, PlatformSampler, Reading};

const GPU_LOAD_CANDIDATES: &[&str] = &[
    "/sys/kernel/debug/dri/0/gpu_load",
    "/sys/kernel/debug/dri/1/gpu_load",
    "/sys/kernel/debug/dri/128/gpu_load",
];

const CORE_FILE: &str = "/proc/brcm/core";

/// Client processes whose per-process GPU load is worth reporting: this
/// benchmark itself plus the compositors it renders through.
const TRACKED_CLIENTS: &[&str] = &["framebench", "westeros", "GlRenderLoop"];

pub struct BroadcomSampler {
    base: GenericSampler,
    gpu_load_candidates: Vec<PathBuf>,
    core_file: PathBuf,
}

impl BroadcomSampler {
    pub fn new() -> Self {
        Self {
            base: GenericSampler::new(),
            gpu_load_candidates: GPU_LOAD_CANDIDATES.iter().map(PathBuf::from).collect(),
            core_file: PathBuf::from(CORE_FILE),
        }
    }

    fn sample_gpu_load(&self) -> Vec<Reading> {
        let Some(path) = first_existing(&self.gpu_load_candidates) else {
            debug!("no gpu_load debugfs file found");
            return Vec::new();
        };
        match fs::read_to_string(&path) {
            Ok(content) => parse_gpu_load(&content),
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read gpu_load file");
                Vec::new()
            }
        }
    }

    fn sample_core_heap(&self) -> Vec<Reading> {
        if !self.core_file.exists() {
            debug!(path = %self.core_file.display(), "core heap file absent");
            return Vec::new();
        }
        match fs::read_to_string(&self.core_file) {
            Ok(content) => parse_core_heap(&content),
            Err(err) => {
                warn!(path = %self.core_file.display(), %err, "failed to read core heap file");
                Vec::new()
            }
        }
    }
}

impl Default for BroadcomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSampler for BroadcomSampler {
    fn name(&self) -> &'static str {
        "broadcom"
    }

    fn sample(&mut self) -> Vec<Reading> {
        let mut readings = self.base.sample();
        readings.extend(self.sample_gpu_load());
        readings.extend(self.sample_core_heap());
        readings
    }
}

fn parse_gpu_load(content: &str) -> Vec<Reading> {
    let mut readings = Vec::new();

    for line in content.lines() {
        if line.contains("load average:") {
            let percents: Vec<f64> = line
                .split_whitespace()
                .filter(|token| token.ends_with('%'))
                .filter_map(parse_percent_token)
                .collect();
            if percents.len() < 3 {
                warn!(line, "short load average line in gpu_load file");
                continue;
            }
            readings.push(Reading::new("Total GPU load (16ms)", percents[0]));
            readings.push(Reading::new("Total GPU load (0.5s)", percents[1]));
            readings.push(Reading::new("Total GPU load (16s)", percents[2]));
        } else {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            // Per-client rows are "pid load load load command".
            if tokens.len() < 5 || tokens[0].parse::<u32>().is_err() {
                continue;
            }
            let Some(&command) = tokens.last() else {
                continue;
            };
            if !TRACKED_CLIENTS.contains(&command) {
                continue;
            }
            let percents: Vec<f64> = tokens[1..4]
                .iter()
                .filter_map(|t| parse_percent_token(t))
                .collect();
            if percents.len() < 3 {
                warn!(line, "unparseable client row in gpu_load file");
                continue;
            }
            readings.push(Reading::new(format!("{command} GPU load (16ms)"), percents[0]));
            readings.push(Reading::new(format!("{command} GPU load (0.5s)"), percents[1]));
            readings.push(Reading::new(format!("{command} GPU load (16s)"), percents[2]));
        }
    }

    readings
}

fn parse_core_heap(content: &str) -> Vec<Reading> {
    for line in content.lines() {
        if !line.contains("GFX0") {
            continue;
        }
        match line.split_whitespace().nth(6).and_then(parse_percent_token) {
            Some(used) => return vec![Reading::new("GFX heap used", used)],
            None => {
                warn!(line, "unparseable GFX0 row in core file");
                return Vec::new();
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPU_LOAD_SAMPLE: &str = "\
load average: 32.1% @ 16ms, 30.5% @ 0.5s, 28.9% @ 16s
 1234  31.0%  29.8%  27.5%  westeros
 4321  12.0%  11.8%  10.5%  some_other_app
";

    #[test]
    fn gpu_load_totals_are_extracted() {
        let readings = parse_gpu_load(GPU_LOAD_SAMPLE);
        assert_eq!(
            readings
                .iter()
                .find(|r| r.name == "Total GPU load (16ms)")
                .map(|r| r.value),
            Some(32.1)
        );
        assert_eq!(
            readings
                .iter()
                .find(|r| r.name == "Total GPU load (16s)")
                .map(|r| r.value),
            Some(28.9)
        );
    }

    #[test]
    fn only_tracked_clients_are_reported() {
        let readings = parse_gpu_load(GPU_LOAD_SAMPLE);
        assert!(readings.iter().any(|r| r.name == "westeros GPU load (16ms)"));
        assert!(!readings.iter().any(|r| r.name.contains("some_other_app")));
    }

    #[test]
    fn malformed_load_line_is_skipped() {
        let readings = parse_gpu_load("load average: broken\n");
        assert!(readings.is_empty());
    }

    #[test]
    fn core_heap_row_uses_seventh_column() {
        let content = "\
NAME   a   b   c   d   e   USED
GFX0   1   2   3   4   5   61%
";
        let readings = parse_core_heap(content);
        assert_eq!(readings, vec![Reading::new("GFX heap used", 61.0)]);
    }

    #[test]
    fn missing_gfx_row_yields_nothing() {
        assert!(parse_core_heap("SDRAM0  1 2 3 4 5 40%\n").is_empty());
    }

    #[test]
    fn missing_files_degrade_to_base_readings() {
        let mut sampler = BroadcomSampler {
            base: GenericSampler::new(),
            gpu_load_candidates: vec![PathBuf::from("/nonexistent/gpu_load")],
            core_file: PathBuf::from("/nonexistent/core"),
        };
        let readings = sampler.sample();
        assert!(readings.iter().any(|r| r.name == "CPU load"));
        assert!(!readings.iter().any(|r| r.name.starts_with("Total GPU load")));
    }
}
