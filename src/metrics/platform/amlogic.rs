//! Amlogic set-top metrics
//!
//! Mali GPU utilization is exposed through the `mpgpu` class node (newer
//! kernels) or the mali debugfs node, as a bare percentage. GPU memory
//! usage comes from the mali `gpu_memory` debugfs file, whose first data
//! row is `<device> <pages>`.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{first_existing, parse_percent_token, GenericSampler, PlatformSampler, Reading};

const GPU_UTIL_CANDIDATES: &[&str] = &[
    "/sys/class/mpgpu/utilization",
    "/sys/kernel/debug/mali0/utilization",
];

const GPU_MEMORY_CANDIDATES: &[&str] = &["/sys/kernel/debug/mali0/gpu_memory"];

pub struct AmlogicSampler {
    base: GenericSampler,
    util_candidates: Vec<PathBuf>,
    memory_candidates: Vec<PathBuf>,
}

impl AmlogicSampler {
    pub fn new() -> Self {
        Self {
            base: GenericSampler::new(),
            util_candidates: GPU_UTIL_CANDIDATES.iter().map(PathBuf::from).collect(),
            memory_candidates: GPU_MEMORY_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }

    fn sample_gpu_util(&self) -> Option<Reading> {
        let path = first_existing(&self.util_candidates).or_else(|| {
            debug!("no mali utilization node found");
            None
        })?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read mali utilization");
                return None;
            }
        };
        match parse_utilization(&raw) {
            Some(value) => Some(Reading::new("GPU load", value)),
            None => {
                warn!(path = %path.display(), raw = raw.trim(), "unparseable mali utilization");
                None
            }
        }
    }

    fn sample_gpu_memory(&self) -> Option<Reading> {
        let path = first_existing(&self.memory_candidates)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read mali gpu_memory");
                return None;
            }
        };
        match parse_gpu_memory_pages(&raw) {
            Some(pages) => Some(Reading::new("GPU memory used (pages)", pages)),
            None => {
                warn!(path = %path.display(), "unparseable mali gpu_memory file");
                None
            }
        }
    }
}

impl Default for AmlogicSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSampler for AmlogicSampler {
    fn name(&self) -> &'static str {
        "amlogic"
    }

    fn sample(&mut self) -> Vec<Reading> {
        let mut readings = self.base.sample();
        readings.extend(self.sample_gpu_util());
        readings.extend(self.sample_gpu_memory());
        readings
    }
}

/// The node prints either a bare value (`57`) or a labelled one
/// (`utilization : 57%`); take the last numeric token.
fn parse_utilization(raw: &str) -> Option<f64> {
    raw.split_whitespace().rev().find_map(parse_percent_token)
}

/// First row holding `<name> <pages>`; header and total rows without a
/// trailing number are skipped.
fn parse_gpu_memory_pages(raw: &str) -> Option<f64> {
    for line in raw.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() == 2 {
            if let Ok(pages) = tokens[1].parse::<u64>() {
                return Some(pages as f64);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_accepts_bare_and_labelled_forms() {
        assert_eq!(parse_utilization("57\n"), Some(57.0));
        assert_eq!(parse_utilization("utilization : 42%\n"), Some(42.0));
        assert_eq!(parse_utilization("no numbers here\n"), None);
    }

    #[test]
    fn gpu_memory_takes_first_name_pages_row() {
        let raw = "\
mali0            4096
kctx-0xffff8000  512
";
        assert_eq!(parse_gpu_memory_pages(raw), Some(4096.0));
        assert_eq!(parse_gpu_memory_pages("Name Pages Flags\n"), None);
    }

    #[test]
    fn absent_nodes_fall_back_to_generic_readings() {
        let mut sampler = AmlogicSampler {
            base: GenericSampler::new(),
            util_candidates: vec![PathBuf::from("/nonexistent/utilization")],
            memory_candidates: vec![PathBuf::from("/nonexistent/gpu_memory")],
        };
        let readings = sampler.sample();
        assert!(readings.iter().any(|r| r.name == "CPU load"));
        assert!(!readings.iter().any(|r| r.name == "GPU load"));
    }
}
