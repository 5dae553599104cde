//! Realtek set-top metrics
//!
//! Realtek boxes carry a Mali GPU behind the platform bus; utilization is
//! published as `<busy> <total>` sample counts (newer kernels) or a bare
//! percentage. Heap usage is taken from the ion carveout heap summary,
//! `<heap> <allocated> <size>` in bytes.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{first_existing, parse_percent_token, GenericSampler, PlatformSampler, Reading};

const GPU_UTIL_CANDIDATES: &[&str] = &[
    "/sys/devices/platform/98080000.gpu/utilisation",
    "/sys/class/misc/mali0/device/utilization",
];

const ION_HEAP_CANDIDATES: &[&str] = &[
    "/sys/kernel/debug/ion/heaps/carveout",
    "/sys/kernel/debug/ion/heaps/rtk_carveout",
];

pub struct RealtekSampler {
    base: GenericSampler,
    util_candidates: Vec<PathBuf>,
    heap_candidates: Vec<PathBuf>,
}

impl RealtekSampler {
    pub fn new() -> Self {
        Self {
            base: GenericSampler::new(),
            util_candidates: GPU_UTIL_CANDIDATES.iter().map(PathBuf::from).collect(),
            heap_candidates: ION_HEAP_CANDIDATES.iter().map(PathBuf::from).collect(),
        }
    }

    fn sample_gpu_util(&self) -> Option<Reading> {
        let Some(path) = first_existing(&self.util_candidates) else {
            debug!("no gpu utilisation node found");
            return None;
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read gpu utilisation");
                return None;
            }
        };
        match parse_utilisation(&raw) {
            Some(value) => Some(Reading::new("GPU load", value)),
            None => {
                warn!(path = %path.display(), raw = raw.trim(), "unparseable gpu utilisation");
                None
            }
        }
    }

    fn sample_ion_heap(&self) -> Option<Reading> {
        let path = first_existing(&self.heap_candidates)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read ion heap summary");
                return None;
            }
        };
        match parse_ion_heap_used(&raw) {
            Some(percent) => Some(Reading::new("Ion heap used", percent)),
            None => {
                warn!(path = %path.display(), "unparseable ion heap summary");
                None
            }
        }
    }
}

impl Default for RealtekSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSampler for RealtekSampler {
    fn name(&self) -> &'static str {
        "realtek"
    }

    fn sample(&mut self) -> Vec<Reading> {
        let mut readings = self.base.sample();
        readings.extend(self.sample_gpu_util());
        readings.extend(self.sample_ion_heap());
        readings
    }
}

/// Accepts `busy total` counter pairs or a single percentage value.
fn parse_utilisation(raw: &str) -> Option<f64> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    match tokens.as_slice() {
        [busy, total] => {
            let busy: f64 = busy.parse().ok()?;
            let total: f64 = total.parse().ok()?;
            if total <= 0.0 {
                return None;
            }
            Some(busy / total * 100.0)
        }
        [single] => parse_percent_token(single),
        _ => None,
    }
}

/// Heap summary rows are `<name> <allocated> <size>` in bytes; usage is
/// reported as a percentage of the heap size.
fn parse_ion_heap_used(raw: &str) -> Option<f64> {
    for line in raw.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 3 {
            continue;
        }
        let (Ok(allocated), Ok(size)) = (tokens[1].parse::<f64>(), tokens[2].parse::<f64>())
        else {
            continue;
        };
        if size <= 0.0 {
            continue;
        }
        return Some(allocated / size * 100.0);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilisation_accepts_counter_pair() {
        assert_eq!(parse_utilisation("128 256\n"), Some(50.0));
        assert_eq!(parse_utilisation("73%\n"), Some(73.0));
        assert_eq!(parse_utilisation("128 0\n"), None);
        assert_eq!(parse_utilisation("a b c\n"), None);
    }

    #[test]
    fn ion_heap_usage_is_a_percentage_of_size() {
        let raw = "\
heap            allocated       size
carveout        33554432        134217728
";
        assert_eq!(parse_ion_heap_used(raw), Some(25.0));
        assert_eq!(parse_ion_heap_used("carveout n/a n/a\n"), None);
    }

    #[test]
    fn absent_nodes_fall_back_to_generic_readings() {
        let mut sampler = RealtekSampler {
            base: GenericSampler::new(),
            util_candidates: vec![PathBuf::from("/nonexistent/utilisation")],
            heap_candidates: vec![PathBuf::from("/nonexistent/carveout")],
        };
        let readings = sampler.sample();
        assert!(readings.iter().any(|r| r.name == "CPU load"));
        assert!(!readings.iter().any(|r| r.name == "GPU load"));
    }
}
