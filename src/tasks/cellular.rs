//! Animated cellular (Worley) noise, the per-pixel-heavy workload.
//!
//! Every pixel searches the 3x3 neighborhood of noise cells for the
//! nearest feature point; the FBM variant layers a second octave on top,
//! roughly doubling the arithmetic per pixel.

use anyhow::Result;
use tracing::debug;

use super::{pack_rgb, RenderTask, Surface};

/// Noise cells across the surface's shorter axis.
const CELL_DENSITY: f32 = 12.0;

pub struct Cellular {
    name: String,
    surface: Surface,
    enable_fbm: bool,
    time_secs: f32,
}

impl Cellular {
    pub fn new(name: &str, enable_fbm: bool) -> Self {
        Self {
            name: name.to_string(),
            surface: Surface::new(),
            enable_fbm,
            time_secs: 0.0,
        }
    }
}

impl RenderTask for Cellular {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<()> {
        self.time_secs = 0.0;
        debug!(
            task = self.name.as_str(),
            fbm = self.enable_fbm,
            "setup complete"
        );
        Ok(())
    }

    fn update(&mut self, elapsed_ms: f64, _delta_ms: f64) {
        self.time_secs = (elapsed_ms / 1000.0) as f32;
    }

    fn render(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface.resize(width, height);
        let scale = CELL_DENSITY / (width.min(height).max(1) as f32);

        for y in 0..height {
            for x in 0..width {
                let px = x as f32 * scale;
                let py = y as f32 * scale;
                let mut d = worley(px, py, self.time_secs);
                if self.enable_fbm {
                    d = 0.65 * d + 0.35 * worley(px * 2.0, py * 2.0, self.time_secs * 1.7);
                }
                let shade = (1.0 - d).clamp(0.0, 1.0);
                self.surface
                    .put(x, y, pack_rgb(shade * 0.2, shade * 0.6, shade));
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        debug!(task = self.name.as_str(), "teardown complete");
    }
}

/// Distance to the nearest animated feature point in the surrounding
/// cells, in [0, ~1.4].
fn worley(x: f32, y: f32, time: f32) -> f32 {
    let cell_x = x.floor() as i32;
    let cell_y = y.floor() as i32;
    let mut nearest = f32::MAX;

    for dy in -1..=1 {
        for dx in -1..=1 {
            let cx = cell_x + dx;
            let cy = cell_y + dy;
            let (hx, hy) = hash2(cx, cy);
            // Feature points orbit inside their cell.
            let fx = cx as f32 + 0.5 + 0.4 * (time + hx * std::f32::consts::TAU).sin();
            let fy = cy as f32 + 0.5 + 0.4 * (time + hy * std::f32::consts::TAU).cos();
            let dist = ((fx - x).powi(2) + (fy - y).powi(2)).sqrt();
            nearest = nearest.min(dist);
        }
    }
    nearest
}

/// Deterministic per-cell pseudo-random pair in [0, 1).
fn hash2(x: i32, y: i32) -> (f32, f32) {
    let mut h = (x as u32).wrapping_mul(0x85eb_ca6b) ^ (y as u32).wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    let a = (h & 0xffff) as f32 / 65536.0;
    let b = (h >> 16) as f32 / 65536.0;
    (a, b)
}
