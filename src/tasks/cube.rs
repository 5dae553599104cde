//! Ray-marched rotating box frame.
//!
//! Port of the "Box Frame - Distance 3D" scene the GL benchmark runs as
//! its cube workload (https://www.shadertoy.com/view/3ljcRh), marched on
//! the CPU. The anti-aliasing factor multiplies the rays per pixel, which
//! is what differentiates the two registered cube variants.

use anyhow::Result;
use tracing::debug;

use super::{pack_rgb, RenderTask, Surface};

const HIT_EPSILON: f32 = 0.001;
const MAX_DISTANCE: f32 = 10.0;

pub struct Cube {
    name: String,
    surface: Surface,
    aa: u32,
    max_steps: u32,
    time_secs: f32,
}

impl Cube {
    pub fn new(name: &str, aa: u32, max_steps: u32) -> Self {
        Self {
            name: name.to_string(),
            surface: Surface::new(),
            aa: aa.max(1),
            max_steps,
            time_secs: 0.0,
        }
    }
}

impl RenderTask for Cube {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<()> {
        self.time_secs = 0.0;
        debug!(
            task = self.name.as_str(),
            aa = self.aa,
            max_steps = self.max_steps,
            "setup complete"
        );
        Ok(())
    }

    fn update(&mut self, elapsed_ms: f64, _delta_ms: f64) {
        self.time_secs = (elapsed_ms / 1000.0) as f32;
    }

    fn render(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface.resize(width, height);
        let aspect = width as f32 / height.max(1) as f32;

        for y in 0..height {
            for x in 0..width {
                let mut accum = (0.0, 0.0, 0.0);
                for sy in 0..self.aa {
                    for sx in 0..self.aa {
                        let ox = (sx as f32 + 0.5) / self.aa as f32;
                        let oy = (sy as f32 + 0.5) / self.aa as f32;
                        let u = ((x as f32 + ox) / width as f32 * 2.0 - 1.0) * aspect;
                        let v = (y as f32 + oy) / height as f32 * 2.0 - 1.0;
                        let sample = self.march(u, v);
                        accum.0 += sample.0;
                        accum.1 += sample.1;
                        accum.2 += sample.2;
                    }
                }
                let samples = (self.aa * self.aa) as f32;
                self.surface.put(
                    x,
                    y,
                    pack_rgb(accum.0 / samples, accum.1 / samples, accum.2 / samples),
                );
            }
        }
        Ok(())
    }

    fn teardown(&mut self) {
        debug!(task = self.name.as_str(), "teardown complete");
    }
}

impl Cube {
    fn march(&self, u: f32, v: f32) -> (f32, f32, f32) {
        let origin = [0.0, 0.0, -3.0];
        let dir = normalize([u, v, 2.0]);

        let mut t = 0.0_f32;
        for step in 0..self.max_steps {
            let p = [
                origin[0] + dir[0] * t,
                origin[1] + dir[1] * t,
                origin[2] + dir[2] * t,
            ];
            let p = rotate_y(rotate_x(p, self.time_secs * 0.7), self.time_secs);
            let d = sd_box_frame(p, [0.8, 0.8, 0.8], 0.1);
            if d < HIT_EPSILON {
                let glow = 1.0 - step as f32 / self.max_steps as f32;
                return (glow, glow * 0.7, glow * 0.3);
            }
            t += d;
            if t > MAX_DISTANCE {
                break;
            }
        }
        // Background gradient.
        let sky = 0.15 + 0.1 * (1.0 - v.abs());
        (sky * 0.4, sky * 0.5, sky)
    }
}

/// Signed distance to a hollow box frame of half-extent `b` and edge
/// thickness `e`.
fn sd_box_frame(p: [f32; 3], b: [f32; 3], e: f32) -> f32 {
    let p = [p[0].abs() - b[0], p[1].abs() - b[1], p[2].abs() - b[2]];
    let q = [
        (p[0] + e).abs() - e,
        (p[1] + e).abs() - e,
        (p[2] + e).abs() - e,
    ];

    let beam = |a: f32, b: f32, c: f32| {
        length([a.max(0.0), b.max(0.0), c.max(0.0)]) + a.max(b.max(c)).min(0.0)
    };
    beam(p[0], q[1], q[2])
        .min(beam(q[0], p[1], q[2]))
        .min(beam(q[0], q[1], p[2]))
}

fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = length(v);
    [v[0] / len, v[1] / len, v[2] / len]
}

fn rotate_y(p: [f32; 3], angle: f32) -> [f32; 3] {
    let (s, c) = angle.sin_cos();
    [c * p[0] - s * p[2], p[1], s * p[0] + c * p[2]]
}

fn rotate_x(p: [f32; 3], angle: f32) -> [f32; 3] {
    let (s, c) = angle.sin_cos();
    [p[0], c * p[1] - s * p[2], s * p[1] + c * p[2]]
}
