//! Rotating color-interpolated triangle.

use anyhow::Result;
use tracing::debug;

use super::{pack_rgb, RenderTask, Surface};

/// Degrees per second of rotation.
const ROTATION_SPEED: f64 = 90.0;

pub struct Triangle {
    name: String,
    surface: Surface,
    rotation_deg: f64,
}

impl Triangle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            surface: Surface::new(),
            rotation_deg: 0.0,
        }
    }
}

impl RenderTask for Triangle {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<()> {
        self.rotation_deg = 0.0;
        debug!(task = self.name.as_str(), "setup complete");
        Ok(())
    }

    fn update(&mut self, _elapsed_ms: f64, delta_ms: f64) {
        self.rotation_deg = (self.rotation_deg + ROTATION_SPEED * delta_ms / 1000.0) % 360.0;
    }

    fn render(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface.resize(width, height);
        self.surface.fill(0);

        let angle = self.rotation_deg.to_radians() as f32;
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = cx.min(cy) * 0.8;

        // Equilateral triangle rotated about the surface center, one
        // vertex color per corner.
        let vertices: Vec<(f32, f32)> = (0..3)
            .map(|i| {
                let theta = angle + (i as f32) * std::f32::consts::TAU / 3.0;
                (cx + radius * theta.cos(), cy + radius * theta.sin())
            })
            .collect();
        rasterize(
            &mut self.surface,
            [vertices[0], vertices[1], vertices[2]],
            [(1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (0.0, 0.0, 1.0)],
        );
        Ok(())
    }

    fn teardown(&mut self) {
        debug!(task = self.name.as_str(), "teardown complete");
    }
}

fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Barycentric rasterization over the triangle's bounding box.
fn rasterize(surface: &mut Surface, v: [(f32, f32); 3], colors: [(f32, f32, f32); 3]) {
    let area = edge(v[0], v[1], v[2]);
    if area.abs() < f32::EPSILON {
        return;
    }

    let min_x = v.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).max(0.0) as u32;
    let max_x = (v.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max) as u32)
        .min(surface.width().saturating_sub(1));
    let min_y = v.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).max(0.0) as u32;
    let max_y = (v.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max) as u32)
        .min(surface.height().saturating_sub(1));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(v[1], v[2], p) / area;
            let w1 = edge(v[2], v[0], p) / area;
            let w2 = edge(v[0], v[1], p) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let r = w0 * colors[0].0 + w1 * colors[1].0 + w2 * colors[2].0;
            let g = w0 * colors[0].1 + w1 * colors[1].1 + w2 * colors[2].1;
            let b = w0 * colors[0].2 + w1 * colors[1].2 + w2 * colors[2].2;
            surface.put(x, y, pack_rgb(r, g, b));
        }
    }
}
