//! Render tasks
//!
//! Each task is a self-contained graphical workload driven by the engine:
//! `setup` acquires its resources, `update` advances animation state with
//! wall-clock times supplied by the engine, `render` draws one frame at
//! the display's dimensions, `teardown` releases everything. Tasks render
//! in software into an owned pixel buffer, so the workload is complete
//! without a GPU stack underneath.

mod cellular;
mod clear;
mod cube;
mod triangle;

pub use cellular::Cellular;
pub use clear::ClearTask;
pub use cube::Cube;
pub use triangle::Triangle;

use anyhow::Result;
use tracing::warn;

pub trait RenderTask: Send {
    fn name(&self) -> &str;

    /// Acquire the task's resources. Failure skips the task, not the run.
    fn setup(&mut self) -> Result<()>;

    /// Advance animation state; times are milliseconds since the task's
    /// loop started and since the previous frame.
    fn update(&mut self, elapsed_ms: f64, delta_ms: f64);

    /// Draw one frame at the given dimensions. An error aborts this
    /// task's frame loop.
    fn render(&mut self, width: u32, height: u32) -> Result<()>;

    fn teardown(&mut self);
}

/// The benchmark sequence, in execution order.
pub fn default_tasks() -> Vec<Box<dyn RenderTask>> {
    vec![
        Box::new(ClearTask::new("Clear")),
        Box::new(Triangle::new("Triangle")),
        Box::new(Cellular::new("Cellular", true)),
        Box::new(Cube::new("Cube-AA1", 1, 128)),
        Box::new(Cube::new("Cube-AA2", 2, 128)),
    ]
}

pub fn task_names() -> Vec<String> {
    default_tasks().iter().map(|t| t.name().to_string()).collect()
}

/// Filter the default sequence by name, case-insensitively. Unknown names
/// are reported and skipped; an empty filter selects everything.
pub fn select_tasks(filter: &[String]) -> Vec<Box<dyn RenderTask>> {
    let mut tasks = default_tasks();
    if filter.is_empty() {
        return tasks;
    }

    for wanted in filter {
        if !tasks
            .iter()
            .any(|t| t.name().eq_ignore_ascii_case(wanted))
        {
            warn!(task = wanted.as_str(), "unknown task name, skipping");
        }
    }
    tasks.retain(|t| {
        filter
            .iter()
            .any(|wanted| t.name().eq_ignore_ascii_case(wanted))
    });
    tasks
}

/// Owned RGB pixel buffer the tasks rasterize into.
pub(crate) struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Surface {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Match the buffer to the display size; contents are undefined after
    /// a resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; (width as usize) * (height as usize)];
        }
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    pub fn put(&mut self, x: u32, y: u32, color: u32) {
        if x < self.width && y < self.height {
            self.pixels[(y as usize) * (self.width as usize) + x as usize] = color;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Pack channel intensities in [0, 1] into 0x00RRGGBB.
pub(crate) fn pack_rgb(r: f32, g: f32, b: f32) -> u32 {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u32;
    (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_matches_shipping_order() {
        assert_eq!(
            task_names(),
            vec!["Clear", "Triangle", "Cellular", "Cube-AA1", "Cube-AA2"]
        );
    }

    #[test]
    fn filter_selects_case_insensitively() {
        let tasks = select_tasks(&["clear".to_string(), "CUBE-AA2".to_string()]);
        let names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["Clear", "Cube-AA2"]);
    }

    #[test]
    fn unknown_filter_names_select_nothing() {
        assert!(select_tasks(&["Teapot".to_string()]).is_empty());
    }

    #[test]
    fn surface_resize_and_put() {
        let mut surface = Surface::new();
        surface.resize(4, 2);
        surface.put(3, 1, 0x00ff_0000);
        assert_eq!(surface.pixel(3, 1), 0x00ff_0000);
        assert_eq!(surface.pixel(0, 0), 0);

        // Out-of-bounds writes are dropped, not panics.
        surface.put(4, 0, 0xffff_ffff);
        surface.put(0, 2, 0xffff_ffff);
    }

    #[test]
    fn rgb_packing_clamps_channels() {
        assert_eq!(pack_rgb(1.0, 0.0, 0.0), 0x00ff_0000);
        assert_eq!(pack_rgb(2.0, -1.0, 0.5), 0x00ff_007f);
    }
}
