//! Full-surface clear, the baseline workload.

use anyhow::Result;
use tracing::debug;

use super::{pack_rgb, RenderTask, Surface};

const CLEAR_COLOR: (f32, f32, f32) = (0.0, 0.5, 0.75);

pub struct ClearTask {
    name: String,
    surface: Surface,
    color: u32,
}

impl ClearTask {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            surface: Surface::new(),
            color: 0,
        }
    }
}

impl RenderTask for ClearTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<()> {
        self.color = pack_rgb(CLEAR_COLOR.0, CLEAR_COLOR.1, CLEAR_COLOR.2);
        debug!(task = self.name.as_str(), "setup complete");
        Ok(())
    }

    fn update(&mut self, _elapsed_ms: f64, _delta_ms: f64) {}

    fn render(&mut self, width: u32, height: u32) -> Result<()> {
        self.surface.resize(width, height);
        self.surface.fill(self.color);
        Ok(())
    }

    fn teardown(&mut self) {
        self.color = 0;
        debug!(task = self.name.as_str(), "teardown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_clear_color_everywhere() {
        let mut task = ClearTask::new("Clear");
        task.setup().expect("setup");
        task.render(8, 4).expect("render");

        let expected = pack_rgb(0.0, 0.5, 0.75);
        assert_eq!(task.surface.pixel(0, 0), expected);
        assert_eq!(task.surface.pixel(7, 3), expected);
        task.teardown();
    }
}
