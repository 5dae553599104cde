//! Display context seam
//!
//! Window and graphics-context creation live outside the benchmark core;
//! the engine only needs dimensions, a per-frame present call, and driver
//! description strings for the report environment. The headless context
//! below stands in for the platform windowing glue and is what tests and
//! CI runs use.

use anyhow::Result;
use tracing::{info, trace};

pub trait DisplayContext: Send {
    /// Bring the display up. Failure here aborts the whole run.
    fn initialize(&mut self) -> Result<()>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Called once per rendered frame.
    fn present(&mut self);

    /// Renderer/driver description for the report environment.
    fn driver_info(&self) -> Vec<(String, String)>;
}

const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

/// Offscreen display. A configured size of 0 means "fullscreen" on a real
/// windowing stack; offscreen it falls back to 1280x720.
pub struct HeadlessDisplay {
    width: u32,
    height: u32,
    frames_presented: u64,
}

impl HeadlessDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: if width == 0 { DEFAULT_WIDTH } else { width },
            height: if height == 0 { DEFAULT_HEIGHT } else { height },
            frames_presented: 0,
        }
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl DisplayContext for HeadlessDisplay {
    fn initialize(&mut self) -> Result<()> {
        info!(
            width = self.width,
            height = self.height,
            "headless display initialized"
        );
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        trace!(frame = self.frames_presented, "frame presented");
    }

    fn driver_info(&self) -> Vec<(String, String)> {
        vec![(
            "Renderer".to_string(),
            "software rasterizer (headless)".to_string(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_falls_back_to_defaults() {
        let display = HeadlessDisplay::new(0, 0);
        assert_eq!(display.width(), 1280);
        assert_eq!(display.height(), 720);

        let display = HeadlessDisplay::new(640, 480);
        assert_eq!(display.width(), 640);
        assert_eq!(display.height(), 480);
    }

    #[test]
    fn present_counts_frames() {
        let mut display = HeadlessDisplay::new(0, 0);
        display.initialize().expect("initialize");
        display.present();
        display.present();
        assert_eq!(display.frames_presented(), 2);
    }
}
