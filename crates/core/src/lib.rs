//! Core primitives and traits for raster video chip emulation.

pub mod logging;
pub mod palette;
pub mod renderer;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// A rendered output frame, pixels packed row-major as ARGB8888
    /// (0xAARRGGBB).
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Flood the frame with a single color.
        pub fn fill(&mut self, color: u32) {
            self.pixels.fill(color);
        }
    }
}
