//! ARGB frame assembly for the TMS9918A scanline core.
//!
//! The device core emits palette indices; this module owns the chip's
//! fixed palette and turns a full frame of scanlines into a
//! [`vdp_core::types::Frame`] behind the common renderer seam.

use vdp_core::palette::{FixedPalette, IndexedPalette};
use vdp_core::renderer::Renderer;
use vdp_core::types::Frame;

use crate::vdp::{Tms9918a, PIXELS_X, PIXELS_Y};

/// The TMS9918A's fixed 15-color palette as ARGB8888.
///
/// Index 0 is the transparent sentinel; by the time a row leaves the core
/// every transparent pixel has been replaced by the backdrop, so it is
/// mapped to opaque black here.
pub const TMS9918A_PALETTE: [u32; 16] = [
    0xFF000000, // transparent
    0xFF000000, // black
    0xFF21C942, // medium green
    0xFF5EDC78, // light green
    0xFF5455ED, // dark blue
    0xFF7D75FC, // light blue
    0xFFD3524D, // dark red
    0xFF43EBF6, // cyan
    0xFFFD5554, // medium red
    0xFFFF7978, // light red
    0xFFD3C153, // dark yellow
    0xFFE5CE80, // light yellow
    0xFF21B03C, // dark green
    0xFFC95BBA, // magenta
    0xFFCCCCCC, // gray
    0xFFFFFFFF, // white
];

/// Software renderer producing 256x192 ARGB frames from the device core.
pub struct VdpRenderer {
    frame: Frame,
    palette: FixedPalette,
}

impl VdpRenderer {
    pub fn new() -> Self {
        Self {
            frame: Frame::new(PIXELS_X as u32, PIXELS_Y as u32),
            palette: FixedPalette::from_colors(TMS9918A_PALETTE.to_vec()),
        }
    }

    /// Render all 192 visible scanlines of `vdp` into the frame.
    ///
    /// Drives the core in increasing line order, which is what frames the
    /// status transitions (line 0 clear, line 191 interrupt).
    pub fn render_frame(&mut self, vdp: &mut Tms9918a) {
        // Rendering happens at the chip's native resolution
        if self.frame.pixels.len() != PIXELS_X * PIXELS_Y {
            self.frame = Frame::new(PIXELS_X as u32, PIXELS_Y as u32);
        }

        let mut row = [0u8; PIXELS_X];
        for y in 0..PIXELS_Y {
            vdp.scanline(y as u8, &mut row);
            let line = y * PIXELS_X;
            for (x, &index) in row.iter().enumerate() {
                self.frame.pixels[line + x] = self.palette.get_color(index as usize);
            }
        }
    }
}

impl Default for VdpRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for VdpRenderer {
    fn get_frame(&self) -> &Frame {
        &self.frame
    }

    fn clear(&mut self, color: u32) {
        self.frame.fill(color);
    }

    fn reset(&mut self) {
        self.clear(0xFF000000);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.frame = Frame::new(width, height);
    }

    fn name(&self) -> &str {
        "TMS9918A Software Renderer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_creation() {
        let renderer = VdpRenderer::new();
        assert_eq!(renderer.get_frame().width, 256);
        assert_eq!(renderer.get_frame().height, 192);
        assert_eq!(renderer.name(), "TMS9918A Software Renderer");
        assert!(!renderer.is_hardware_accelerated());
    }

    #[test]
    fn test_blanked_frame_uses_backdrop_palette_entry() {
        let mut vdp = Tms9918a::new();
        // Display off, backdrop = cyan
        vdp.write_addr(0x07);
        vdp.write_addr(0x87);

        let mut renderer = VdpRenderer::new();
        renderer.render_frame(&mut vdp);

        let frame = renderer.get_frame();
        assert!(frame.pixels.iter().all(|&p| p == TMS9918A_PALETTE[7]));
    }

    #[test]
    fn test_render_frame_raises_int() {
        let mut vdp = Tms9918a::new();
        // Display on so the scanlines reach the frame marker
        vdp.write_addr(0x40);
        vdp.write_addr(0x81);

        let mut renderer = VdpRenderer::new();
        renderer.render_frame(&mut vdp);

        assert_ne!(vdp.read_status() & crate::vdp::STATUS_INT, 0);
    }

    #[test]
    fn test_render_frame_restores_native_resolution() {
        let mut vdp = Tms9918a::new();
        let mut renderer = VdpRenderer::new();
        renderer.resize(64, 64);
        renderer.render_frame(&mut vdp);
        assert_eq!(renderer.get_frame().pixels.len(), 256 * 192);
    }
}
