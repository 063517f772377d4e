//! Texas Instruments TMS9918A Video Display Processor emulator
//!
//! The TMS9918A drove the TI-99/4A, ColecoVision, MSX, and a generation
//! of related machines. This crate implements the programmer-visible
//! device: the host talks to it exactly as it would to the real part.
//!
//! # Architecture
//!
//! - **VRAM**: 16 KB, reachable only through the auto-incrementing data port
//! - **Registers**: 8 write-only control registers behind a two-byte
//!   address-port protocol
//! - **Modes**: Graphics I, Graphics II, Text, and Multicolor
//! - **Sprites**: 32 slots, 8x8 or 16x16, 1x or 2x magnification, 4 per
//!   scanline with collision and fifth-sprite status reporting
//! - **Output**: one 256-entry palette-indexed row per [`Tms9918a::scanline`]
//!   call; [`VdpRenderer`] assembles full ARGB frames from those rows
//!
//! Bus wiring, interrupt routing, and cycle timing belong to the host.

mod renderer;
mod vdp;

pub use renderer::{VdpRenderer, TMS9918A_PALETTE};
pub use vdp::{
    StateError, Tms9918a, VideoMode, LAST_SPRITE_VPOS, MAX_SPRITES, NUM_REGISTERS, PIXELS_X,
    PIXELS_Y, STATUS_5S, STATUS_COL, STATUS_INT,
};
