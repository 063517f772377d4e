//! TMS9918A device core: VRAM, registers, host ports, and scanline generation.
//!
//! The chip is driven entirely through two byte-wide ports plus a status
//! read, exactly like the real part:
//!
//! - **Address port (MODE = 1)**: two-byte commands. The first byte holds
//!   the low 8 address bits; bit 7 of the second byte selects between a
//!   register write and an address set.
//! - **Data port (MODE = 0)**: VRAM reads/writes at the current address,
//!   which auto-increments.
//! - **Status**: vertical interrupt, sprite collision, and fifth-sprite
//!   flags with read-to-clear semantics on INT and COL.
//!
//! Rendering is scanline-based. The host calls [`Tms9918a::scanline`] once
//! per visible line (0..192) in increasing order and receives a 256-entry
//! row of palette indices; mapping indices to RGB is the renderer's job.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use thiserror::Error;
use vdp_core::logging::{log, LogCategory, LogLevel};

/// Horizontal resolution in pixels.
pub const PIXELS_X: usize = 256;
/// Visible scanlines per frame.
pub const PIXELS_Y: usize = 192;
/// Number of write-only control registers.
pub const NUM_REGISTERS: usize = 8;
/// Sprite slots in the attribute table.
pub const MAX_SPRITES: usize = 32;
/// Vertical position value that terminates the sprite attribute scan.
pub const LAST_SPRITE_VPOS: u8 = 0xD0;

/// Status bit 7: vertical interrupt.
pub const STATUS_INT: u8 = 0x80;
/// Status bit 6: fifth sprite on a scanline.
pub const STATUS_5S: u8 = 0x40;
/// Status bit 5: sprite collision.
pub const STATUS_COL: u8 = 0x20;

const VRAM_SIZE: usize = 1 << 14; // 16 KB
const ADDRESS_MASK: u16 = 0x3FFF;

const GRAPHICS_NUM_COLS: usize = 32;
const GRAPHICS_CHAR_WIDTH: usize = 8;
const TEXT_NUM_COLS: usize = 40;
const TEXT_CHAR_WIDTH: usize = 6;

const SPRITE_ATTR_BYTES: u16 = 4;
const MAX_SCANLINE_SPRITES: u32 = 4;

/// Color index 0 falls through to the backdrop wherever it is drawn.
const TRANSPARENT: u8 = 0;

const STATE_VERSION: u64 = 1;

/// Display mode, decoded from registers 0 and 1 after every register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoMode {
    /// 32x24 tiles of 8x8, one color byte per group of 8 patterns
    GraphicsI,
    /// 32x24 tiles of 8x8 with per-row colors, three 2 KB pattern/color pages
    GraphicsII,
    /// 32x24 tiles holding 4x4 colored blocks
    Multicolor,
    /// 40x24 cells of 6x8, colors from register 7, no sprites
    Text,
}

/// Errors from restoring a device snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("snapshot field `{0}` is missing or mistyped")]
    Malformed(&'static str),
    #[error("unsupported snapshot version {0}")]
    Version(u64),
    #[error("snapshot VRAM is {0} bytes, expected 16384")]
    VramLength(usize),
}

/// TMS9918A video display processor.
///
/// # State
///
/// - `vram`: 16 KB video memory, addressed through a 14-bit mask
/// - `registers`: 8 write-only control registers
/// - `status`: INT / 5S / COL flags plus the 5-bit sprite index
/// - `current_address` / `addr_latch`: the two-byte address port protocol
/// - `mode`: decoded display mode, kept in sync with registers 0 and 1
/// - `row_sprite_bits`: per-scanline sprite coverage, used for collision
///   detection; only valid within a single `scanline` call
pub struct Tms9918a {
    vram: [u8; VRAM_SIZE],
    registers: [u8; NUM_REGISTERS],
    status: u8,
    // Address port latch: set between the first and second command byte
    addr_latch: bool,
    current_address: u16,
    mode: VideoMode,
    row_sprite_bits: [bool; PIXELS_X],
}

impl Tms9918a {
    /// Create a device in cold-reset state.
    ///
    /// Registers, status, and the address latch are zeroed; VRAM powers up
    /// as all 0xFF, matching the observed behavior of the real chip.
    pub fn new() -> Self {
        Self {
            vram: [0xFF; VRAM_SIZE],
            registers: [0; NUM_REGISTERS],
            status: 0,
            addr_latch: false,
            current_address: 0,
            mode: VideoMode::GraphicsI,
            row_sprite_bits: [false; PIXELS_X],
        }
    }

    /// Cold reset: equivalent to power-cycling the part.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Write a byte to the address port (MODE = 1).
    ///
    /// First byte of a pair: assigns the low 8 bits of the current address
    /// (high bits cleared). Second byte: if bit 7 is set, the first byte is
    /// reinterpreted as a register value and stored in register `data & 7`;
    /// otherwise the low 6 bits are merged in as the high address bits.
    pub fn write_addr(&mut self, data: u8) {
        if self.addr_latch {
            if data & 0x80 != 0 {
                // Register write; the low byte was pre-committed to the
                // address latch and is lifted back out of it here
                let reg = (data & 0x07) as usize;
                let value = (self.current_address & 0xFF) as u8;
                self.registers[reg] = value;

                let old_mode = self.mode;
                self.mode = self.decode_mode();
                log(LogCategory::Registers, LogLevel::Trace, || {
                    format!("R{} <- {:02X}", reg, value)
                });
                if self.mode != old_mode {
                    log(LogCategory::Registers, LogLevel::Debug, || {
                        format!("display mode -> {:?}", self.mode)
                    });
                }
            } else {
                self.current_address |= ((data & 0x3F) as u16) << 8;
                log(LogCategory::Io, LogLevel::Trace, || {
                    format!("address -> {:04X}", self.current_address)
                });
            }
            self.addr_latch = false;
        } else {
            self.current_address = data as u16;
            self.addr_latch = true;
        }
    }

    /// Write a byte to the data port (MODE = 0), then advance the address.
    pub fn write_data(&mut self, data: u8) {
        self.addr_latch = false;
        self.vram[(self.current_address & ADDRESS_MASK) as usize] = data;
        self.current_address = self.current_address.wrapping_add(1);
    }

    /// Read a byte from the data port, then advance the address.
    pub fn read_data(&mut self) -> u8 {
        self.addr_latch = false;
        let data = self.vram[(self.current_address & ADDRESS_MASK) as usize];
        self.current_address = self.current_address.wrapping_add(1);
        data
    }

    /// Read the byte at the current address without advancing it.
    pub fn peek_data(&self) -> u8 {
        self.vram[(self.current_address & ADDRESS_MASK) as usize]
    }

    /// Read the status register.
    ///
    /// INT and COL are cleared by the read. The fifth-sprite flag and the
    /// 5-bit sprite index survive until the sprite engine rewrites them.
    pub fn read_status(&mut self) -> u8 {
        let status = self.status;
        self.status &= !(STATUS_INT | STATUS_COL);
        status
    }

    /// Current value of a control register (index masked to 3 bits).
    pub fn reg(&self, reg: u8) -> u8 {
        self.registers[(reg & 0x07) as usize]
    }

    /// VRAM contents at `addr` (masked to 14 bits).
    pub fn vram(&self, addr: u16) -> u8 {
        self.vram[(addr & ADDRESS_MASK) as usize]
    }

    /// Blank flag: register 1 bit 6.
    pub fn display_enabled(&self) -> bool {
        self.registers[1] & 0x40 != 0
    }

    /// Currently decoded display mode.
    pub fn mode(&self) -> VideoMode {
        self.mode
    }

    fn decode_mode(&self) -> VideoMode {
        if self.registers[0] & 0x02 != 0 {
            return VideoMode::GraphicsII;
        }
        match (self.registers[1] & 0x18) >> 3 {
            1 => VideoMode::Multicolor,
            2 => VideoMode::Text,
            // 0b11 is undocumented on real hardware; treat as Graphics I
            _ => VideoMode::GraphicsI,
        }
    }

    // Table base addresses. Graphics II widens the color and pattern
    // tables to 6 KB each, so fewer register bits take part.

    fn name_table_addr(&self) -> u16 {
        ((self.registers[2] & 0x0F) as u16) << 10
    }

    fn color_table_addr(&self) -> u16 {
        if self.mode == VideoMode::GraphicsII {
            ((self.registers[3] & 0x80) as u16) << 6
        } else {
            (self.registers[3] as u16) << 6
        }
    }

    fn pattern_table_addr(&self) -> u16 {
        if self.mode == VideoMode::GraphicsII {
            ((self.registers[4] & 0x04) as u16) << 11
        } else {
            ((self.registers[4] & 0x07) as u16) << 11
        }
    }

    fn sprite_attr_table_addr(&self) -> u16 {
        ((self.registers[5] & 0x7F) as u16) << 7
    }

    fn sprite_pattern_table_addr(&self) -> u16 {
        ((self.registers[6] & 0x07) as u16) << 11
    }

    /// 16x16 sprites when set, 8x8 otherwise (register 1 bit 1).
    fn sprite_size_16(&self) -> bool {
        self.registers[1] & 0x02 != 0
    }

    /// 2x sprite magnification (register 1 bit 0).
    fn sprite_mag(&self) -> bool {
        self.registers[1] & 0x01 != 0
    }

    /// Backdrop color: low nibble of register 7.
    fn main_bg_color(&self) -> u8 {
        self.registers[7] & 0x0F
    }

    /// Text foreground: high nibble of register 7.
    fn main_fg_color(&self) -> u8 {
        let c = self.registers[7] >> 4;
        if c == TRANSPARENT {
            self.main_bg_color()
        } else {
            c
        }
    }

    fn fg_color(&self, color_byte: u8) -> u8 {
        let c = color_byte >> 4;
        if c == TRANSPARENT {
            self.main_bg_color()
        } else {
            c
        }
    }

    fn bg_color(&self, color_byte: u8) -> u8 {
        let c = color_byte & 0x0F;
        if c == TRANSPARENT {
            self.main_bg_color()
        } else {
            c
        }
    }

    #[inline]
    fn vram_at(&self, addr: u16) -> u8 {
        self.vram[(addr & ADDRESS_MASK) as usize]
    }

    /// Render visible scanline `y` into `row` as palette indices 0..15.
    ///
    /// Lines must be issued in increasing order within a frame: the sprite
    /// pass on line 0 clears the status byte, and line 191 raises INT.
    /// A blanked display or an out-of-range `y` fills the row with the
    /// backdrop color and renders nothing else.
    pub fn scanline(&mut self, y: u8, row: &mut [u8; PIXELS_X]) {
        if !self.display_enabled() || y as usize >= PIXELS_Y {
            row.fill(self.main_bg_color());
            return;
        }

        match self.mode {
            VideoMode::GraphicsI => self.graphics_i_scanline(y, row),
            VideoMode::GraphicsII => self.graphics_ii_scanline(y, row),
            VideoMode::Text => self.text_scanline(y, row),
            VideoMode::Multicolor => self.multicolor_scanline(y, row),
        }

        if y as usize == PIXELS_Y - 1 {
            self.status |= STATUS_INT;
            log(LogCategory::Render, LogLevel::Trace, || {
                "frame complete, INT raised".to_string()
            });
        }
    }

    fn graphics_i_scanline(&mut self, y: u8, row: &mut [u8; PIXELS_X]) {
        let text_row = (y / 8) as u16;
        let pattern_row = (y % 8) as u16;

        let names_addr = self.name_table_addr() + text_row * GRAPHICS_NUM_COLS as u16;
        let pattern_base = self.pattern_table_addr();
        let color_base = self.color_table_addr();

        for tile_x in 0..GRAPHICS_NUM_COLS {
            let pattern = self.vram_at(names_addr + tile_x as u16) as u16;
            let mut pattern_byte = self.vram_at(pattern_base + pattern * 8 + pattern_row);
            // One color byte covers 8 consecutive patterns
            let color_byte = self.vram_at(color_base + pattern / 8);

            let fg = self.fg_color(color_byte);
            let bg = self.bg_color(color_byte);

            for i in 0..GRAPHICS_CHAR_WIDTH {
                row[tile_x * GRAPHICS_CHAR_WIDTH + i] =
                    if pattern_byte & 0x80 != 0 { fg } else { bg };
                pattern_byte <<= 1;
            }
        }

        self.output_sprites(y, row);
    }

    fn graphics_ii_scanline(&mut self, y: u8, row: &mut [u8; PIXELS_X]) {
        let text_row = (y / 8) as u16;
        let pattern_row = (y % 8) as u16;

        let names_addr = self.name_table_addr() + text_row * GRAPHICS_NUM_COLS as u16;

        // Each vertical third of the screen addresses its own 2 KB page
        // within the pattern and color tables (0, 0x800, 0x1000).
        let page_offset = (text_row & 0x18) << 8;

        let pattern_base = self.pattern_table_addr() + page_offset;
        let color_base = self.color_table_addr() + page_offset;

        for tile_x in 0..GRAPHICS_NUM_COLS {
            let pattern = self.vram_at(names_addr + tile_x as u16) as u16;
            let mut pattern_byte = self.vram_at(pattern_base + pattern * 8 + pattern_row);
            // Unlike Graphics I, every pattern row has its own color byte
            let color_byte = self.vram_at(color_base + pattern * 8 + pattern_row);

            let fg = self.fg_color(color_byte);
            let bg = self.bg_color(color_byte);

            for i in 0..GRAPHICS_CHAR_WIDTH {
                row[tile_x * GRAPHICS_CHAR_WIDTH + i] =
                    if pattern_byte & 0x80 != 0 { fg } else { bg };
                pattern_byte <<= 1;
            }
        }

        self.output_sprites(y, row);
    }

    fn text_scanline(&mut self, y: u8, row: &mut [u8; PIXELS_X]) {
        let text_row = (y / 8) as u16;
        let pattern_row = (y % 8) as u16;

        let names_addr = self.name_table_addr() + text_row * TEXT_NUM_COLS as u16;
        let pattern_base = self.pattern_table_addr();

        let bg = self.main_bg_color();
        let fg = self.main_fg_color();

        // 40 cells of 6 pixels leave 16 pixels of border
        row[..8].fill(bg);

        let mut x = 8;
        for tile_x in 0..TEXT_NUM_COLS {
            let pattern = self.vram_at(names_addr + tile_x as u16) as u16;
            let mut pattern_byte = self.vram_at(pattern_base + pattern * 8 + pattern_row);

            for _ in 0..TEXT_CHAR_WIDTH {
                row[x] = if pattern_byte & 0x80 != 0 { fg } else { bg };
                pattern_byte <<= 1;
                x += 1;
            }
        }

        row[x..].fill(bg);
        // no sprites in text mode
    }

    fn multicolor_scanline(&mut self, y: u8, row: &mut [u8; PIXELS_X]) {
        let text_row = (y / 8) as u16;
        // Each name entry selects an 8-byte pattern, of which two bytes
        // serve each 4-line stripe: row pairs interleave down the tile
        let pattern_row = (y as u16 / 4) % 2 + (text_row % 4) * 2;

        let names_addr = self.name_table_addr() + text_row * GRAPHICS_NUM_COLS as u16;
        let pattern_base = self.pattern_table_addr();

        for tile_x in 0..GRAPHICS_NUM_COLS {
            let pattern = self.vram_at(names_addr + tile_x as u16) as u16;
            let color_byte = self.vram_at(pattern_base + pattern * 8 + pattern_row);

            let fg = self.fg_color(color_byte);
            let bg = self.bg_color(color_byte);

            let base = tile_x * GRAPHICS_CHAR_WIDTH;
            row[base..base + 4].fill(fg);
            row[base + 4..base + 8].fill(bg);
        }

        self.output_sprites(y, row);
    }

    /// Overlay sprites onto a rendered background row and update status.
    ///
    /// Scans attribute slots in order until the 0xD0 sentinel or the slot
    /// limit. Sprites beyond the fourth on a line latch the fifth-sprite
    /// flag and stop the scan. Transparent sprites plot no pixels but
    /// still take part in collision and limit accounting.
    fn output_sprites(&mut self, y: u8, row: &mut [u8; PIXELS_X]) {
        let size: i32 = if self.sprite_size_16() { 16 } else { 8 };
        let mag = self.sprite_mag();
        let sprite_width = size * if mag { 2 } else { 1 };

        let attr_table = self.sprite_attr_table_addr();
        let pattern_table = self.sprite_pattern_table_addr();

        let mut sprites_shown = 0u32;

        if y == 0 {
            self.status = 0;
        }

        for i in 0..MAX_SPRITES {
            let attr_addr = attr_table + i as u16 * SPRITE_ATTR_BYTES;

            let mut vpos = self.vram_at(attr_addr) as i32;

            if vpos == LAST_SPRITE_VPOS as i32 {
                // Terminator: record how far the scan got, but never
                // disturb an already-latched fifth-sprite index
                if self.status & STATUS_5S == 0 {
                    self.status |= i as u8;
                }
                break;
            }

            // Positions above 0xE0 straddle the top edge of the screen
            if vpos > 0xE0 {
                vpos -= 256;
            }
            vpos += 1;

            let mut pattern_row = y as i32 - vpos;
            if mag {
                pattern_row /= 2;
            }

            // Off this line: skip without charging the per-line limit
            if pattern_row < 0 || pattern_row >= size {
                continue;
            }

            let sprite_color = self.vram_at(attr_addr + 3) & 0x0F;

            if sprites_shown == 0 {
                // First sprite on this line owns a fresh coverage buffer
                self.row_sprite_bits.fill(false);
            }

            sprites_shown += 1;
            if sprites_shown > MAX_SCANLINE_SPRITES {
                if self.status & STATUS_5S == 0 {
                    self.status |= STATUS_5S | i as u8;
                }
                log(LogCategory::Sprites, LogLevel::Debug, || {
                    format!("fifth sprite on line {}: slot {}", y, i)
                });
                break;
            }

            let pattern_name = self.vram_at(attr_addr + 2) as u16;
            let pattern_offset = pattern_table + pattern_name * 8 + pattern_row as u16;

            let mut hpos = self.vram_at(attr_addr + 1) as i32;
            if self.vram_at(attr_addr + 3) & 0x80 != 0 {
                // Early clock: shift 32 pixels left for left-edge entry
                hpos -= 32;
            }

            let mut pattern_byte = self.vram_at(pattern_offset);
            let mut pattern_bit = 0u32;
            let mut screen_bit = 0i32;

            for screen_x in hpos..hpos + sprite_width {
                if screen_x >= PIXELS_X as i32 {
                    break;
                }

                if screen_x >= 0 && pattern_byte & (0x80 >> pattern_bit) != 0 {
                    if sprite_color != TRANSPARENT {
                        row[screen_x as usize] = sprite_color;
                    }
                    if self.row_sprite_bits[screen_x as usize] {
                        self.status |= STATUS_COL;
                    }
                    self.row_sprite_bits[screen_x as usize] = true;
                }

                // The pattern advances every other column when magnified;
                // bit 8 rolls into the right half of a 16x16, stored 16
                // bytes after the left half
                if !mag || screen_bit & 1 != 0 {
                    pattern_bit += 1;
                    if pattern_bit == 8 {
                        pattern_bit = 0;
                        pattern_byte = self.vram_at(pattern_offset + 16);
                    }
                }
                screen_bit += 1;
            }
        }
    }

    /// Snapshot the full device state as JSON.
    ///
    /// VRAM is base64-packed; the per-scanline sprite coverage buffer is
    /// scratch and not part of the snapshot.
    pub fn save_state(&self) -> Value {
        json!({
            "version": STATE_VERSION,
            "registers": self.registers.to_vec(),
            "status": self.status,
            "addr_latch": self.addr_latch,
            "current_address": self.current_address,
            "vram": BASE64.encode(&self.vram[..]),
        })
    }

    /// Restore device state from a [`Tms9918a::save_state`] snapshot.
    ///
    /// The device is left untouched unless the whole snapshot validates.
    /// The display mode is re-derived from the restored registers.
    pub fn load_state(&mut self, state: &Value) -> Result<(), StateError> {
        let version = state
            .get("version")
            .and_then(Value::as_u64)
            .ok_or(StateError::Malformed("version"))?;
        if version != STATE_VERSION {
            return Err(StateError::Version(version));
        }

        let vram = state
            .get("vram")
            .and_then(Value::as_str)
            .ok_or(StateError::Malformed("vram"))
            .and_then(|s| BASE64.decode(s).map_err(|_| StateError::Malformed("vram")))?;
        if vram.len() != VRAM_SIZE {
            return Err(StateError::VramLength(vram.len()));
        }

        let reg_values = state
            .get("registers")
            .and_then(Value::as_array)
            .ok_or(StateError::Malformed("registers"))?;
        let mut registers = [0u8; NUM_REGISTERS];
        if reg_values.len() != NUM_REGISTERS {
            return Err(StateError::Malformed("registers"));
        }
        for (reg, value) in registers.iter_mut().zip(reg_values) {
            *reg = value
                .as_u64()
                .filter(|v| *v <= u8::MAX as u64)
                .ok_or(StateError::Malformed("registers"))? as u8;
        }

        let status = state
            .get("status")
            .and_then(Value::as_u64)
            .ok_or(StateError::Malformed("status"))?;
        let addr_latch = state
            .get("addr_latch")
            .and_then(Value::as_bool)
            .ok_or(StateError::Malformed("addr_latch"))?;
        let current_address = state
            .get("current_address")
            .and_then(Value::as_u64)
            .ok_or(StateError::Malformed("current_address"))?;

        self.vram.copy_from_slice(&vram);
        self.registers = registers;
        self.status = status as u8;
        self.addr_latch = addr_latch;
        self.current_address = current_address as u16;
        self.mode = self.decode_mode();
        Ok(())
    }
}

impl Default for Tms9918a {
    fn default() -> Self {
        Self::new()
    }
}
