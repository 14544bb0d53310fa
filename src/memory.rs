use std::io;
use std::ops::Range;

use crate::display::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::{Chip8Error, Fault};

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the addressable memory of the machine. Every access is bounds
/// checked and reports a `Fault` rather than panicking.
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), Fault> {
        self.get_rw_slice(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    fn get_byte(&self, addr: u16) -> Result<u8, Fault> {
        Ok(self.get_ro_slice(addr, 1)?[0])
    }

    /// get a big-endian two-byte word (instructions)
    fn get_word(&self, addr: u16) -> Result<u16, Fault> {
        let word = self.get_ro_slice(addr, 2)?;
        Ok(((word[0] as u16) << 8) | (word[1] as u16))
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Fault>;

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Fault>;
}

/// Defines the memory map used by this interpreter (4K):
///   0x0000-0x004f  built-in font, 16 glyphs of 5 bytes
///   0x0050-0x01ff  unused (interpreter area on the original hardware)
///   0x0200-0x0fff  program
///   0x0f00-0x0fff  display, shared with the tail of the program area
///
/// the call stack is not kept in this address space
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub font_addr: u16,
    pub program_addr: u16,
    pub display_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Fault> {
        let span = self.span(addr, len)?;
        Ok(&mut self.bytes[span])
    }

    fn get_ro_slice(&self, addr: u16, len: usize) -> Result<&[u8], Fault> {
        let span = self.span(addr, len)?;
        Ok(&self.bytes[span])
    }
}

/// how much RAM we have
pub const CHIP8_RAM_SIZE_BYTES: usize = 4096;

/// the display page is the last page of RAM
const CHIP8_DISPLAY_OFFSET: usize = 0x100;

/// 64x32 pixels at one bit each
pub const DISPLAY_SIZE_BYTES: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT / 8;

/// where the program is loaded
pub const CHIP8_PROGRAM_ADDR: u16 = 0x0200;

/// largest program image that fits above the load address
pub const MAX_PROGRAM_SIZE: usize = CHIP8_RAM_SIZE_BYTES - CHIP8_PROGRAM_ADDR as usize;

pub const CHIP8_FONT_ADDR: u16 = 0x000;
pub const FONT_GLYPH_BYTES: u16 = 5;

impl Chip8MemoryMap {
    /// zeroed memory with the font baked in at 0x000
    pub fn new() -> Self {
        let mut bytes = vec![0u8; CHIP8_RAM_SIZE_BYTES].into_boxed_slice();
        let font = CHIP8_FONT_ADDR as usize;
        bytes[font..font + CHIP8_CONTEMPORARY_FONT.len()].copy_from_slice(&CHIP8_CONTEMPORARY_FONT);
        Chip8MemoryMap {
            bytes,
            font_addr: CHIP8_FONT_ADDR,
            program_addr: CHIP8_PROGRAM_ADDR,
            display_addr: (CHIP8_RAM_SIZE_BYTES - CHIP8_DISPLAY_OFFSET) as u16,
        }
    }

    /// load a CHIP-8 program at 0x200, returning its length
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        if len > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::ProgramTooLarge {
                size: len,
                max: MAX_PROGRAM_SIZE,
            });
        }
        let start = self.program_addr as usize;
        self.bytes[start..start + len].copy_from_slice(&buf);
        Ok(len)
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn font_sprite_addr(&self, digit: u8) -> u16 {
        self.font_addr + (digit & 0x0f) as u16 * FONT_GLYPH_BYTES
    }

    /// the packed 64x32 bitmap, row-major, MSB first
    pub fn frame_buffer(&self) -> &[u8] {
        let a = self.display_addr as usize;
        &self.bytes[a..a + DISPLAY_SIZE_BYTES]
    }

    pub fn frame_buffer_mut(&mut self) -> &mut [u8] {
        let a = self.display_addr as usize;
        &mut self.bytes[a..a + DISPLAY_SIZE_BYTES]
    }

    fn span(&self, addr: u16, len: usize) -> Result<Range<usize>, Fault> {
        let a = addr as usize;
        if a + len > self.bytes.len() {
            return Err(Fault::AddressOutOfBounds { addr, len });
        }
        Ok(a..(a + len))
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
