use std::io;
use thiserror::Error;

/// Fatal errors: anything that stops a session before (or instead of) running it.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("program image is {size} bytes, at most {max} bytes fit above 0x200")]
    ProgramTooLarge { size: usize, max: usize },
}

/// Raised by a single instruction. The instruction that faults leaves the
/// machine untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("memory access out of bounds at {addr:#06x} (+{len} bytes)")]
    AddressOutOfBounds { addr: u16, len: usize },

    #[error("program counter {0:#06x} is not instruction-aligned")]
    MisalignedPc(u16),

    #[error("stack overflow: calls nested deeper than 16 levels")]
    StackOverflow,

    #[error("stack underflow: return with no pending call")]
    StackUnderflow,
}
