use std::fmt;

use crate::memory::{CHIP8_PROGRAM_ADDR, MAX_PROGRAM_SIZE};

/// A raw 16-bit instruction word and the fields every instruction is built from:
///
/// ```text
///   kind x    y    n
///   1101 0001 0010 1111   (0xD12F)
///        |--- addr ---|   low 12 bits
///             |- kk --|   low byte
/// ```
///
/// decoding fields never fails; whether they mean anything is up to `Instruction::decode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub fn addr(self) -> u16 {
        self.0 & 0x0fff
    }

    pub fn x(self) -> u8 {
        ((self.0 & 0x0f00) >> 8) as u8
    }

    pub fn y(self) -> u8 {
        ((self.0 & 0x00f0) >> 4) as u8
    }

    pub fn kk(self) -> u8 {
        (self.0 & 0x00ff) as u8
    }

    pub fn n(self) -> u8 {
        (self.0 & 0x000f) as u8
    }

    pub fn nibbles(self) -> (u8, u8, u8, u8) {
        ((self.0 >> 12) as u8, self.x(), self.y(), self.n())
    }
}

/// The full instruction catalogue. Register operands are indices 0x0-0xF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 0nnn, machine code routine; ignored
    Sys(u16),
    /// 1nnn
    Jp(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SeImm { x: u8, kk: u8 },
    /// 4xkk
    SneImm { x: u8, kk: u8 },
    /// 5xy0
    SeReg { x: u8, y: u8 },
    /// 6xkk
    LdImm { x: u8, kk: u8 },
    /// 7xkk, no carry
    AddImm { x: u8, kk: u8 },
    /// 8xy0
    LdReg { x: u8, y: u8 },
    /// 8xy1
    Or { x: u8, y: u8 },
    /// 8xy2
    And { x: u8, y: u8 },
    /// 8xy3
    Xor { x: u8, y: u8 },
    /// 8xy4, VF = carry
    AddReg { x: u8, y: u8 },
    /// 8xy5, VF = not borrow
    Sub { x: u8, y: u8 },
    /// 8xy6, VF = bit shifted out; y is ignored
    Shr { x: u8, y: u8 },
    /// 8xy7, VF = not borrow
    Subn { x: u8, y: u8 },
    /// 8xyE, VF = bit shifted out; y is ignored
    Shl { x: u8, y: u8 },
    /// 9xy0
    SneReg { x: u8, y: u8 },
    /// Annn
    LdI(u16),
    /// Bnnn
    JpV0(u16),
    /// Cxkk
    Rnd { x: u8, kk: u8 },
    /// Dxyn
    Drw { x: u8, y: u8, n: u8 },
    /// Ex9E
    Skp { x: u8 },
    /// ExA1
    Sknp { x: u8 },
    /// Fx07
    LdVxDt { x: u8 },
    /// Fx0A, waits for a key
    LdVxK { x: u8 },
    /// Fx15
    LdDtVx { x: u8 },
    /// Fx18
    LdStVx { x: u8 },
    /// Fx1E
    AddI { x: u8 },
    /// Fx29
    LdF { x: u8 },
    /// Fx33
    LdB { x: u8 },
    /// Fx55
    StoreRegs { x: u8 },
    /// Fx65
    LoadRegs { x: u8 },
    /// anything else
    Unknown(u16),
}

impl Instruction {
    pub fn decode(word: u16) -> Instruction {
        use Instruction::*;

        let op = Opcode(word);
        let (x, y, kk, n, addr) = (op.x(), op.y(), op.kk(), op.n(), op.addr());
        match op.nibbles() {
            (0x0, 0x0, 0xE, 0x0) => Cls,
            (0x0, 0x0, 0xE, 0xE) => Ret,
            (0x0, ..) => Sys(addr),
            (0x1, ..) => Jp(addr),
            (0x2, ..) => Call(addr),
            (0x3, ..) => SeImm { x, kk },
            (0x4, ..) => SneImm { x, kk },
            (0x5, .., 0x0) => SeReg { x, y },
            (0x6, ..) => LdImm { x, kk },
            (0x7, ..) => AddImm { x, kk },
            (0x8, .., 0x0) => LdReg { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => AddReg { x, y },
            (0x8, .., 0x5) => Sub { x, y },
            (0x8, .., 0x6) => Shr { x, y },
            (0x8, .., 0x7) => Subn { x, y },
            (0x8, .., 0xE) => Shl { x, y },
            (0x9, .., 0x0) => SneReg { x, y },
            (0xA, ..) => LdI(addr),
            (0xB, ..) => JpV0(addr),
            (0xC, ..) => Rnd { x, kk },
            (0xD, ..) => Drw { x, y, n },
            (0xE, _, 0x9, 0xE) => Skp { x },
            (0xE, _, 0xA, 0x1) => Sknp { x },
            (0xF, _, 0x0, 0x7) => LdVxDt { x },
            (0xF, _, 0x0, 0xA) => LdVxK { x },
            (0xF, _, 0x1, 0x5) => LdDtVx { x },
            (0xF, _, 0x1, 0x8) => LdStVx { x },
            (0xF, _, 0x1, 0xE) => AddI { x },
            (0xF, _, 0x2, 0x9) => LdF { x },
            (0xF, _, 0x3, 0x3) => LdB { x },
            (0xF, _, 0x5, 0x5) => StoreRegs { x },
            (0xF, _, 0x6, 0x5) => LoadRegs { x },
            _ => Unknown(word),
        }
    }
}

/// assembler-style text, as used by the disassembler
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Sys(addr) => write!(f, "SYS 0x{:03X}", addr),
            Jp(addr) => write!(f, "JP 0x{:03X}", addr),
            Call(addr) => write!(f, "CALL 0x{:03X}", addr),
            SeImm { x, kk } => write!(f, "SE V{:X}, ${:02X}", x, kk),
            SneImm { x, kk } => write!(f, "SNE V{:X}, ${:02X}", x, kk),
            SeReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LdImm { x, kk } => write!(f, "LD V{:X}, ${:02X}", x, kk),
            AddImm { x, kk } => write!(f, "ADD V{:X}, ${:02X}", x, kk),
            LdReg { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            Shr { x, y } => write!(f, "SHR V{:X} {{, V{:X}}}", x, y),
            Subn { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Shl { x, y } => write!(f, "SHL V{:X} {{, V{:X}}}", x, y),
            SneReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LdI(addr) => write!(f, "LD I, ${:03X}", addr),
            JpV0(addr) => write!(f, "JP V0, ${:03X}", addr),
            Rnd { x, kk } => write!(f, "RND V{:X}, ${:02X}", x, kk),
            Drw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, ${:X}", x, y, n),
            Skp { x } => write!(f, "SKP V{:X}", x),
            Sknp { x } => write!(f, "SKNP V{:X}", x),
            LdVxDt { x } => write!(f, "LD V{:X}, DT", x),
            LdVxK { x } => write!(f, "LD V{:X}, K", x),
            LdDtVx { x } => write!(f, "LD DT, V{:X}", x),
            LdStVx { x } => write!(f, "LD ST, V{:X}", x),
            AddI { x } => write!(f, "ADD I, V{:X}", x),
            LdF { x } => write!(f, "LD F, V{:X}", x),
            LdB { x } => write!(f, "LD B, V{:X}", x),
            StoreRegs { x } => write!(f, "LD [I], V{:X}", x),
            LoadRegs { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(word) => write!(f, "DW 0x{:04X}", word),
        }
    }
}

/// walk a program image two bytes at a time, as if loaded at 0x200, yielding
/// (address, word, instruction); a trailing odd byte is padded with zero and
/// anything that wouldn't fit in memory is left out
pub fn listing(program: &[u8]) -> impl Iterator<Item = (u16, u16, Instruction)> + '_ {
    let fits = program.len().min(MAX_PROGRAM_SIZE);
    program[..fits].chunks(2).enumerate().map(|(i, pair)| {
        let word = ((pair[0] as u16) << 8) | (*pair.get(1).unwrap_or(&0) as u16);
        let addr = CHIP8_PROGRAM_ADDR + (i as u16) * 2;
        (addr, word, Instruction::decode(word))
    })
}
