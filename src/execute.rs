use rand::Rng;

use crate::display::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::Fault;
use crate::instruction::Instruction;
use crate::interpreter::{Chip8Interpreter, Flow, INSTRUCTION_WIDTH, STACK_DEPTH, VF};
use crate::memory::MemoryMap;

/// sprites are always one byte wide
const SPRITE_WIDTH: usize = 8;

/// tallest sprite an instruction can ask for
const SPRITE_MAX_HEIGHT: usize = 15;

impl Chip8Interpreter {
    /// Apply one decoded instruction. PC already points past it. Handlers check
    /// everything that can fault before they touch any state.
    pub(crate) fn execute(&mut self, instruction: Instruction) -> Result<Flow, Fault> {
        use Instruction::*;

        match instruction {
            Cls => self.memory.frame_buffer_mut().fill(0),
            Ret => self.ret()?,
            Sys(addr) => log::debug!("ignoring SYS 0x{:03X} at {:#05x}", addr, self.this_pc()),
            Jp(addr) => self.program_counter = addr,
            Call(addr) => self.call(addr)?,
            SeImm { x, kk } => self.skip_if(self.v[x as usize] == kk),
            SneImm { x, kk } => self.skip_if(self.v[x as usize] != kk),
            SeReg { x, y } => self.skip_if(self.v[x as usize] == self.v[y as usize]),
            SneReg { x, y } => self.skip_if(self.v[x as usize] != self.v[y as usize]),
            LdImm { x, kk } => self.v[x as usize] = kk,
            AddImm { x, kk } => self.v[x as usize] = self.v[x as usize].wrapping_add(kk),
            LdReg { x, y } => self.v[x as usize] = self.v[y as usize],
            Or { x, y } => self.v[x as usize] |= self.v[y as usize],
            And { x, y } => self.v[x as usize] &= self.v[y as usize],
            Xor { x, y } => self.v[x as usize] ^= self.v[y as usize],
            AddReg { x, y } => {
                let (sum, carry) = self.v[x as usize].overflowing_add(self.v[y as usize]);
                self.set_with_flag(x, sum, carry);
            }
            Sub { x, y } => {
                let (vx, vy) = (self.v[x as usize], self.v[y as usize]);
                self.set_with_flag(x, vx.wrapping_sub(vy), vx > vy);
            }
            Subn { x, y } => {
                let (vx, vy) = (self.v[x as usize], self.v[y as usize]);
                self.set_with_flag(x, vy.wrapping_sub(vx), vy > vx);
            }
            Shr { x, .. } => {
                let vx = self.v[x as usize];
                self.set_with_flag(x, vx >> 1, vx & 0x01 != 0);
            }
            Shl { x, .. } => {
                let vx = self.v[x as usize];
                self.set_with_flag(x, vx << 1, vx & 0x80 != 0);
            }
            LdI(addr) => self.i = addr,
            JpV0(addr) => self.program_counter = self.v[0] as u16 + addr,
            Rnd { x, kk } => self.v[x as usize] = self.rng.gen::<u8>() & kk,
            Drw { x, y, n } => self.draw(x, y, n)?,
            Skp { x } => self.skip_if(self.keypad.is_pressed(self.v[x as usize])),
            Sknp { x } => self.skip_if(!self.keypad.is_pressed(self.v[x as usize])),
            LdVxDt { x } => self.v[x as usize] = self.timers.delay.get(),
            LdVxK { x } => match self.keypad.first_pressed() {
                Some(key) => self.v[x as usize] = key,
                None => return Ok(Flow::WaitForKey),
            },
            LdDtVx { x } => self.timers.delay.set(self.v[x as usize]),
            LdStVx { x } => self.timers.sound.set(self.v[x as usize]),
            AddI { x } => self.i = self.i.wrapping_add(self.v[x as usize] as u16),
            LdF { x } => self.i = self.memory.font_sprite_addr(self.v[x as usize]),
            LdB { x } => {
                let vx = self.v[x as usize];
                self.memory.write(&[vx / 100, vx / 10 % 10, vx % 10], self.i)?;
            }
            StoreRegs { x } => {
                let regs = self.v;
                self.memory.write(&regs[..=x as usize], self.i)?;
            }
            LoadRegs { x } => {
                let src = self.memory.get_ro_slice(self.i, x as usize + 1)?;
                self.v[..=x as usize].copy_from_slice(src);
            }
            Unknown(word) => log::warn!(
                "instruction {:04X} at {:#05x} is not supported",
                word,
                self.this_pc()
            ),
        }
        Ok(Flow::Next)
    }

    /// address of the instruction being executed
    fn this_pc(&self) -> u16 {
        self.program_counter.wrapping_sub(INSTRUCTION_WIDTH)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.program_counter = self.program_counter.wrapping_add(INSTRUCTION_WIDTH);
        }
    }

    /// the result is computed from the operands before either write; VF is
    /// written last so it always holds the flag, even when x is VF
    fn set_with_flag(&mut self, x: u8, value: u8, flag: bool) {
        self.v[x as usize] = value;
        self.v[VF] = flag as u8;
    }

    fn call(&mut self, addr: u16) -> Result<(), Fault> {
        if self.stack_pointer >= STACK_DEPTH {
            return Err(Fault::StackOverflow);
        }
        self.stack[self.stack_pointer] = self.program_counter;
        self.stack_pointer += 1;
        self.program_counter = addr;
        Ok(())
    }

    fn ret(&mut self) -> Result<(), Fault> {
        if self.stack_pointer == 0 {
            return Err(Fault::StackUnderflow);
        }
        self.stack_pointer -= 1;
        self.program_counter = self.stack[self.stack_pointer];
        Ok(())
    }

    /// XOR an 8xN sprite from memory[I..I+N] onto the display at (Vx, Vy),
    /// wrapping on both axes. VF is set if any lit pixel is turned off.
    fn draw(&mut self, x: u8, y: u8, n: u8) -> Result<(), Fault> {
        let height = n as usize;
        let mut sprite = [0u8; SPRITE_MAX_HEIGHT];
        sprite[..height].copy_from_slice(self.memory.get_ro_slice(self.i, height)?);

        let (origin_x, origin_y) = (self.v[x as usize] as usize, self.v[y as usize] as usize);
        let mut collision = false;
        let frame = self.memory.frame_buffer_mut();
        for (r, row) in sprite[..height].iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                if row & (0x80 >> c) == 0 {
                    continue;
                }
                let px = (origin_x + c) % DISPLAY_WIDTH;
                let py = (origin_y + r) % DISPLAY_HEIGHT;
                let offset = py * DISPLAY_WIDTH + px;
                let mask = 0x80u8 >> (offset % 8);
                frame[offset / 8] ^= mask;
                if frame[offset / 8] & mask == 0 {
                    collision = true;
                }
            }
        }
        self.v[VF] = collision as u8;
        Ok(())
    }
}
