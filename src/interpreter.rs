//! # interpreter
//!
//! The machine state is one aggregate owned by whoever drives it (the
//! scheduler in a real session, the test in a test):
//!  * V0-VF     16 8bit registers; VF doubles as carry/borrow/collision flag
//!  * I         16bit index register for memory and sprite instructions
//!  * PC        16bit program counter, 0x200 on reset, always even
//!  * stack     16 return addresses and a stack pointer
//!  * memory    4K, font at 0x000, program at 0x200, display page at 0xf00
//!  * timers    delay and sound, counted down at 60Hz from outside
//!  * keypad    16bit key mask, written from outside
//!
//! `step` runs exactly one fetch/decode/execute and reports whether the
//! instruction completed or is waiting on the keypad.
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;

use crate::error::{Chip8Error, Fault};
use crate::input::Keypad;
use crate::instruction::Instruction;
use crate::memory::{Chip8MemoryMap, MemoryMap};
use crate::timer::Timers;

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const INSTRUCTION_WIDTH: u16 = 2;

/// index of the flags register
pub const VF: usize = 0xF;

/// what became of an executed instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// PC has moved on
    Next,
    /// Fx0A with no key down: PC still points at it, run it again next tick
    WaitForKey,
}

pub struct Chip8Interpreter {
    pub(crate) memory: Chip8MemoryMap,
    pub(crate) v: [u8; REGISTER_COUNT],
    pub(crate) i: u16,
    pub(crate) program_counter: u16,
    pub(crate) stack: [u16; STACK_DEPTH],
    pub(crate) stack_pointer: usize,
    pub(crate) timers: Timers,
    pub(crate) keypad: Keypad,
    pub(crate) rng: StdRng,
}

impl Chip8Interpreter {
    /// fresh machine; `seed` pins the RND sequence
    pub fn new(seed: Option<u64>) -> Self {
        let memory = Chip8MemoryMap::new();
        let program_counter = memory.program_addr;
        Chip8Interpreter {
            memory,
            v: [0; REGISTER_COUNT],
            i: 0,
            program_counter,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            timers: Timers::default(),
            keypad: Keypad::default(),
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        self.memory.load_program(reader)
    }

    /// fetch, decode and execute one instruction
    pub fn step(&mut self) -> Result<Flow, Fault> {
        let pc = self.program_counter;
        if pc % INSTRUCTION_WIDTH != 0 {
            return Err(Fault::MisalignedPc(pc));
        }
        let instruction = Instruction::decode(self.memory.get_word(pc)?);

        // handlers see PC already pointing at the next instruction
        self.program_counter = pc.wrapping_add(INSTRUCTION_WIDTH);
        match self.execute(instruction) {
            Ok(Flow::Next) => Ok(Flow::Next),
            Ok(Flow::WaitForKey) => {
                self.program_counter = pc;
                Ok(Flow::WaitForKey)
            }
            Err(fault) => {
                self.program_counter = pc;
                Err(fault)
            }
        }
    }

    /// one 60Hz timer tick
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    pub fn key_down(&mut self, key: u8, generation: u64) {
        self.keypad.press(key, generation);
    }

    pub fn key_up(&mut self, key: u8, generation: u64) -> bool {
        self.keypad.release(key, generation)
    }

    pub fn frame_buffer(&self) -> &[u8] {
        self.memory.frame_buffer()
    }

    pub fn sound_active(&self) -> bool {
        self.timers.sound.is_running()
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.v
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay.get()
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound.get()
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }
}
