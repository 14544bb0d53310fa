//! A CHIP-8 interpreter that runs in the terminal.
//!
//! ## Design
//!
//! * one owner for all machine state: the scheduler. nothing else mutates it
//! * instructions run at a fixed rate (500/s by default); the delay and sound
//!   timers decay at 60Hz regardless of how many instructions that is
//! * keyboard input is read on its own thread and queued, so a slow terminal
//!   read can never stall either cadence
//! * abstract display so can plug alternatives; starting with TUI in-console
//! * no sound: the sound timer is tracked and shown, not played
//!
//! Model
//!
//! main
//!  |-- config, logger
//!  |-- interpreter(memory, registers, stack, timers, keypad)
//!  |    `-- load program at 0x200
//!  |-- display (owns the terminal)
//!  |-- input thread -- mpsc --.
//!  `-- scheduler <------------'
//!       |-- drain queued input into the keypad; stop on quit
//!       |-- instruction due? step() then display.draw(frame buffer)
//!       |-- timer due? tick delay and sound
//!       `-- sleep until the nearer of the two deadlines
pub mod config;
pub mod display;
pub mod error;
mod execute;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod scheduler;
pub mod timer;

pub use error::{Chip8Error, Fault};
pub use interpreter::{Chip8Interpreter, Flow};
pub use scheduler::Scheduler;
