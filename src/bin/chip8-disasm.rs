use clap::Parser;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chip8_term::instruction::listing;
use chip8_term::memory::MAX_PROGRAM_SIZE;

/// Print a CHIP-8 program image as one instruction per line, as it would sit
/// in memory from 0x200. Data mixed in with code is decoded like anything else.
#[derive(Parser)]
#[command(name = "chip8-disasm", version)]
struct Args {
    /// program image
    rom: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let program = fs::read(&args.rom)?;
    if program.len() > MAX_PROGRAM_SIZE {
        eprintln!(
            "warning: {} is {} bytes, only the first {} fit in memory",
            args.rom.display(),
            program.len(),
            MAX_PROGRAM_SIZE
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (addr, word, instruction) in listing(&program) {
        writeln!(out, "0x{:03X} - {:04X}  {}", addr, word, instruction)?;
    }
    Ok(())
}
