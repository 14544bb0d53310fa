use clap::{Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// which host keys stand in for the 16-key pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyLayout {
    /// 1234 / qwer / asdf / zxcv, laid out like the original keypad
    Conventional,
    /// 0-9 and a-f
    Literal,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "chip8", version, about = "CHIP-8 interpreter for the terminal")]
pub struct Config {
    /// program image to load at 0x200
    pub rom: PathBuf,

    /// instructions per second
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u32).range(1..))]
    pub speed: u32,

    /// delay/sound timer rate in Hz
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub timer_hz: u32,

    /// how long a key stays down after the terminal last reported it
    #[arg(long, default_value_t = 100)]
    pub key_hold_ms: u64,

    #[arg(long, value_enum, default_value_t = KeyLayout::Conventional)]
    pub keymap: KeyLayout,

    /// seed for the RND instruction, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// the terminal belongs to the display, so diagnostics go here
    #[arg(long, default_value = "chip8.log")]
    pub log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,
}

impl Config {
    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }
}
