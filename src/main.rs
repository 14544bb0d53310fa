use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::sync::mpsc;

use chip8_term::config::Config;
use chip8_term::display::{MonoTermDisplay, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chip8_term::input::{keymap, spawn_input_thread, KeyTranslator};
use chip8_term::{Chip8Error, Chip8Interpreter, Scheduler};

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();

    // the terminal belongs to the display, so log to a file
    let log_file = File::create(&config.log_file)?;
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    // load the program before touching the terminal, so a bad image fails cleanly
    let mut interpreter = Chip8Interpreter::new(config.seed);
    let loaded = File::open(&config.rom)
        .map_err(Chip8Error::from)
        .and_then(|mut f| interpreter.load_program(&mut f));
    let len = match loaded {
        Ok(len) => len,
        Err(e) => {
            log::error!("can't load {}: {}", config.rom.display(), e);
            return Err(e.into());
        }
    };
    log::info!("loaded {} ({} bytes)", config.rom.display(), len);

    let mut display = MonoTermDisplay::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)?;
    let (tx, rx) = mpsc::channel();
    spawn_input_thread(
        KeyTranslator::new(keymap(config.keymap), config.key_hold()),
        tx,
    )?;

    Scheduler::new(
        interpreter,
        &mut display,
        rx,
        config.speed,
        config.timer_hz,
    )
    .run()?;
    Ok(())
}
