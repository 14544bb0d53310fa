//! The run loop. Three things happen at their own pace (instructions, 60Hz
//! timer decay and keyboard input) but all of them land here, on one thread,
//! so the interpreter only ever has a single writer.
use std::io;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use crate::display::Display;
use crate::input::InputEvent;
use crate::interpreter::{Chip8Interpreter, Flow};
use crate::timer::Ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

pub struct Scheduler<'a> {
    interpreter: Chip8Interpreter,
    display: &'a mut dyn Display,
    events: Receiver<InputEvent>,
    speed_hz: u32,
    timer_hz: u32,
    halted: bool,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        interpreter: Chip8Interpreter,
        display: &'a mut dyn Display,
        events: Receiver<InputEvent>,
        speed_hz: u32,
        timer_hz: u32,
    ) -> Self {
        Scheduler {
            interpreter,
            display,
            events,
            speed_hz,
            timer_hz,
            halted: false,
        }
    }

    /// run until the input side asks to quit (or goes away)
    pub fn run(&mut self) -> Result<(), io::Error> {
        self.display.clear()?;
        let start = Instant::now();
        let mut cpu = Ticker::from_hz(self.speed_hz, start);
        let mut timers = Ticker::from_hz(self.timer_hz, start);
        log::info!(
            "running at {} instructions/s, timers at {}Hz",
            self.speed_hz,
            self.timer_hz
        );

        let mut instructions: u64 = 0;
        loop {
            if self.drain_input() == Control::Stop {
                break;
            }
            let now = Instant::now();
            if cpu.poll(now) {
                self.instruction_tick()?;
                instructions += 1;
            }
            if timers.poll(now) {
                self.timer_tick();
            }

            let next = cpu.deadline().min(timers.deadline());
            let now = Instant::now();
            if next > now {
                spin_sleep::sleep(next - now);
            }
        }

        log::info!(
            "session ended after {} ticks in {:.1}s",
            instructions,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// execute one instruction (unless halted) and hand the frame to the display
    pub fn instruction_tick(&mut self) -> Result<(), io::Error> {
        if !self.halted {
            let pc = self.interpreter.program_counter();
            match self.interpreter.step() {
                Ok(Flow::Next) | Ok(Flow::WaitForKey) => {}
                Err(fault) => {
                    log::error!("halting at {:#05x}: {}", pc, fault);
                    self.halted = true;
                }
            }
        }
        self.display.draw(
            self.interpreter.frame_buffer(),
            self.interpreter.sound_active(),
        )
    }

    pub fn timer_tick(&mut self) {
        self.interpreter.tick_timers();
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Control {
        match event {
            InputEvent::KeyDown { key, generation } => {
                self.interpreter.key_down(key, generation);
                Control::Continue
            }
            InputEvent::KeyUp { key, generation } => {
                if !self.interpreter.key_up(key, generation) {
                    log::trace!("stale release of key {:X} ignored", key);
                }
                Control::Continue
            }
            InputEvent::Quit => Control::Stop,
        }
    }

    /// apply everything that has queued up since the last pass, without blocking
    fn drain_input(&mut self) -> Control {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if self.handle_input(event) == Control::Stop {
                        return Control::Stop;
                    }
                }
                Err(TryRecvError::Empty) => return Control::Continue,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("input went away, stopping");
                    return Control::Stop;
                }
            }
        }
    }

    pub fn interpreter(&self) -> &Chip8Interpreter {
        &self.interpreter
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingDisplay;
    use std::sync::mpsc::{self, Sender};
    use std::thread;
    use std::time::Duration;

    fn machine(program: &[u8]) -> Chip8Interpreter {
        let mut i = Chip8Interpreter::new(Some(3));
        let mut prog = program;
        i.load_program(&mut prog).unwrap();
        i
    }

    fn scheduler<'a>(
        program: &[u8],
        display: &'a mut RecordingDisplay,
    ) -> (Scheduler<'a>, Sender<InputEvent>) {
        let (tx, rx) = mpsc::channel();
        (Scheduler::new(machine(program), display, rx, 500, 60), tx)
    }

    #[test]
    fn test_instruction_tick_renders_every_time() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        // LD I, 0; DRW V0, V0, 5
        let (mut s, _tx) = scheduler(&[0xA0, 0x00, 0xD0, 0x05], &mut display);
        s.instruction_tick()?;
        s.instruction_tick()?;
        assert_eq!(s.interpreter().program_counter(), 0x204);
        drop(s);
        assert_eq!(display.frames, 2);
        assert_eq!(display.last_frame[0], 0xF0);
        Ok(())
    }

    #[test]
    fn test_fault_halts_but_keeps_rendering() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        // RET with an empty stack
        let (mut s, _tx) = scheduler(&[0x00, 0xEE], &mut display);
        s.instruction_tick()?;
        assert!(s.is_halted());
        s.instruction_tick()?;
        assert_eq!(s.interpreter().program_counter(), 0x200);
        drop(s);
        assert_eq!(display.frames, 2);
        Ok(())
    }

    #[test]
    fn test_timer_tick_shows_tone() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        // LD V0, 2; LD ST, V0; JP 0x204
        let (mut s, _tx) = scheduler(&[0x60, 0x02, 0xF0, 0x18, 0x12, 0x04], &mut display);
        s.instruction_tick()?;
        s.instruction_tick()?;
        assert_eq!(s.interpreter().sound_timer(), 2);
        s.timer_tick();
        s.instruction_tick()?;
        assert_eq!(s.interpreter().sound_timer(), 1);
        s.timer_tick();
        s.timer_tick();
        assert_eq!(s.interpreter().sound_timer(), 0);
        drop(s);
        assert!(display.last_tone);
        Ok(())
    }

    #[test]
    fn test_key_events_reach_wait_instruction() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        // LD V5, K
        let (mut s, _tx) = scheduler(&[0xF5, 0x0A], &mut display);
        s.instruction_tick()?;
        assert_eq!(s.interpreter().program_counter(), 0x200);
        s.handle_input(InputEvent::KeyDown {
            key: 0x7,
            generation: 1,
        });
        s.instruction_tick()?;
        assert_eq!(s.interpreter().registers()[5], 0x7);
        assert_eq!(s.interpreter().program_counter(), 0x202);
        Ok(())
    }

    #[test]
    fn test_stale_release_keeps_newer_press() {
        let mut display = RecordingDisplay::new();
        let (mut s, _tx) = scheduler(&[], &mut display);
        s.handle_input(InputEvent::KeyDown {
            key: 0x1,
            generation: 1,
        });
        s.handle_input(InputEvent::KeyDown {
            key: 0x1,
            generation: 2,
        });
        s.handle_input(InputEvent::KeyUp {
            key: 0x1,
            generation: 1,
        });
        assert!(s.interpreter().keypad().is_pressed(0x1));
        s.handle_input(InputEvent::KeyUp {
            key: 0x1,
            generation: 2,
        });
        assert!(!s.interpreter().keypad().is_pressed(0x1));
    }

    #[test]
    fn test_quit_stops_drain() {
        let mut display = RecordingDisplay::new();
        let (mut s, tx) = scheduler(&[], &mut display);
        tx.send(InputEvent::KeyDown {
            key: 0x2,
            generation: 1,
        })
        .unwrap();
        tx.send(InputEvent::Quit).unwrap();
        assert_eq!(s.drain_input(), Control::Stop);
        assert!(s.interpreter().keypad().is_pressed(0x2));
    }

    #[test]
    fn test_run_stops_on_queued_quit() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        let (mut s, tx) = scheduler(&[0x12, 0x00], &mut display);
        tx.send(InputEvent::Quit).unwrap();
        s.run()?;
        drop(s);
        assert_eq!(display.clears, 1);
        assert_eq!(display.frames, 0);
        Ok(())
    }

    #[test]
    fn test_run_stops_when_input_disconnects() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        let (mut s, tx) = scheduler(&[0x12, 0x00], &mut display);
        drop(tx);
        s.run()
    }

    #[test]
    fn test_run_executes_until_quit() -> Result<(), io::Error> {
        let mut display = RecordingDisplay::new();
        // ADD V1, 1; JP 0x200
        let (mut s, tx) = scheduler(&[0x71, 0x01, 0x12, 0x00], &mut display);
        let quitter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            tx.send(InputEvent::Quit).unwrap();
        });
        s.run()?;
        quitter.join().unwrap();
        assert!(s.interpreter().registers()[1] > 0);
        drop(s);
        assert!(display.frames > 0);
        Ok(())
    }
}
