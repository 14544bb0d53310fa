use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::KeyLayout;

/// map of characters read from the keyboard to what the chip8 might expect
/// where '1' => 0x01 and 'a' => 0x0a
const CHIP8_LITERAL_KEYMAP: [(char, u8); 16] = [
    ('0', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('4', 0x04),
    ('5', 0x05),
    ('6', 0x06),
    ('7', 0x07),
    ('8', 0x08),
    ('9', 0x09),
    ('a', 0x0a),
    ('b', 0x0b),
    ('c', 0x0c),
    ('d', 0x0d),
    ('e', 0x0e),
    ('f', 0x0f),
];

/// ditto using left-hand side of qwerty keyboard
///
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

pub fn keymap(layout: KeyLayout) -> HashMap<char, u8> {
    match layout {
        KeyLayout::Conventional => HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
        KeyLayout::Literal => HashMap::from(CHIP8_LITERAL_KEYMAP),
    }
}

/// Logical input, as consumed by the scheduler. Every press carries a fresh
/// generation number; a release names the generation of the press it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown { key: u8, generation: u64 },
    KeyUp { key: u8, generation: u64 },
    Quit,
}

/// The 16-key pad as the interpreter sees it: one bit per key, plus the
/// generation of each key's latest press. A release only clears its bit if it
/// belongs to that latest press, so a stale release can't undo a newer press.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    mask: u16,
    generations: [u64; 16],
}

impl Keypad {
    pub fn mask(&self) -> u16 {
        self.mask
    }

    /// keys outside 0x0-0xF are never pressed
    pub fn is_pressed(&self, key: u8) -> bool {
        1u16.checked_shl(key as u32)
            .map_or(false, |bit| self.mask & bit != 0)
    }

    /// lowest held key, if any
    pub fn first_pressed(&self) -> Option<u8> {
        match self.mask {
            0 => None,
            m => Some(m.trailing_zeros() as u8),
        }
    }

    pub fn press(&mut self, key: u8, generation: u64) {
        let k = key & 0x0f;
        self.mask |= 1 << k;
        self.generations[k as usize] = generation;
    }

    /// returns whether the key was actually released
    pub fn release(&mut self, key: u8, generation: u64) -> bool {
        let k = key & 0x0f;
        if self.is_pressed(k) && self.generations[k as usize] == generation {
            self.mask &= !(1 << k);
            true
        } else {
            false
        }
    }
}

/// how long to block on the terminal when no release is pending
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Turns raw terminal events into `InputEvent`s.
///
/// Terminals rarely report key releases, and key repeat arrives at whatever
/// rate the host likes, so every press arms a release deadline for its key.
/// A repeat re-arms it under a new generation; if the deadline passes first a
/// `KeyUp` is synthesised.
pub struct KeyTranslator {
    keymap: HashMap<char, u8>,
    hold: Duration,
    next_generation: u64,
    held: [Option<(Instant, u64)>; 16],
}

impl KeyTranslator {
    pub fn new(keymap: HashMap<char, u8>, hold: Duration) -> Self {
        KeyTranslator {
            keymap,
            hold,
            next_generation: 1,
            held: [None; 16],
        }
    }

    pub fn translate(&mut self, event: Event, now: Instant) -> Option<InputEvent> {
        match event {
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => Some(InputEvent::Quit),
            Event::Key(KeyEvent {
                code: KeyCode::Esc, ..
            }) => Some(InputEvent::Quit),
            Event::Key(KeyEvent {
                code: KeyCode::Char(ch),
                kind,
                ..
            }) => match self.keymap.get(&ch.to_ascii_lowercase()) {
                Some(&key) => match kind {
                    KeyEventKind::Release => self.held[key as usize]
                        .take()
                        .map(|(_, generation)| InputEvent::KeyUp { key, generation }),
                    _ => Some(self.arm(key, now)),
                },
                None => {
                    log::debug!("can't map {:?} to a CHIP-8 key", ch);
                    None
                }
            },
            _ => None,
        }
    }

    /// the earliest pending synthetic release
    pub fn next_deadline(&self) -> Option<Instant> {
        self.held.iter().flatten().map(|(at, _)| *at).min()
    }

    /// synthesise releases for every key whose hold has run out
    pub fn expire(&mut self, now: Instant) -> Vec<InputEvent> {
        let mut released = Vec::new();
        for (key, slot) in self.held.iter_mut().enumerate() {
            if let Some((at, generation)) = *slot {
                if at <= now {
                    *slot = None;
                    released.push(InputEvent::KeyUp {
                        key: key as u8,
                        generation,
                    });
                }
            }
        }
        released
    }

    fn arm(&mut self, key: u8, now: Instant) -> InputEvent {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.held[key as usize] = Some((now + self.hold, generation));
        InputEvent::KeyDown { key, generation }
    }

    /// block on the terminal, forwarding events until quit or the receiver goes away
    fn pump(&mut self, tx: &Sender<InputEvent>) -> io::Result<()> {
        loop {
            let timeout = self
                .next_deadline()
                .map_or(IDLE_POLL, |at| at.saturating_duration_since(Instant::now()));
            if event::poll(timeout)? {
                if let Some(ev) = self.translate(event::read()?, Instant::now()) {
                    if tx.send(ev).is_err() || ev == InputEvent::Quit {
                        return Ok(());
                    }
                }
            }
            for ev in self.expire(Instant::now()) {
                if tx.send(ev).is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// run the translator on its own thread so a slow terminal read never holds
/// up the instruction or timer cadence
pub fn spawn_input_thread(
    mut translator: KeyTranslator,
    tx: Sender<InputEvent>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            if let Err(e) = translator.pump(&tx) {
                log::error!("input thread stopped: {}", e);
                let _ = tx.send(InputEvent::Quit);
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ch: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE))
    }

    fn translator() -> KeyTranslator {
        KeyTranslator::new(
            keymap(KeyLayout::Conventional),
            Duration::from_millis(100),
        )
    }

    // Keypad tests
    #[test]
    fn test_keypad_press_and_release() {
        let mut k = Keypad::default();
        k.press(0x3, 1);
        k.press(0xa, 2);
        assert_eq!(k.mask(), 0b0000_0100_0000_1000);
        assert!(k.is_pressed(0x3));
        assert!(k.release(0x3, 1));
        assert!(!k.is_pressed(0x3));
        assert!(k.is_pressed(0xa));
    }

    #[test]
    fn test_keypad_stale_release_ignored() {
        let mut k = Keypad::default();
        k.press(0x5, 1);
        k.press(0x5, 2);
        assert!(!k.release(0x5, 1));
        assert!(k.is_pressed(0x5));
        assert!(k.release(0x5, 2));
        assert_eq!(k.mask(), 0);
    }

    #[test]
    fn test_keypad_out_of_range_never_pressed() {
        let mut k = Keypad::default();
        k.press(0x0, 1);
        assert!(!k.is_pressed(0x10));
        assert!(!k.is_pressed(0xff));
    }

    #[test]
    fn test_keypad_first_pressed_is_lowest() {
        let mut k = Keypad::default();
        assert_eq!(k.first_pressed(), None);
        k.press(0xc, 1);
        k.press(0x6, 2);
        assert_eq!(k.first_pressed(), Some(0x6));
    }

    // keymap tests
    #[test]
    fn test_keymaps_cover_all_keys() {
        for layout in [KeyLayout::Conventional, KeyLayout::Literal] {
            let mut keys: Vec<u8> = keymap(layout).values().copied().collect();
            keys.sort_unstable();
            assert_eq!(keys, (0..16).collect::<Vec<u8>>());
        }
    }

    // KeyTranslator tests
    #[test]
    fn test_translate_mapped_key() {
        let mut t = translator();
        let now = Instant::now();
        assert_eq!(
            t.translate(key('w'), now),
            Some(InputEvent::KeyDown {
                key: 0x5,
                generation: 1
            })
        );
        assert_eq!(t.next_deadline(), Some(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_translate_uppercase_maps_like_lowercase() {
        let mut t = translator();
        assert!(matches!(
            t.translate(key('V'), Instant::now()),
            Some(InputEvent::KeyDown { key: 0xf, .. })
        ));
    }

    #[test]
    fn test_translate_unmapped_key_ignored() {
        let mut t = translator();
        assert_eq!(t.translate(key('p'), Instant::now()), None);
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn test_translate_quit() {
        let mut t = translator();
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(t.translate(ctrl_c, Instant::now()), Some(InputEvent::Quit));
        assert_eq!(t.translate(esc, Instant::now()), Some(InputEvent::Quit));
    }

    #[test]
    fn test_expire_synthesises_release() {
        let mut t = translator();
        let now = Instant::now();
        t.translate(key('x'), now);
        assert!(t.expire(now + Duration::from_millis(99)).is_empty());
        assert_eq!(
            t.expire(now + Duration::from_millis(100)),
            vec![InputEvent::KeyUp {
                key: 0x0,
                generation: 1
            }]
        );
        assert_eq!(t.next_deadline(), None);
    }

    #[test]
    fn test_repeat_rearms_release_with_new_generation() {
        let mut t = translator();
        let now = Instant::now();
        t.translate(key('q'), now);
        let later = now + Duration::from_millis(80);
        assert_eq!(
            t.translate(key('q'), later),
            Some(InputEvent::KeyDown {
                key: 0x4,
                generation: 2
            })
        );
        assert!(t.expire(now + Duration::from_millis(100)).is_empty());
        assert_eq!(
            t.expire(later + Duration::from_millis(100)),
            vec![InputEvent::KeyUp {
                key: 0x4,
                generation: 2
            }]
        );
    }

    #[test]
    fn test_host_release_ends_hold() {
        let mut t = translator();
        let now = Instant::now();
        t.translate(key('e'), now);
        let release = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('e'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert_eq!(
            t.translate(release, now),
            Some(InputEvent::KeyUp {
                key: 0x6,
                generation: 1
            })
        );
        assert!(t.expire(now + Duration::from_secs(1)).is_empty());
    }
}
