use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Display is used by the scheduler to put the frame buffer on the screen. It
/// should abstract the implementation details, so a variety of kinds of screen
/// would work.
pub trait Display {
    /// draw packed frame data; `tone` is true while the sound timer runs
    fn draw(&mut self, data: &[u8], tone: bool) -> Result<(), io::Error>;

    /// wipe the screen at the start of a session
    fn clear(&mut self) -> Result<(), io::Error>;

    /// how big the display data should be
    fn get_display_size_bytes(&self) -> usize;
}

// store useful metadata about the terminal: width, height, bits per pixel
struct Resolution(usize, usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn byte_count(&self) -> usize {
        self.0 * self.1 * self.2 / 8
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// coordinates of every pixel in `data` whose bit equals `bitplane`
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let bit = 1 & (data[count / 8] >> (7 - count % 8));
                if bit == bitplane {
                    return Some((
                        (count % w) as f64,        // x
                        -1.0 * (count / w) as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm. Owns
/// the terminal: raw mode and the alternate screen last as long as it does.
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
}

impl MonoTermDisplay {
    pub fn new(x: usize, y: usize) -> Result<MonoTermDisplay, io::Error> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.hide_cursor()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(x, y, 1),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        let screen = terminal::disable_raw_mode()
            .and_then(|_| execute!(self.terminal.backend_mut(), LeaveAlternateScreen));
        let cursor = self.terminal.show_cursor();
        if let Err(e) = screen.and(cursor) {
            log::error!("failed to restore terminal: {}", e);
        }
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, data: &[u8], tone: bool) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        if data.len() != self.resolution.byte_count() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "MonoTermDisplay needs {} bytes of frame data, got {}",
                    self.resolution.byte_count(),
                    data.len()
                ),
            ));
        }

        let off = self.resolution.bitplane_from_data(data, 0).collect::<Vec<_>>();
        let on = self.resolution.bitplane_from_data(data, 1).collect::<Vec<_>>();
        let (x_bounds, y_bounds) = (self.resolution.x_bounds(), self.resolution.y_bounds());
        let (w, h) = (self.resolution.0 as u16, self.resolution.1 as u16);
        let title = if tone { "CHIP-8 \u{266a}" } else { "CHIP-8" };

        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas; a smaller terminal just crops
        self.terminal.draw(|f| {
            let screen = f.size();
            let size = Rect::new(0, 0, (2 + w).min(screen.width), (2 + h).min(screen.height));

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .style(Style::default().fg(Color::Gray).bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &off,
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &on,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), io::Error> {
        self.terminal.clear()
    }

    fn get_display_size_bytes(&self) -> usize {
        self.resolution.byte_count()
    }
}

/// useful for testing: remembers what it was asked to show
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub frames: usize,
    pub clears: usize,
    pub last_frame: Vec<u8>,
    pub last_tone: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for RecordingDisplay {
    fn draw(&mut self, data: &[u8], tone: bool) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_frame = data.to_vec();
        self.last_tone = tone;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), io::Error> {
        self.clears += 1;
        Ok(())
    }

    fn get_display_size_bytes(&self) -> usize {
        DISPLAY_WIDTH * DISPLAY_HEIGHT / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Resolution tests
    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_byte_count() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.byte_count(), 256)
    }

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32, 1);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_blank_frame_has_no_lit_pixels() {
        let r = Resolution(64, 32, 1);
        let data = [0; 256];
        assert_eq!(r.bitplane_from_data(&data, 1).count(), 0);
        assert_eq!(r.bitplane_from_data(&data, 0).count(), 2048);
    }

    #[test]
    fn test_bitplane_positions_msb_first() {
        let r = Resolution(64, 32, 1);
        let mut data = [0; 256];
        data[0] = 0x80; // (0, 0)
        data[8] = 0x01; // (7, 1)
        data[255] = 0x01; // (63, 31)
        let mut lit = r.bitplane_from_data(&data, 1).collect::<Vec<_>>();
        lit.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(lit, vec![(0.0, 0.0), (7.0, -1.0), (63.0, -31.0)]);
    }

    // RecordingDisplay tests
    #[test]
    fn test_recording_display() -> Result<(), io::Error> {
        let mut d = RecordingDisplay::new();
        d.clear()?;
        d.draw(&[1; 256], true)?;
        assert_eq!(d.clears, 1);
        assert_eq!(d.frames, 1);
        assert_eq!(d.last_frame.len(), d.get_display_size_bytes());
        assert!(d.last_tone);
        Ok(())
    }
}
