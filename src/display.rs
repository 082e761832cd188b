use crate::engine::{Intensity, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use std::fmt;
use std::io;

#[cfg(not(target_arch = "wasm32"))]
use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

/// glyph for a lit pixel in the character display
pub const GLYPH_ON: char = '#';
/// glyph for an unlit pixel
pub const GLYPH_OFF: char = ' ';

/// One frame of LCD intensities, read fresh from the session every tick.
///
/// Polarity is the same for every display: a nonzero intensity is ink,
/// zero is background.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelGrid {
    cells: [Intensity; DISPLAY_WIDTH * DISPLAY_HEIGHT],
}

impl PixelGrid {
    pub fn blank() -> Self {
        PixelGrid {
            cells: [0; DISPLAY_WIDTH * DISPLAY_HEIGHT],
        }
    }

    /// build a grid by asking `f` for every (x, y), row by row
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> Intensity) -> Self {
        let mut grid = PixelGrid::blank();
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                grid.cells[y * DISPLAY_WIDTH + x] = f(x, y);
            }
        }
        grid
    }

    pub fn get(&self, x: usize, y: usize) -> Intensity {
        self.cells[y * DISPLAY_WIDTH + x]
    }

    pub fn row(&self, y: usize) -> &[Intensity] {
        &self.cells[y * DISPLAY_WIDTH..(y + 1) * DISPLAY_WIDTH]
    }

    /// (x, y, intensity) for every pixel, row by row
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Intensity)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, v)| (i % DISPLAY_WIDTH, i / DISPLAY_WIDTH, *v))
    }

    /// only the pixels that are on
    pub fn iter_lit(&self) -> impl Iterator<Item = (usize, usize, Intensity)> + '_ {
        self.iter().filter(|(_, _, v)| *v != 0)
    }
}

impl fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in text_rows(self) {
            writeln!(f, "|{}|", row)?;
        }
        Ok(())
    }
}

/// Display is handed a fresh frame by the scheduler every tick. It should
/// abstract the implementation details, so a browser canvas and a
/// terminal look the same to the scheduler.
pub trait Display {
    fn draw(&mut self, frame: &PixelGrid) -> Result<(), io::Error>;
}

/// the 32 rows of 48 glyphs the character display prints
pub fn text_rows(frame: &PixelGrid) -> Vec<String> {
    (0..DISPLAY_HEIGHT)
        .map(|y| {
            frame
                .row(y)
                .iter()
                .map(|v| if *v != 0 { GLYPH_ON } else { GLYPH_OFF })
                .collect()
        })
        .collect()
}

/// colour of one painted cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// grey at `level`, fully opaque
    pub fn grey(level: Intensity) -> Self {
        Rgba {
            r: level,
            g: level,
            b: level,
            a: 0xff,
        }
    }
}

impl fmt::Display for Rgba {
    /// CSS colour, alpha in 0..=1
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alpha = f32::from(self.a) / 255.0;
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }
}

/// a 2D surface the raster display paints 1x1 cells on
pub trait Surface {
    fn clear(&mut self) -> Result<(), io::Error>;
    fn fill_cell(&mut self, x: usize, y: usize, colour: Rgba) -> Result<(), io::Error>;
}

/// raster display: clears the surface and paints every lit pixel grey at
/// its intensity; unlit pixels are left as background
pub struct RasterDisplay<S: Surface> {
    surface: S,
}

impl<S: Surface> RasterDisplay<S> {
    pub fn new(surface: S) -> Self {
        RasterDisplay { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: Surface> Display for RasterDisplay<S> {
    fn draw(&mut self, frame: &PixelGrid) -> Result<(), io::Error> {
        self.surface.clear()?;
        for (x, y, v) in frame.iter_lit() {
            self.surface.fill_cell(x, y, Rgba::grey(v))?;
        }
        Ok(())
    }
}

/// monochrome display in a terminal, rendered using TUI
#[cfg(not(target_arch = "wasm32"))]
pub struct CharDisplay<B: Backend> {
    terminal: Terminal<B>,
    title: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl<B: Backend> CharDisplay<B> {
    pub fn new(backend: B, title: &str) -> Result<Self, io::Error> {
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(CharDisplay {
            terminal,
            title: title.to_string(),
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<B: Backend> Display for CharDisplay<B> {
    fn draw(&mut self, frame: &PixelGrid) -> Result<(), io::Error> {
        let rows: Vec<Spans> = text_rows(frame).into_iter().map(Spans::from).collect();
        let title = self.title.as_str();
        self.terminal.draw(|f| {
            // the LCD plus a one-cell border, clipped to whatever the terminal has
            let size = Rect::new(
                0,
                0,
                2 + DISPLAY_WIDTH as u16,
                2 + DISPLAY_HEIGHT as u16,
            )
            .intersection(f.size());
            let lcd = Paragraph::new(rows).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::White).bg(Color::Black)),
            );
            f.render_widget(lcd, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; keeps the last frame
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Option<PixelGrid>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        DummyDisplay::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &PixelGrid) -> Result<(), io::Error> {
        self.frames += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}
