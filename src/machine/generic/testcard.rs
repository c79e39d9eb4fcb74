//! Test card: a filled disc over a scrolling grid, registered one pixel
//! clock behind its inputs so colour and sync leave together.

use tracing::trace;

use super::vsync::SyncSignals;
use crate::machine::ConfigError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Self { r, g, b }
    }

    fn map(self, f: impl Fn(u16) -> u16) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }
}

/// Palette, as 12-bit values.
pub const DISC: Rgb = Rgb::new(0xf01, 0x394, 0xf39);
pub const GRID_LINE: Rgb = Rgb::new(0xfff, 0xfff, 0xfff);
pub const GRID_BACKGROUND: Rgb = Rgb::new(0x600, 0x600, 0x600);
const PALETTE_DEPTH: u8 = 12;

/// The frame counter is six bits wide and wraps every 64 frames.
const FRAME_COUNTER_MASK: u8 = 0x3f;

/// Registered outputs of the test card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CardOutput {
    pub de: bool,
    pub hsync: bool,
    pub vsync: bool,
    pub color: Rgb,
}

#[derive(Debug)]
pub struct TestCardGen {
    width: u16,
    height: u16,
    depth: u8,
    radius: u32,

    counter: u8,
    last_vsync: bool,
    out: CardOutput,
}

impl TestCardGen {
    pub fn new(width: u16, height: u16, depth: u8) -> Result<Self, ConfigError> {
        if !(1..=16).contains(&depth) {
            return Err(ConfigError::InvalidDepth(depth));
        }
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidCardSize { width, height });
        }
        // 80% of the smaller dimension, as a diameter
        let radius = width.min(height) as u32 * 2 / 5;
        Ok(Self {
            width,
            height,
            depth,
            radius,
            counter: 0,
            last_vsync: false,
            out: CardOutput::default(),
        })
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    #[cfg(test)]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn frame_counter(&self) -> u8 {
        self.counter
    }

    pub fn output(&self) -> CardOutput {
        self.out
    }

    /// Colour for a pixel under the current frame counter, at the configured
    /// depth.
    pub fn color_at(&self, x: u16, y: u16, de: bool) -> Rgb {
        if !de {
            return Rgb::BLACK;
        }
        let x_rel = x as i64 - (self.width / 2) as i64;
        let y_rel = y as i64 - (self.height / 2) as i64;
        let radius = self.radius as i64;
        let color = if x_rel * x_rel + y_rel * y_rel <= radius * radius {
            DISC
        } else if (x & FRAME_COUNTER_MASK as u16) as u8 == self.counter
            || (y & FRAME_COUNTER_MASK as u16) as u8 == self.counter
        {
            GRID_LINE
        } else {
            GRID_BACKGROUND
        };
        self.scale(color)
    }

    /// MSB-align a palette colour to the channel depth.
    fn scale(&self, color: Rgb) -> Rgb {
        if self.depth >= PALETTE_DEPTH {
            let shift = self.depth - PALETTE_DEPTH;
            color.map(|c| c << shift)
        } else {
            let shift = PALETTE_DEPTH - self.depth;
            color.map(|c| c >> shift)
        }
    }

    /// Advance by one pixel clock, registering this tick's inputs.
    pub fn tick(&mut self, input: SyncSignals) {
        self.out = CardOutput {
            de: input.de,
            hsync: input.hsync,
            vsync: input.vsync,
            color: self.color_at(input.x, input.y, input.de),
        };
        if input.vsync && !self.last_vsync {
            self.counter = self.counter.wrapping_add(1) & FRAME_COUNTER_MASK;
            trace!("test card: frame counter {}", self.counter);
        }
        self.last_vsync = input.vsync;
    }
}
