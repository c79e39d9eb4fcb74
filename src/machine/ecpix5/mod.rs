//! The ECPIX-5 DVI tester: IT6613 bring-up over I2C, XGA sync generation and
//! the test card, wired to the transmitter's video port.

pub mod it6613;
pub mod video;

use tracing::{debug, info};

use crate::machine::ConfigError;
use crate::machine::generic::i2c::{I2cInitiator, TwoWireMaster};
use crate::machine::generic::init::InitSequencer;
use crate::machine::generic::testcard::TestCardGen;
use crate::machine::generic::vsync::{SyncGen, Timing};

use self::it6613::{IT6613_INIT, It6613};
use self::video::{CHANNEL_DEPTH, TIMING_XGA};

/// Board variant, which decides the width of the transmitter's colour bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    /// ECPIX5-85F: 12 bits per channel
    #[default]
    #[value(name = "85")]
    Ecpix5_85,
    /// ECPIX5-45F: 8 bits per channel
    #[value(name = "45")]
    Ecpix5_45,
}

impl Variant {
    pub fn pin_width(&self) -> u8 {
        match self {
            Variant::Ecpix5_85 => 12,
            Variant::Ecpix5_45 => 8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DviConfig {
    pub variant: Variant,
    pub timing: Timing,
    /// I2C bit period in pixel clocks.
    pub bus_divisor: u32,
    /// Pixel clocks to hold the transmitter's reset pin after power-on.
    pub reset_ticks: u32,
    /// When false the transmitter never acknowledges.
    pub chip_present: bool,
}

impl Default for DviConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            timing: TIMING_XGA,
            bus_divisor: 1000,
            reset_ticks: 0,
            chip_present: true,
        }
    }
}

/// Signals driven onto the transmitter for one pixel clock. Sampled on the
/// rising edge of `pclk`, which is the tester's own clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransmitterPort {
    /// Pixel clock edges driven so far, one per tick.
    pub pclk: u64,
    pub reset: bool,
    pub hsync: bool,
    pub vsync: bool,
    pub de: bool,
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

pub struct DviTester {
    sync: SyncGen,
    card: TestCardGen,
    init: InitSequencer<'static>,
    i2c: I2cInitiator<It6613>,
    pin_width: u8,
    reset_ticks: u32,

    ticks: u64,
    frames: u64,
    last_vsync: bool,
    init_done_at: Option<u64>,
}

impl DviTester {
    pub fn new(config: &DviConfig) -> Result<Self, ConfigError> {
        let sync = SyncGen::new(config.timing)?;
        let card = TestCardGen::new(
            config.timing.h.visible,
            config.timing.v.visible,
            CHANNEL_DEPTH,
        )?;
        let pin_width = config.variant.pin_width();
        if pin_width == 0 || pin_width > card.depth() {
            return Err(ConfigError::InvalidPinWidth {
                pins: pin_width,
                depth: card.depth(),
            });
        }
        let chip = if config.chip_present {
            It6613::new()
        } else {
            It6613::absent()
        };
        info!(
            "DVI tester: {}x{} @ {} bits/channel, I2C divisor {}",
            config.timing.h.visible, config.timing.v.visible, pin_width, config.bus_divisor
        );
        Ok(Self {
            sync,
            card,
            init: InitSequencer::new(IT6613_INIT),
            i2c: I2cInitiator::new(chip, config.bus_divisor),
            pin_width,
            reset_ticks: config.reset_ticks,
            ticks: 0,
            frames: 0,
            last_vsync: false,
            init_done_at: None,
        })
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Frames started on the transmitter port (vsync rising edges).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn init_done(&self) -> bool {
        self.init.done()
    }

    /// Tick at which the init sequence finished, if it has.
    pub fn init_done_at(&self) -> Option<u64> {
        self.init_done_at
    }

    pub fn init(&self) -> &InitSequencer<'static> {
        &self.init
    }

    pub fn i2c(&self) -> &I2cInitiator<It6613> {
        &self.i2c
    }

    pub fn chip(&self) -> &It6613 {
        self.i2c.target()
    }

    #[cfg(test)]
    pub fn sync(&self) -> &SyncGen {
        &self.sync
    }

    pub fn card(&self) -> &TestCardGen {
        &self.card
    }

    /// The transmitter port as driven this tick. Colour and sync both come
    /// from the test card's registers, one tick behind the sync generator.
    pub fn port(&self) -> TransmitterPort {
        let out = self.card.output();
        let shift = self.card.depth() - self.pin_width;
        TransmitterPort {
            pclk: self.ticks,
            reset: self.ticks < self.reset_ticks as u64,
            hsync: out.hsync,
            vsync: out.vsync,
            de: out.de,
            r: out.color.r >> shift,
            g: out.color.g >> shift,
            b: out.color.b >> shift,
        }
    }

    /// Advance every component by one pixel clock. All outputs are read
    /// before any component advances. The init sequence does not start
    /// until the transmitter's reset pin is released.
    pub fn tick(&mut self) {
        let sync = self.sync.signals();
        let busy = self.i2c.busy();
        let command = self.init.command();
        let port = self.port();

        let chip = self.i2c.target_mut();
        chip.set_reset_pin(port.reset);
        chip.sample(&port);
        self.init.tick(busy || port.reset);
        self.i2c.tick(command);
        self.card.tick(sync);
        self.sync.tick();

        if port.vsync && !self.last_vsync {
            self.frames += 1;
            debug!("DVI: frame {} at tick {}", self.frames, self.ticks);
        }
        self.last_vsync = port.vsync;
        self.ticks += 1;

        if self.init_done_at.is_none() && self.init.done() {
            self.init_done_at = Some(self.ticks);
            info!(
                "DVI: transmitter init done after {} ticks ({} NACKs)",
                self.ticks, self.i2c.nack_count
            );
        }
    }
}
