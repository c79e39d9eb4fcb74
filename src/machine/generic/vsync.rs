use crate::machine::ConfigError;

/// One scan axis, measured in pixel clocks (horizontal) or lines (vertical).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisTiming {
    pub visible: u16,
    pub front: u16,
    pub sync: u16,
    pub back: u16, // visible + front + sync + back = whole
}

impl AxisTiming {
    pub const fn new(visible: u16, front: u16, sync: u16, back: u16) -> Self {
        Self {
            visible,
            front,
            sync,
            back,
        }
    }

    pub const fn whole(&self) -> u32 {
        self.visible as u32 + self.front as u32 + self.sync as u32 + self.back as u32
    }

    /// First counter value inside the sync pulse.
    pub const fn sync_start(&self) -> u32 {
        self.visible as u32 + self.front as u32
    }

    /// First counter value after the sync pulse.
    pub const fn sync_end(&self) -> u32 {
        self.sync_start() + self.sync as u32
    }

    /// Width of a coordinate that can address every visible position. Counter
    /// values past the visible area wrap around within this width.
    pub const fn coord_bits(&self) -> u32 {
        bits_for(self.visible as u32)
    }

    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        let fields = [
            ("visible", self.visible),
            ("front porch", self.front),
            ("sync", self.sync),
            ("back porch", self.back),
        ];
        if let Some((field, _)) = fields.into_iter().find(|(_, width)| *width == 0) {
            return Err(ConfigError::ZeroWidth { axis, field });
        }
        let whole = self.whole();
        if whole > u16::MAX as u32 + 1 {
            return Err(ConfigError::AxisTooLong { axis, whole });
        }
        Ok(())
    }
}

/// Number of bits needed to hold every value in `0..n`.
pub const fn bits_for(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}

/// A fixed display mode: one axis descriptor per direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    pub h: AxisTiming,
    pub v: AxisTiming,
}

impl Timing {
    pub fn validate(self) -> Result<Self, ConfigError> {
        self.h.validate("horizontal")?;
        self.v.validate("vertical")?;
        Ok(self)
    }

    #[cfg(test)]
    pub fn pixel_tot(&self) -> u32 {
        self.h.whole() * self.v.whole()
    }
}

/// Combinational outputs of the sync generator for the current tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSignals {
    pub x: u16,
    pub y: u16,
    pub de: bool,
    pub hsync: bool,
    pub vsync: bool,
}

/// Free-running raster counters for a [`Timing`]. Runs at the pixel clock.
#[derive(Debug)]
pub struct SyncGen {
    pub t: Timing,
    hcounter: u16, // 0..whole_h-1
    vcounter: u16, // 0..whole_v-1
    x_mask: u16,
    y_mask: u16,
}

impl SyncGen {
    pub fn new(t: Timing) -> Result<Self, ConfigError> {
        let t = t.validate()?;
        Ok(Self {
            t,
            hcounter: 0,
            vcounter: 0,
            x_mask: mask(t.h.coord_bits()),
            y_mask: mask(t.v.coord_bits()),
        })
    }

    #[cfg(test)]
    pub fn hcounter(&self) -> u16 {
        self.hcounter
    }

    #[cfg(test)]
    pub fn vcounter(&self) -> u16 {
        self.vcounter
    }

    pub fn signals(&self) -> SyncSignals {
        let h = self.hcounter as u32;
        let v = self.vcounter as u32;
        SyncSignals {
            x: self.hcounter & self.x_mask,
            y: self.vcounter & self.y_mask,
            de: h < self.t.h.visible as u32 && v < self.t.v.visible as u32,
            hsync: h >= self.t.h.sync_start() && h < self.t.h.sync_end(),
            vsync: v >= self.t.v.sync_start() && v < self.t.v.sync_end(),
        }
    }

    /// Advance by one pixel clock.
    pub fn tick(&mut self) {
        if self.hcounter as u32 != self.t.h.whole() - 1 {
            self.hcounter += 1;
            return;
        }
        self.hcounter = 0;
        if self.vcounter as u32 != self.t.v.whole() - 1 {
            self.vcounter += 1;
        } else {
            self.vcounter = 0;
        }
    }

    #[cfg(test)]
    pub fn seek(&mut self, h: u16, v: u16) {
        self.hcounter = h;
        self.vcounter = v;
    }
}

fn mask(bits: u32) -> u16 {
    ((1_u32 << bits) - 1) as u16
}
