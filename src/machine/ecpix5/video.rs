//! Video mode driven by the DVI tester. Only XGA is supported.

use crate::machine::generic::vsync::{AxisTiming, Timing};

/// 1024x768 at 60Hz, 65MHz pixel clock.
pub const TIMING_XGA: Timing = Timing {
    h: AxisTiming::new(1024, 24, 136, 160), // whole = 1344
    v: AxisTiming::new(768, 3, 6, 29),      // whole = 806
};

/// Internal colour depth of the test card, per channel.
pub const CHANNEL_DEPTH: u8 = 12;
