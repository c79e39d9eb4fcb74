use tracing::info;

use super::{InitWatchdog, step};
use crate::host::capture::FrameCapture;
use crate::machine::ecpix5::DviTester;

/// Run until `frames` frames have started on the transmitter port.
pub fn run(
    dvi: &mut DviTester,
    capture: &mut FrameCapture,
    watchdog: &mut InitWatchdog,
    frames: u64,
) {
    let mut reported = dvi.frames();
    while dvi.frames() < frames {
        step(dvi, capture, watchdog);
        if dvi.frames() != reported {
            reported = dvi.frames();
            info!(
                "frame {reported}: tick {}, card counter {}, init {}",
                dvi.ticks(),
                dvi.card().frame_counter(),
                if dvi.init_done() { "done" } else { "pending" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ecpix5::DviConfig;

    #[test]
    fn test_runs_requested_frames() {
        let mut dvi = DviTester::new(&DviConfig {
            bus_divisor: 16,
            ..Default::default()
        })
        .unwrap();
        let mut capture = FrameCapture::new(1024, 768, 12);
        let mut watchdog = InitWatchdog::default();
        run(&mut dvi, &mut capture, &mut watchdog, 2);
        assert_eq!(dvi.frames(), 2);
        assert!(dvi.init_done());
        assert!(dvi.chip().configured());
        assert!(capture.frame().is_some());
    }
}
