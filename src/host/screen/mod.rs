pub mod headless;

#[cfg(feature = "tui")]
pub mod ratatui;

use tracing::warn;

use crate::host::capture::FrameCapture;
use crate::machine::ecpix5::DviTester;

/// Reports an init sequence that has outlived its deadline. It only warns:
/// the sequencer has no timeout of its own and keeps waiting.
#[derive(Debug, Default)]
pub struct InitWatchdog {
    deadline: Option<u64>,
    fired: bool,
}

impl InitWatchdog {
    pub fn new(deadline: Option<u64>) -> Self {
        Self {
            deadline,
            fired: false,
        }
    }

    #[cfg(test)]
    pub fn fired(&self) -> bool {
        self.fired
    }

    pub fn check(&mut self, dvi: &DviTester) {
        let Some(deadline) = self.deadline else {
            return;
        };
        if !self.fired && !dvi.init_done() && dvi.ticks() >= deadline {
            self.fired = true;
            warn!(
                "init: not done after {} ticks, stuck in {:?}",
                dvi.ticks(),
                dvi.init().state()
            );
        }
    }
}

/// One pixel clock, with the port sampled before it advances.
pub fn step(dvi: &mut DviTester, capture: &mut FrameCapture, watchdog: &mut InitWatchdog) {
    capture.sample(&dvi.port());
    dvi.tick();
    watchdog.check(dvi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::ecpix5::DviConfig;

    fn tester(chip_present: bool) -> DviTester {
        DviTester::new(&DviConfig {
            bus_divisor: 4,
            chip_present,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_watchdog_fires_once_when_late() {
        let mut dvi = tester(true);
        let mut capture = FrameCapture::new(1024, 768, 12);
        let mut watchdog = InitWatchdog::new(Some(10));
        for _ in 0..20 {
            step(&mut dvi, &mut capture, &mut watchdog);
        }
        assert!(watchdog.fired());
        assert!(!dvi.init_done());
    }

    #[test]
    fn test_watchdog_quiet_when_init_finishes() {
        let mut dvi = tester(true);
        let mut capture = FrameCapture::new(1024, 768, 12);
        let mut watchdog = InitWatchdog::new(Some(100_000));
        while dvi.ticks() < 200_000 {
            step(&mut dvi, &mut capture, &mut watchdog);
        }
        assert!(dvi.init_done());
        assert!(!watchdog.fired());
    }

    #[test]
    fn test_watchdog_disabled() {
        let mut dvi = tester(false);
        let mut capture = FrameCapture::new(1024, 768, 12);
        let mut watchdog = InitWatchdog::default();
        for _ in 0..1000 {
            step(&mut dvi, &mut capture, &mut watchdog);
        }
        assert!(!watchdog.fired());
    }
}
