use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::{Level, info, warn};

mod host;
mod machine;

use crate::host::capture::FrameCapture;
use crate::host::screen::{InitWatchdog, headless};
use crate::machine::ecpix5::{DviConfig, DviTester, Variant};

/// ECPIX-5 DVI tester
/// Simulates IT6613 bring-up over I2C and the XGA test card, one pixel clock
/// at a time
#[derive(Parser)]
#[command(name = "dvi-tester")]
#[command(about = "Cycle-accurate model of the ECPIX-5 DVI bring-up path")]
struct Args {
    /// Board variant, which sets the colour bus width
    #[arg(long, value_enum, default_value_t = Variant::Ecpix5_85)]
    variant: Variant,

    /// Frames to simulate in headless mode
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    frames: u64,

    /// I2C bit period, in pixel clocks
    #[arg(long, default_value_t = 1000)]
    bus_divisor: u32,

    /// Pixel clocks to hold the transmitter in hardware reset
    #[arg(long, default_value_t = 0)]
    reset_ticks: u32,

    /// Simulate a transmitter that never acknowledges
    #[arg(long)]
    no_ack: bool,

    /// Warn if init has not finished after this many pixel clocks
    #[arg(long)]
    init_timeout: Option<u64>,

    /// Write the last complete frame to this file (binary PPM)
    #[arg(long)]
    capture: Option<PathBuf>,

    /// Show the picture in the terminal until 'q' is pressed
    #[arg(long)]
    display: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };
    if args.display {
        host::logging::setup_logging_file(level)?;
    } else {
        host::logging::setup_logging_stdio(level);
    }

    let config = DviConfig {
        variant: args.variant,
        bus_divisor: args.bus_divisor,
        reset_ticks: args.reset_ticks,
        chip_present: !args.no_ack,
        ..Default::default()
    };
    let mut dvi = DviTester::new(&config)?;
    let mut capture = FrameCapture::new(
        config.timing.h.visible as usize,
        config.timing.v.visible as usize,
        config.variant.pin_width(),
    );
    let mut watchdog = InitWatchdog::new(args.init_timeout);

    let start_time = Instant::now();
    if args.display {
        run_display(&mut dvi, &mut capture, &mut watchdog)?;
    } else {
        headless::run(&mut dvi, &mut capture, &mut watchdog, args.frames);
    }
    let elapsed = start_time.elapsed();

    info!("DVI tester run completed:");
    info!("  Pixel clocks: {}", dvi.ticks());
    info!("  Frames: {}", dvi.frames());
    match dvi.init_done_at() {
        Some(tick) => info!("  Init done at tick {tick}"),
        None => warn!("  Init not done, stuck in {:?}", dvi.init().state()),
    }
    info!(
        "  I2C operations: {} ({} NACKs)",
        dvi.i2c().op_count,
        dvi.i2c().nack_count
    );
    info!("  Transmitter configured: {}", dvi.chip().configured());
    info!("  Time elapsed: {:?}", elapsed);
    if elapsed.as_secs_f64() > 0.0 {
        info!(
            "  Pixel clocks per second: {:.0}",
            dvi.ticks() as f64 / elapsed.as_secs_f64()
        );
    }

    if let Some(path) = args.capture {
        match capture.frame() {
            Some(frame) => {
                frame.save_ppm(&path)?;
                info!("Frame written to {:?}", path);
            }
            None => warn!("No complete frame captured, nothing written"),
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_display(
    dvi: &mut DviTester,
    capture: &mut FrameCapture,
    watchdog: &mut InitWatchdog,
) -> Result<(), Box<dyn std::error::Error>> {
    host::screen::ratatui::run(dvi, capture, watchdog)
}

#[cfg(not(feature = "tui"))]
fn run_display(
    _dvi: &mut DviTester,
    _capture: &mut FrameCapture,
    _watchdog: &mut InitWatchdog,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("built without the tui feature".into())
}
