use std::fs::File;
use std::io::{self, IsTerminal, stdout};
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log to `dvi-tester.log` in the temp directory, leaving the terminal to
/// the picture.
pub fn setup_logging_file(level: Level) -> io::Result<()> {
    let logfile = std::env::temp_dir().join("dvi-tester.log");
    let writer = Mutex::new(File::create(logfile)?);
    install(
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer),
        level,
    );
    Ok(())
}

/// Bare messages on stdout, coloured only on a terminal.
pub fn setup_logging_stdio(level: Level) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .with_line_number(false)
        .with_level(false)
        .without_time();
    install(
        tracing_subscriber::fmt::layer()
            .with_ansi(stdout().is_terminal())
            .event_format(format),
        level,
    );
}

fn install<L>(layer: L, level: Level)
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(layer)
        .with(logging_targets(level))
        .init();
}

/// The terminal backend logs from inside the draw loop.
fn logging_targets(level: Level) -> Targets {
    Targets::new()
        .with_target("crossterm", LevelFilter::OFF)
        .with_target("ratatui", LevelFilter::OFF)
        .with_default(LevelFilter::from_level(level))
}
