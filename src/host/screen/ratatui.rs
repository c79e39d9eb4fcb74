use std::io;
use std::time::{Duration, Instant};

use ratatui::buffer::Buffer;
use ratatui::crossterm;
use ratatui::crossterm::event::{Event, KeyCode, KeyModifiers};
use ratatui::layout::Rect;
use ratatui::prelude::CrosstermBackend;
use ratatui::style::{Color, Style};
use ratatui::text::Span;
use ratatui::widgets::Widget;
use tracing::warn;

use super::{InitWatchdog, step};
use crate::host::capture::{Frame, FrameCapture};
use crate::machine::ecpix5::DviTester;

/// Draws a frame scaled to the area, two pixel rows per cell.
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn new(frame: &'a Frame) -> Self {
        Self { frame }
    }
}

impl<'a> Widget for FrameView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = self.frame;
        let rows = area.height as usize * 2;
        for cy in 0..area.height {
            for cx in 0..area.width {
                let x = cx as usize * frame.width / area.width as usize;
                let top = (cy as usize * 2) * frame.height / rows;
                let bottom = (cy as usize * 2 + 1) * frame.height / rows;
                let [r, g, b] = frame.rgb8(x, top);
                let fg = Color::Rgb(r, g, b);
                let [r, g, b] = frame.rgb8(x, bottom);
                let bg = Color::Rgb(r, g, b);
                if let Some(cell) = buf.cell_mut((area.left() + cx, area.top() + cy)) {
                    cell.set_symbol("▀");
                    cell.set_style(Style::default().fg(fg).bg(bg));
                }
            }
        }
    }
}

enum Command {
    ToggleRun,
    Quit,
}

fn command(event: &Event) -> Option<Command> {
    let Event::Key(key) = event else {
        return None;
    };
    match key.code {
        KeyCode::Char('q') if key.modifiers.is_empty() => Some(Command::Quit),
        KeyCode::Char('q') if key.modifiers == KeyModifiers::CONTROL => Some(Command::Quit),
        KeyCode::Char(' ') => Some(Command::ToggleRun),
        _ => None,
    }
}

pub fn run(
    dvi: &mut DviTester,
    capture: &mut FrameCapture,
    watchdog: &mut InitWatchdog,
) -> Result<(), Box<dyn std::error::Error>> {
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

    let res = run_inner(dvi, capture, watchdog);

    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    res
}

fn run_inner(
    dvi: &mut DviTester,
    capture: &mut FrameCapture,
    watchdog: &mut InitWatchdog,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = ratatui::Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;
    let mut running = true;
    loop {
        if running {
            // One whole frame between redraws
            let frame = dvi.frames();
            let start = Instant::now();
            while dvi.frames() == frame {
                step(dvi, capture, watchdog);
            }
            if start.elapsed() > Duration::from_secs(2) {
                warn!("Frame took too long: {:?}", start.elapsed());
            }
        }

        let timeout = if running {
            Duration::from_millis(0)
        } else {
            Duration::from_millis(100)
        };
        if crossterm::event::poll(timeout)? {
            match command(&crossterm::event::read()?) {
                Some(Command::ToggleRun) => running = !running,
                Some(Command::Quit) => break,
                None => {}
            }
        }

        terminal.draw(|f| {
            if let Some(frame) = capture.frame() {
                f.render_widget(FrameView::new(frame), f.area());
            }
            let init = match dvi.init_done_at() {
                Some(tick) => format!("init done @{tick}"),
                None => format!("init {:?}", dvi.init().state()),
            };
            let status = Span::styled(
                format!(
                    "{init} | frame {} | counter {:02} | NACK {}{}",
                    dvi.frames(),
                    dvi.card().frame_counter(),
                    dvi.i2c().nack_count,
                    if running { "" } else { " | paused" }
                ),
                Style::default().fg(Color::LightBlue).bg(Color::Black),
            );
            f.render_widget(status.into_right_aligned_line(), f.area());
        })?;
    }
    Ok(())
}
