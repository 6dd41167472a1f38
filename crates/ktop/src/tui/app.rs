//! Dashboard application loop.

use std::io;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use ktop_lib::{RefreshHandle, SnapshotReader};
use tracing::debug;

use super::event::{Event, EventHandler};
use super::input::{handle_key, KeyAction};
use super::render::render;
use super::state::DashboardState;
use crate::config::Settings;

/// Redraw period, independent of the collection interval.
pub const TICK_RATE: Duration = Duration::from_millis(500);

pub struct App {
    reader: SnapshotReader,
    refresh: RefreshHandle,
    state: DashboardState,
}

impl App {
    pub fn new(reader: SnapshotReader, refresh: RefreshHandle, settings: &Settings) -> Self {
        Self {
            reader,
            refresh,
            state: DashboardState::new(settings),
        }
    }

    /// Blocks until the user quits; the terminal is restored on every exit path.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        let events = EventHandler::new(TICK_RATE);

        loop {
            self.state
                .update(self.reader.latest(), self.reader.namespaces());
            self.state.failure = self.reader.last_failure();
            terminal.draw(|frame| render(frame, &mut self.state))?;

            match events.next() {
                Ok(Event::Tick) | Ok(Event::Resize) => {}
                Ok(Event::Key(key)) => match handle_key(&mut self.state, key) {
                    KeyAction::Quit => return Ok(()),
                    KeyAction::Refresh => {
                        if !self.refresh.request() {
                            debug!("Refresh already pending");
                        }
                    }
                    KeyAction::None => {}
                },
                Err(_) => return Ok(()),
            }
        }
    }
}
