//! Terminal events and redraw ticks, polled on a dedicated thread.

use std::sync::mpsc::{self, Receiver, RecvError, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};

#[derive(Debug)]
pub enum Event {
    /// Redraw timer.
    Tick,
    Key(KeyEvent),
    Resize,
}

pub struct EventHandler {
    rx: Receiver<Event>,
    /// Kept so the channel outlives a polling thread that exits early.
    _tx: Sender<Event>,
}

impl EventHandler {
    /// A tick is sent whenever no terminal event arrives within `tick_rate`.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();

        thread::spawn(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) => Event::Key(key),
                    Ok(CrosstermEvent::Resize(..)) => Event::Resize,
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if event_tx.send(event).is_err() {
                break;
            }
        });

        Self { rx, _tx: tx }
    }

    /// Blocks until the next event.
    pub fn next(&self) -> Result<Event, RecvError> {
        self.rx.recv()
    }
}
