//! Terminal dashboard.
//!
//! Reads the latest snapshot from the store on every redraw; collection
//! runs independently in the polling loop.

mod app;
mod event;
mod input;
mod render;
mod state;
mod style;

pub use app::App;
