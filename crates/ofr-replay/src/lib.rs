//! ofr-replay
//!
//! Windowed replay of an order-flow log.
//!
//! Pipeline per call: CURSOR -> SLICE -> WATERMARK -> LEDGER
//!
//! - Two interchangeable cursors: time-bucketed and count-bucketed
//! - Overrun flushes the undelivered tail instead of ending the stream
//! - Preview mode advances the cursor without touching ledger state
//! - Deterministic: same log, cursor state and watermark => same output

mod cursor;
mod error;
pub mod palette;
mod session;

pub use cursor::{CountCursor, TimeCursor, TimeStep, Window, WindowBounds, WindowCursor};
pub use error::ReplayError;
pub use palette::Palette;
pub use session::{ReplaySession, SessionSnapshot, Tick, WindowMode};
