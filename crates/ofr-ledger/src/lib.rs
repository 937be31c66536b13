//! ofr-ledger
//!
//! Order-lifecycle validation for the replay engine.
//!
//! - One state per open order id, advanced through a fixed transition table
//! - Protocol violations are recorded, never raised; the order is evicted
//! - Every log row is folded at most once (row watermark)
//!
//! Deterministic, pure logic. No IO.

mod anomaly;
mod book;
mod state;
mod transition;
pub mod watermark;

pub use anomaly::{AnomalyLog, AnomalyRecord, AnomalyView};
pub use book::{Counters, OrderLedger};
pub use state::{FoldReport, LedgerState};
pub use transition::{required_predecessor, LifecycleState, ProtocolViolation, Transition};
pub use watermark::{RowDecision, RowWatermark};
