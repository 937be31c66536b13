//! Row watermark.
//!
//! # Purpose
//!
//! Successive windows may expose the same log rows more than once (overlapping
//! time windows, the repeated overrun tail, a burst after an irregular call).
//! This module tracks the **highest row already folded into the ledger** and
//! rejects any row at or below it.
//!
//! # Invariants
//!
//! - **Strictly increasing acceptance**: a row is accepted only if it is
//!   greater than the last accepted row.
//! - **Watermark advances only on acceptance**: rejections do not move it.
//! - **Pure, no IO**: the caller decides what to do with the decision.

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Result of checking a row index against the watermark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowDecision {
    /// Row is beyond the watermark and may be applied.
    Fresh,

    /// Row was already folded (or lies behind a folded row).
    Seen {
        /// The current watermark (last accepted row).
        watermark: usize,
        /// The rejected row.
        row: usize,
    },
}

impl RowDecision {
    pub fn is_fresh(&self) -> bool {
        matches!(self, RowDecision::Fresh)
    }
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// Highest row index already applied to the ledger.
///
/// Use [`check`][RowWatermark::check] for a read-only probe and
/// [`accept`][RowWatermark::accept] to advance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowWatermark {
    /// `None` until the first row is accepted.
    last_applied: Option<usize>,
}

impl RowWatermark {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a row **without** advancing the watermark.
    pub fn check(&self, row: usize) -> RowDecision {
        match self.last_applied {
            Some(w) if row <= w => RowDecision::Seen { watermark: w, row },
            _ => RowDecision::Fresh,
        }
    }

    /// Check a row **and advance the watermark** to it if fresh.
    pub fn accept(&mut self, row: usize) -> RowDecision {
        let d = self.check(row);
        if d.is_fresh() {
            self.last_applied = Some(row);
        }
        d
    }

    /// Last accepted row, `None` if nothing was applied yet.
    pub fn last_applied(&self) -> Option<usize> {
        self.last_applied
    }
}
