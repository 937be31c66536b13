use ofr_schemas::OrderEvent;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::anomaly::{AnomalyLog, AnomalyRecord};
use crate::book::{Counters, OrderLedger};
use crate::transition::Transition;
use crate::watermark::{RowDecision, RowWatermark};

/// Per-fold summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FoldReport {
    /// Rows folded into the ledger.
    pub applied: usize,
    /// Rows skipped because the watermark had already passed them.
    pub skipped: usize,
    pub opened: usize,
    pub cancelled: usize,
    pub executed: usize,
    pub anomalies: usize,
}

/// Ledger, anomaly log and watermark: the single-writer half of a replay
/// session. Only [`fold`][LedgerState::fold] mutates it.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    ledger: OrderLedger,
    anomalies: AnomalyLog,
    watermark: RowWatermark,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a contiguous run of rows starting at `first_row`.
    ///
    /// Rows at or below the watermark are skipped, so delivering the same
    /// rows twice leaves ledger, counters and anomalies unchanged.
    pub fn fold(&mut self, first_row: usize, events: &[OrderEvent]) -> FoldReport {
        let mut report = FoldReport::default();

        for (offset, ev) in events.iter().enumerate() {
            let row = first_row + offset;
            if let RowDecision::Seen { watermark, .. } = self.watermark.accept(row) {
                debug!(row, watermark, "row already folded; skipping");
                report.skipped += 1;
                continue;
            }
            report.applied += 1;

            match self.ledger.apply(ev) {
                Ok(Transition::Opened) => {
                    report.opened += 1;
                    info!(order_id = %ev.order_id, symbol = %ev.symbol, "order opened");
                }
                Ok(Transition::Advanced { from, to }) => {
                    debug!(order_id = %ev.order_id, %from, %to, "order advanced");
                }
                Ok(Transition::Cancelled) => {
                    report.cancelled += 1;
                    info!(order_id = %ev.order_id, symbol = %ev.symbol, "order cancelled; cleared");
                }
                Ok(Transition::Executed) => {
                    report.executed += 1;
                    info!(order_id = %ev.order_id, symbol = %ev.symbol, "order traded; cleared");
                }
                Err(violation) => {
                    report.anomalies += 1;
                    error!(row, symbol = %ev.symbol, "{}", violation);
                    self.anomalies
                        .push(AnomalyRecord::from_violation(row, ev, &violation));
                }
            }
        }

        report
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    pub fn anomalies(&self) -> &AnomalyLog {
        &self.anomalies
    }

    pub fn watermark(&self) -> RowWatermark {
        self.watermark
    }

    pub fn counters(&self) -> Counters {
        self.ledger.counters()
    }

    pub fn open_orders(&self) -> usize {
        self.ledger.open_orders()
    }
}
