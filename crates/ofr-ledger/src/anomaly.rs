use chrono::{DateTime, Utc};
use ofr_schemas::{Direction, MessageType, OrderEvent, OrderId};
use serde::Serialize;

use crate::transition::{LifecycleState, ProtocolViolation};

/// One recorded protocol violation. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    /// Log row of the offending event.
    pub row: usize,
    pub order_id: OrderId,
    pub received: MessageType,
    pub observed: LifecycleState,
    pub expected: LifecycleState,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub direction: Direction,
    pub reason: String,
}

impl AnomalyRecord {
    pub fn from_violation(row: usize, ev: &OrderEvent, v: &ProtocolViolation) -> Self {
        Self {
            row,
            order_id: v.order_id.clone(),
            received: v.received,
            observed: v.observed,
            expected: v.expected,
            timestamp: ev.timestamp,
            symbol: ev.symbol.clone(),
            direction: ev.direction,
            reason: v.reason(),
        }
    }

    pub fn view(&self) -> AnomalyView {
        AnomalyView {
            order_id: self.order_id.to_string(),
            observed: self.observed.to_string(),
            expected: self.expected.to_string(),
            symbol: self.symbol.clone(),
            timestamp: self.timestamp,
            direction: self.direction.as_str().to_string(),
            reason: self.reason.clone(),
        }
    }
}

/// Flat, display-ready projection of an [`AnomalyRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyView {
    pub order_id: String,
    pub observed: String,
    pub expected: String,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: String,
    pub reason: String,
}

/// Append-only anomaly store, in detection order.
#[derive(Debug, Clone, Default)]
pub struct AnomalyLog {
    records: Vec<AnomalyRecord>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: AnomalyRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AnomalyRecord] {
        &self.records
    }

    /// Records appended at or after position `from` (for incremental export).
    pub fn since(&self, from: usize) -> &[AnomalyRecord] {
        &self.records[from.min(self.records.len())..]
    }

    pub fn projection(&self) -> Vec<AnomalyView> {
        self.records.iter().map(AnomalyRecord::view).collect()
    }
}
