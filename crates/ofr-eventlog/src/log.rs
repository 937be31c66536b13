use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};
use ofr_schemas::{MessageType, OrderEvent};

/// Immutable, timestamp-sorted order-flow log indexed `0..len()` by row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<OrderEvent>,
}

impl EventLog {
    /// Build a log from events in any order.
    ///
    /// `sort_by_key` is stable, so events sharing a timestamp keep their
    /// original relative order.
    pub fn from_events(mut events: Vec<OrderEvent>) -> Self {
        events.sort_by_key(|e| e.timestamp);
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&OrderEvent> {
        self.events.get(row)
    }

    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// Rows in `range`, clamped to the log bounds.
    pub fn slice(&self, range: Range<usize>) -> &[OrderEvent] {
        let end = range.end.min(self.events.len());
        let start = range.start.min(end);
        &self.events[start..end]
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|e| e.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.timestamp)
    }

    /// First row whose timestamp is `>= ts` (`len()` if none).
    pub fn partition_at(&self, ts: DateTime<Utc>) -> usize {
        self.events.partition_point(|e| e.timestamp < ts)
    }

    /// Rows with timestamps in the half-open interval `[lower, upper)`.
    pub fn rows_between(&self, lower: DateTime<Utc>, upper: DateTime<Utc>) -> Range<usize> {
        let start = self.partition_at(lower);
        let end = self.partition_at(upper).max(start);
        start..end
    }

    /// Distinct symbols in first-appearance order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.events
            .iter()
            .map(|e| e.symbol.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Distinct message types in first-appearance order.
    pub fn message_types(&self) -> Vec<MessageType> {
        let mut seen = HashSet::new();
        self.events
            .iter()
            .map(|e| e.message_type)
            .filter(|m| seen.insert(*m))
            .collect()
    }
}
