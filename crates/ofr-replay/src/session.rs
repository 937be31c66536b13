use chrono::TimeDelta;
use ofr_eventlog::EventLog;
use ofr_ledger::{AnomalyRecord, AnomalyView, Counters, FoldReport, LedgerState};
use ofr_schemas::OrderEvent;
use serde::Serialize;
use tracing::info;

use crate::cursor::{CountCursor, TimeCursor, TimeStep, Window, WindowCursor};
use crate::error::ReplayError;

/// Which cursor a caller drives, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    Time(TimeStep),
    Count { size: usize },
}

/// The replay session: one log, both cursors, one ledger.
///
/// Pipeline per call: CURSOR -> SLICE -> WATERMARK -> LEDGER
///
/// The time and count cursors keep independent bounds; a caller should
/// stick to one of them. The ledger is shared, and the row watermark keeps
/// it consistent even if both are used.
pub struct ReplaySession {
    log: EventLog,
    time: TimeCursor,
    count: CountCursor,
    state: LedgerState,
    ticks: u64,
}

/// What one call delivered, plus the ledger as it stands afterwards.
#[derive(Debug)]
pub struct Tick<'a> {
    /// Zero-based call number within the session.
    pub seq: u64,
    pub window: Window,
    pub events: &'a [OrderEvent],
    /// `None` for preview calls.
    pub report: Option<FoldReport>,
    pub counters: Counters,
    pub open_orders: usize,
    /// Full anomaly log, oldest first.
    pub anomalies: &'a [AnomalyRecord],
}

impl Tick<'_> {
    pub fn is_flush(&self) -> bool {
        self.window.flushed
    }

    pub fn is_preview(&self) -> bool {
        self.report.is_none()
    }
}

/// Owned, serializable view of a session after a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub ticks: u64,
    pub rows_total: usize,
    /// Highest row folded into the ledger, if any.
    pub watermark: Option<usize>,
    pub counters: Counters,
    pub open_orders: usize,
    pub anomalies: Vec<AnomalyView>,
}

impl ReplaySession {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            time: TimeCursor::new(),
            count: CountCursor::new(),
            state: LedgerState::new(),
            ticks: 0,
        }
    }

    /// Advance the time cursor and optionally fold the rows into the ledger.
    ///
    /// With `apply_to_ledger = false` the cursor still moves but ledger,
    /// counters, anomalies and watermark are left as they were.
    pub fn stream(
        &mut self,
        step: TimeDelta,
        initial_width: TimeDelta,
        apply_to_ledger: bool,
    ) -> Result<Tick<'_>, ReplayError> {
        let window = self
            .time
            .advance(&self.log, TimeStep::new(step, initial_width))?;
        Ok(self.deliver(window, apply_to_ledger))
    }

    /// Advance the count cursor by `window_size` rows.
    pub fn box_stream(
        &mut self,
        window_size: usize,
        apply_to_ledger: bool,
    ) -> Result<Tick<'_>, ReplayError> {
        let window = self.count.advance(&self.log, window_size)?;
        Ok(self.deliver(window, apply_to_ledger))
    }

    pub fn advance(
        &mut self,
        mode: WindowMode,
        apply_to_ledger: bool,
    ) -> Result<Tick<'_>, ReplayError> {
        match mode {
            WindowMode::Time(t) => self.stream(t.step, t.initial_width, apply_to_ledger),
            WindowMode::Count { size } => self.box_stream(size, apply_to_ledger),
        }
    }

    fn deliver(&mut self, window: Window, apply: bool) -> Tick<'_> {
        let seq = self.ticks;
        self.ticks += 1;

        let events = self.log.slice(window.rows.clone());
        log_window(seq, &window, events, apply);

        let report = apply.then(|| self.state.fold(window.rows.start, events));

        Tick {
            seq,
            window,
            events,
            report,
            counters: self.state.counters(),
            open_orders: self.state.open_orders(),
            anomalies: self.state.anomalies().records(),
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.state
    }

    pub fn counters(&self) -> Counters {
        self.state.counters()
    }

    pub fn open_orders(&self) -> usize {
        self.state.open_orders()
    }

    pub fn anomalies(&self) -> &[AnomalyRecord] {
        self.state.anomalies().records()
    }

    pub fn watermark(&self) -> Option<usize> {
        self.state.watermark().last_applied()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            ticks: self.ticks,
            rows_total: self.log.len(),
            watermark: self.watermark(),
            counters: self.counters(),
            open_orders: self.open_orders(),
            anomalies: self.state.anomalies().projection(),
        }
    }
}

fn log_window(seq: u64, window: &Window, events: &[OrderEvent], apply: bool) {
    let first = events.first().map(|e| e.timestamp.to_rfc3339());
    let last = events.last().map(|e| e.timestamp.to_rfc3339());
    info!(
        seq,
        rows = events.len(),
        first_row = window.rows.start,
        bounds = ?window.bounds,
        flushed = window.flushed,
        preview = !apply,
        "streaming {} row(s) from {} to {}",
        events.len(),
        first.as_deref().unwrap_or("-"),
        last.as_deref().unwrap_or("-"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ofr_schemas::{Direction, MessageType};

    fn ev(id: &str, m: MessageType, secs: i64) -> OrderEvent {
        OrderEvent::new(
            id,
            m,
            Utc.timestamp_opt(secs, 0).unwrap(),
            "RY",
            Direction::NbfToExchange,
        )
    }

    fn session() -> ReplaySession {
        use MessageType::*;
        ReplaySession::new(EventLog::from_events(vec![
            ev("1", NewOrderRequest, 0),
            ev("1", NewOrderAcknowledged, 1),
            ev("2", NewOrderRequest, 2),
            ev("1", Trade, 3),
            ev("2", CancelRequest, 4),
        ]))
    }

    #[test]
    fn count_stream_folds_each_window() {
        let mut s = session();
        let t = s.box_stream(2, true).unwrap();
        assert_eq!(t.seq, 0);
        assert_eq!(t.events.len(), 2);
        assert_eq!(t.open_orders, 1);

        let t = s.box_stream(2, true).unwrap();
        assert_eq!(t.counters.executed, 1);
        assert_eq!(t.open_orders, 1);

        let t = s.box_stream(2, true).unwrap();
        assert!(t.is_flush());
        assert_eq!(t.anomalies.len(), 1);
        assert_eq!(t.open_orders, 0);
        assert_eq!(s.watermark(), Some(4));
    }

    #[test]
    fn repeated_tail_does_not_refold() {
        let mut s = session();
        while !s.box_stream(3, true).unwrap().is_flush() {}
        let before = s.snapshot();

        let t = s.box_stream(3, true).unwrap();
        let report = t.report.unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped, 2);

        let mut after = s.snapshot();
        after.ticks = before.ticks;
        assert_eq!(after, before);
    }

    #[test]
    fn preview_moves_cursor_without_touching_ledger() {
        let mut s = session();
        let t = s.stream(TimeDelta::seconds(1), TimeDelta::seconds(2), false).unwrap();
        assert!(t.is_preview());
        assert_eq!(t.events.len(), 2);
        assert_eq!(s.watermark(), None);
        assert_eq!(s.open_orders(), 0);

        // Next window [1,3) overlaps the previewed rows; row 0 is never folded.
        let t = s.stream(TimeDelta::seconds(1), TimeDelta::seconds(2), true).unwrap();
        assert_eq!(t.window.rows, 1..3);
        assert_eq!(t.report.unwrap().applied, 2);
        assert_eq!(s.anomalies().len(), 1);
    }

    #[test]
    fn advance_dispatches_by_mode() {
        let mut s = session();
        let t = s.advance(WindowMode::Count { size: 5 }, true).unwrap();
        assert_eq!(t.events.len(), 5);
        assert!(!t.is_flush());

        let mut s = session();
        let t = s
            .advance(
                WindowMode::Time(TimeStep::new(TimeDelta::seconds(1), TimeDelta::seconds(1))),
                true,
            )
            .unwrap();
        assert_eq!(t.window.rows, 0..1);
    }

    #[test]
    fn invalid_parameters_leave_session_untouched() {
        let mut s = session();
        assert!(s.box_stream(0, true).is_err());
        assert!(s.stream(TimeDelta::zero(), TimeDelta::seconds(1), true).is_err());
        assert_eq!(s.ticks(), 0);
    }

    #[test]
    fn snapshot_serializes() {
        let mut s = session();
        s.box_stream(5, true).unwrap();
        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["rows_total"], 5);
        assert_eq!(json["counters"]["executed"], 1);
        assert_eq!(json["anomalies"][0]["order_id"], "2");
    }
}
