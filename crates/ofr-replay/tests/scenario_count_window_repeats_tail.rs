//! Scenario: count windows of two rows over a five-row log deliver
//! 0-1, 2-3, then row 4 as the tail, and keep repeating it.

use chrono::{TimeZone, Utc};
use ofr_eventlog::EventLog;
use ofr_replay::ReplaySession;
use ofr_schemas::{Direction, MessageType, OrderEvent};

fn log() -> EventLog {
    use MessageType::*;
    let msgs = [
        NewOrderRequest,
        NewOrderAcknowledged,
        CancelRequest,
        CancelAcknowledged,
        Cancelled,
    ];
    EventLog::from_events(
        msgs.iter()
            .enumerate()
            .map(|(i, m)| {
                OrderEvent::new(
                    "7",
                    *m,
                    Utc.timestamp_opt(i as i64 * 10, 0).unwrap(),
                    "BMO",
                    Direction::NbfToExchange,
                )
                .with_price(10.0 + i as f64)
            })
            .collect(),
    )
}

#[test]
fn scenario_count_window_repeats_tail() {
    let mut s = ReplaySession::new(log());

    let t = s.box_stream(2, true).unwrap();
    assert_eq!(t.window.rows, 0..2);
    let t = s.box_stream(2, true).unwrap();
    assert_eq!(t.window.rows, 2..4);
    assert_eq!(t.open_orders, 1);

    let t = s.box_stream(2, true).unwrap();
    assert!(t.is_flush());
    assert_eq!(t.window.rows, 4..5);
    assert_eq!(t.counters.cancelled, 1);
    assert_eq!(t.open_orders, 0);

    let before = s.counters();
    for _ in 0..4 {
        let t = s.box_stream(2, true).unwrap();
        assert_eq!(t.window.rows, 4..5);
        assert!(t.is_flush());
    }
    assert_eq!(s.counters(), before);
    assert!(s.anomalies().is_empty());
}

#[test]
fn preview_then_apply_folds_only_later_windows() {
    let mut s = ReplaySession::new(log());
    let t = s.box_stream(2, false).unwrap();
    assert!(t.is_preview());
    assert_eq!(s.snapshot().watermark, None);

    // Rows 0-1 were only previewed, so row 2 arrives for an unknown order.
    let t = s.box_stream(2, true).unwrap();
    let report = t.report.unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.anomalies, 2);
    assert_eq!(s.anomalies()[0].row, 2);
}
