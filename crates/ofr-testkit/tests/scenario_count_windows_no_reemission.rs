//! Count windows: size=2 over five rows delivers 0-1, 2-3, then 4, and
//! never re-emits rows 0-3 afterwards.

use ofr_replay::{ReplaySession, WindowMode};
use ofr_testkit::{drive_to_flush, log_at_secs, Delivered};

#[test]
fn size_two_over_five_rows() {
    let mut s = ReplaySession::new(log_at_secs(&[0, 1, 2, 3, 4]));
    let mode = WindowMode::Count { size: 2 };

    let delivered = drive_to_flush(&mut s, mode, true, 10).unwrap();
    assert_eq!(
        delivered,
        vec![
            Delivered { rows: 0..2, flushed: false },
            Delivered { rows: 2..4, flushed: false },
            Delivered { rows: 4..5, flushed: true },
        ]
    );

    for _ in 0..3 {
        let t = s.box_stream(2, true).unwrap();
        assert_eq!(t.window.rows, 4..5);
        assert!(t.window.rows.start >= 4);
    }
    assert_eq!(s.open_orders(), 5);
    assert_eq!(s.watermark(), Some(4));
}

#[test]
fn exact_multiple_flushes_an_empty_tail() {
    let mut s = ReplaySession::new(log_at_secs(&[0, 1, 2, 3]));
    let delivered = drive_to_flush(&mut s, WindowMode::Count { size: 2 }, true, 10).unwrap();
    assert_eq!(delivered.len(), 3);
    assert!(delivered[2].flushed);
    assert!(delivered[2].rows.is_empty());
    assert_eq!(s.open_orders(), 4);
}

#[test]
fn window_larger_than_log_flushes_on_first_call() {
    let mut s = ReplaySession::new(log_at_secs(&[0, 1, 2]));
    let t = s.box_stream(10, true).unwrap();
    assert!(t.is_flush());
    assert_eq!(t.window.rows, 0..3);
    assert_eq!(t.open_orders, 3);
}
