//! Window cursors.
//!
//! A cursor remembers the bounds of the last window it produced and, on each
//! call, shifts them forward and returns the log rows inside. Two variants:
//!
//! - [`TimeCursor`]: half-open timestamp interval `[lower, upper)`.
//! - [`CountCursor`]: half-open row interval `[lower, upper)`.
//!
//! # Overrun
//!
//! When the shifted upper bound passes the end of the log the cursor flushes:
//! it returns every row not yet exposed by an earlier window, and keeps
//! returning that same tail on every later call. Rows are never dropped at
//! the end of the stream.

use std::ops::Range;

use chrono::{DateTime, TimeDelta, Utc};
use ofr_eventlog::EventLog;
use serde::Serialize;

use crate::error::ReplayError;

/// Bounds of a produced window, in the cursor's own units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowBounds {
    Time {
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    },
    Rows {
        lower: usize,
        upper: usize,
    },
    /// The log has no rows.
    Empty,
}

/// One step of a cursor: which rows to deliver and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Contiguous row range in the log.
    pub rows: Range<usize>,
    pub bounds: WindowBounds,
    /// `true` when this is the overrun tail rather than a regular window.
    pub flushed: bool,
}

impl Window {
    fn empty() -> Self {
        Window {
            rows: 0..0,
            bounds: WindowBounds::Empty,
            flushed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A stateful window selector over an [`EventLog`].
pub trait WindowCursor {
    /// Per-call stepping parameters.
    type Step;

    /// Shift the window forward and return the rows it now covers.
    fn advance(&mut self, log: &EventLog, step: Self::Step) -> Result<Window, ReplayError>;

    /// First row not yet exposed by any window.
    fn exposed_upto(&self) -> usize;

    /// Forget all bounds and start again from the head of the log.
    fn reset(&mut self);
}

// ---------------------------------------------------------------------------
// Shared overrun bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Exposure {
    /// Rows `[0, upto)` have been covered by some window.
    upto: usize,
    /// Set on first overrun; start of the tail returned from then on.
    tail_start: Option<usize>,
}

impl Exposure {
    fn expose(&mut self, rows: &Range<usize>) {
        self.upto = self.upto.max(rows.end);
    }

    fn flush(&mut self, len: usize) -> Range<usize> {
        let start = *self.tail_start.get_or_insert(self.upto.min(len));
        self.upto = len;
        start..len
    }
}

// ---------------------------------------------------------------------------
// TimeCursor
// ---------------------------------------------------------------------------

/// Parameters for one [`TimeCursor`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStep {
    /// How far both bounds move per call.
    pub step: TimeDelta,
    /// Width of the very first window. Ignored once the cursor has bounds.
    pub initial_width: TimeDelta,
}

impl TimeStep {
    pub fn new(step: TimeDelta, initial_width: TimeDelta) -> Self {
        Self {
            step,
            initial_width,
        }
    }

    fn validate(&self) -> Result<(), ReplayError> {
        if self.step <= TimeDelta::zero() {
            return Err(ReplayError::NonPositiveStep { field: "step" });
        }
        if self.initial_width <= TimeDelta::zero() {
            return Err(ReplayError::NonPositiveStep {
                field: "initial_width",
            });
        }
        Ok(())
    }
}

/// Time-bucketed cursor.
///
/// The first call opens `[first_ts, first_ts + initial_width)`. Every later
/// call shifts both bounds by `step`; a window with no rows is skipped and
/// shifted again until one has rows or the upper bound passes the last
/// timestamp.
#[derive(Debug, Clone, Default)]
pub struct TimeCursor {
    bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
    exposure: Exposure,
}

impl TimeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds of the last window produced, if any.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.bounds
    }

    fn overrun(&mut self, log: &EventLog, lower: DateTime<Utc>, upper: DateTime<Utc>) -> Window {
        self.bounds = Some((lower, upper));
        Window {
            rows: self.exposure.flush(log.len()),
            bounds: WindowBounds::Time { lower, upper },
            flushed: true,
        }
    }
}

impl WindowCursor for TimeCursor {
    type Step = TimeStep;

    fn advance(&mut self, log: &EventLog, step: TimeStep) -> Result<Window, ReplayError> {
        step.validate()?;

        let (Some(first), Some(last)) = (log.first_timestamp(), log.last_timestamp()) else {
            return Ok(Window::empty());
        };

        let (mut lower, mut upper) = match (self.exposure.tail_start, self.bounds) {
            (Some(_), Some((lower, upper))) => return Ok(self.overrun(log, lower, upper)),
            (_, None) => match first.checked_add_signed(step.initial_width) {
                Some(upper) => (first, upper),
                None => return Ok(self.overrun(log, first, DateTime::<Utc>::MAX_UTC)),
            },
            (None, Some((lower, upper))) => match shift(lower, upper, step.step, 1) {
                Some(b) => b,
                None => return Ok(self.overrun(log, lower, DateTime::<Utc>::MAX_UTC)),
            },
        };

        loop {
            if upper > last {
                return Ok(self.overrun(log, lower, upper));
            }

            let rows = log.rows_between(lower, upper);
            if !rows.is_empty() {
                self.bounds = Some((lower, upper));
                self.exposure.expose(&rows);
                return Ok(Window {
                    rows,
                    bounds: WindowBounds::Time { lower, upper },
                    flushed: false,
                });
            }

            // Every window whose upper bound is still at or before the next
            // event is empty too, so jump past them in one shift.
            let next_ts = match log.get(rows.start) {
                Some(ev) => ev.timestamp,
                None => return Ok(self.overrun(log, lower, upper)),
            };
            let k = steps_past(next_ts - upper, step.step);
            match shift(lower, upper, step.step, k) {
                Some((l, u)) => {
                    lower = l;
                    upper = u;
                }
                None => return Ok(self.overrun(log, lower, DateTime::<Utc>::MAX_UTC)),
            }
        }
    }

    fn exposed_upto(&self) -> usize {
        self.exposure.upto
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn shift(
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    step: TimeDelta,
    times: i32,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let by = step.checked_mul(times)?;
    Some((lower.checked_add_signed(by)?, upper.checked_add_signed(by)?))
}

/// Smallest `k >= 1` with `k * step > gap`.
fn steps_past(gap: TimeDelta, step: TimeDelta) -> i32 {
    match (gap.num_nanoseconds(), step.num_nanoseconds()) {
        (Some(g), Some(s)) if s > 0 && g >= 0 => {
            i32::try_from(g / s + 1).unwrap_or(i32::MAX)
        }
        _ => 1,
    }
}

// ---------------------------------------------------------------------------
// CountCursor
// ---------------------------------------------------------------------------

/// Count-bucketed cursor.
///
/// The first call covers rows `[0, size)`; every later call shifts both
/// bounds by `size`.
#[derive(Debug, Clone, Default)]
pub struct CountCursor {
    bounds: Option<(usize, usize)>,
    exposure: Exposure,
}

impl CountCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Option<(usize, usize)> {
        self.bounds
    }
}

impl WindowCursor for CountCursor {
    type Step = usize;

    fn advance(&mut self, log: &EventLog, size: usize) -> Result<Window, ReplayError> {
        if size == 0 {
            return Err(ReplayError::ZeroWindowSize);
        }
        if log.is_empty() {
            return Ok(Window::empty());
        }

        let (lower, upper) = match (self.exposure.tail_start, self.bounds) {
            (Some(_), Some(b)) => b,
            (_, None) => (0, size),
            (None, Some((lower, upper))) => {
                (lower.saturating_add(size), upper.saturating_add(size))
            }
        };
        self.bounds = Some((lower, upper));
        let bounds = WindowBounds::Rows { lower, upper };

        if upper > log.len() {
            return Ok(Window {
                rows: self.exposure.flush(log.len()),
                bounds,
                flushed: true,
            });
        }

        let rows = lower..upper;
        self.exposure.expose(&rows);
        Ok(Window {
            rows,
            bounds,
            flushed: false,
        })
    }

    fn exposed_upto(&self) -> usize {
        self.exposure.upto
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ofr_schemas::{Direction, MessageType, OrderEvent};

    fn log_at(secs: &[i64]) -> EventLog {
        EventLog::from_events(
            secs.iter()
                .enumerate()
                .map(|(i, s)| {
                    OrderEvent::new(
                        i as u64,
                        MessageType::NewOrderRequest,
                        Utc.timestamp_opt(*s, 0).unwrap(),
                        "RY",
                        Direction::NbfToExchange,
                    )
                })
                .collect(),
        )
    }

    fn secs(n: i64) -> TimeDelta {
        TimeDelta::seconds(n)
    }

    #[test]
    fn time_cursor_walks_then_flushes_tail() {
        let log = log_at(&[0, 1, 2, 5]);
        let mut c = TimeCursor::new();
        let step = TimeStep::new(secs(1), secs(1));

        assert_eq!(c.advance(&log, step).unwrap().rows, 0..1);
        assert_eq!(c.advance(&log, step).unwrap().rows, 1..2);
        assert_eq!(c.advance(&log, step).unwrap().rows, 2..3);

        // [3,4) and [4,5) are empty; [5,6) overruns the last timestamp.
        let w = c.advance(&log, step).unwrap();
        assert!(w.flushed);
        assert_eq!(w.rows, 3..4);

        let again = c.advance(&log, step).unwrap();
        assert_eq!(again.rows, 3..4);
        assert!(again.flushed);
    }

    #[test]
    fn time_cursor_skips_long_gaps() {
        let log = log_at(&[0, 10_000, 10_001, 20_000]);
        let mut c = TimeCursor::new();
        let step = TimeStep::new(secs(1), secs(2));

        assert_eq!(c.advance(&log, step).unwrap().rows, 0..1);
        // Lands on the first step-aligned window that reaches t=10000.
        let w = c.advance(&log, step).unwrap();
        assert_eq!(w.rows, 1..2);
        assert_eq!(
            w.bounds,
            WindowBounds::Time {
                lower: Utc.timestamp_opt(9_999, 0).unwrap(),
                upper: Utc.timestamp_opt(10_001, 0).unwrap(),
            }
        );
        assert_eq!(c.advance(&log, step).unwrap().rows, 1..3);
    }

    #[test]
    fn overlapping_windows_share_rows() {
        let log = log_at(&[0, 1, 2, 3, 4]);
        let mut c = TimeCursor::new();
        let step = TimeStep::new(secs(1), secs(3));

        assert_eq!(c.advance(&log, step).unwrap().rows, 0..3);
        assert_eq!(c.advance(&log, step).unwrap().rows, 1..4);
        assert_eq!(c.exposed_upto(), 4);
        // [2,5) passes the last timestamp: only row 4 was never exposed.
        let w = c.advance(&log, step).unwrap();
        assert!(w.flushed);
        assert_eq!(w.rows, 4..5);
    }

    #[test]
    fn first_window_wider_than_log_flushes_everything() {
        let log = log_at(&[0, 1, 2]);
        let mut c = TimeCursor::new();
        let w = c.advance(&log, TimeStep::new(secs(1), secs(60))).unwrap();
        assert!(w.flushed);
        assert_eq!(w.rows, 0..3);
    }

    #[test]
    fn time_cursor_rejects_non_positive_step() {
        let log = log_at(&[0]);
        let mut c = TimeCursor::new();
        assert_eq!(
            c.advance(&log, TimeStep::new(secs(0), secs(1))),
            Err(ReplayError::NonPositiveStep { field: "step" })
        );
        assert_eq!(
            c.advance(&log, TimeStep::new(secs(1), secs(-1))),
            Err(ReplayError::NonPositiveStep {
                field: "initial_width"
            })
        );
        assert!(c.bounds().is_none());
    }

    #[test]
    fn empty_log_yields_empty_window() {
        let log = EventLog::from_events(vec![]);
        let w = TimeCursor::new()
            .advance(&log, TimeStep::new(secs(1), secs(1)))
            .unwrap();
        assert!(w.is_empty());
        assert_eq!(w.bounds, WindowBounds::Empty);
        assert!(CountCursor::new().advance(&log, 3).unwrap().is_empty());
    }

    #[test]
    fn count_cursor_walks_then_repeats_tail() {
        let log = log_at(&[0, 1, 2, 3, 4]);
        let mut c = CountCursor::new();
        assert_eq!(c.advance(&log, 2).unwrap().rows, 0..2);
        assert_eq!(c.advance(&log, 2).unwrap().rows, 2..4);

        let w = c.advance(&log, 2).unwrap();
        assert!(w.flushed);
        assert_eq!(w.rows, 4..5);
        assert_eq!(c.advance(&log, 2).unwrap().rows, 4..5);
    }

    #[test]
    fn count_cursor_tail_may_be_empty() {
        let log = log_at(&[0, 1, 2, 3]);
        let mut c = CountCursor::new();
        c.advance(&log, 2).unwrap();
        c.advance(&log, 2).unwrap();
        let w = c.advance(&log, 2).unwrap();
        assert!(w.flushed);
        assert!(w.is_empty());
    }

    #[test]
    fn count_cursor_rejects_zero_size() {
        let log = log_at(&[0]);
        assert_eq!(
            CountCursor::new().advance(&log, 0),
            Err(ReplayError::ZeroWindowSize)
        );
    }

    #[test]
    fn reset_restarts_from_head() {
        let log = log_at(&[0, 1, 2]);
        let mut c = CountCursor::new();
        c.advance(&log, 2).unwrap();
        c.advance(&log, 2).unwrap();
        c.reset();
        assert_eq!(c.advance(&log, 2).unwrap().rows, 0..2);
    }
}
