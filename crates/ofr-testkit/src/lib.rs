//! Fixtures for replay scenarios: order-flow builders, on-disk logs and
//! session drivers.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use ofr_eventlog::EventLog;
use ofr_replay::{ReplaySession, WindowMode};
use ofr_schemas::{Direction, MessageType, OrderEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

/// 2024-01-02T14:30:00Z, the default clock origin for fixtures.
pub const ORIGIN_SECS: i64 = 1_704_205_800;

pub fn origin() -> DateTime<Utc> {
    Utc.timestamp_opt(ORIGIN_SECS, 0)
        .single()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// FlowBuilder
// ---------------------------------------------------------------------------

/// Builds an event sequence on a simple clock.
///
/// Each [`send`][FlowBuilder::send] stamps the event at the current clock and
/// then advances it by the spacing. Direction follows the message: requests
/// go out, acknowledgements and fills come back.
#[derive(Debug, Clone)]
pub struct FlowBuilder {
    events: Vec<OrderEvent>,
    clock: DateTime<Utc>,
    spacing: TimeDelta,
    symbol: String,
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            clock: origin(),
            spacing: TimeDelta::seconds(1),
            symbol: "RY".to_string(),
        }
    }

    pub fn spacing(mut self, spacing: TimeDelta) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    /// Move the clock to `origin + offset` for the next event.
    pub fn at(mut self, offset: TimeDelta) -> Self {
        self.clock = origin() + offset;
        self
    }

    pub fn send(mut self, id: &str, m: MessageType) -> Self {
        let ev = OrderEvent::new(id, m, self.clock, self.symbol.as_str(), direction_of(m));
        self.events.push(ev);
        self.clock += self.spacing;
        self
    }

    pub fn send_priced(mut self, id: &str, m: MessageType, price: f64) -> Self {
        let ev = OrderEvent::new(id, m, self.clock, self.symbol.as_str(), direction_of(m))
            .with_price(price);
        self.events.push(ev);
        self.clock += self.spacing;
        self
    }

    /// Open, acknowledge and trade `id`.
    pub fn traded(self, id: &str) -> Self {
        self.send(id, MessageType::NewOrderRequest)
            .send(id, MessageType::NewOrderAcknowledged)
            .send(id, MessageType::Trade)
    }

    /// Full cancel handshake for `id`.
    pub fn cancelled(self, id: &str) -> Self {
        self.send(id, MessageType::NewOrderRequest)
            .send(id, MessageType::NewOrderAcknowledged)
            .send(id, MessageType::CancelRequest)
            .send(id, MessageType::CancelAcknowledged)
            .send(id, MessageType::Cancelled)
    }

    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    pub fn build(self) -> Vec<OrderEvent> {
        self.events
    }

    pub fn log(self) -> EventLog {
        EventLog::from_events(self.events)
    }
}

/// Requests travel out to the venue; everything else comes back.
pub fn direction_of(m: MessageType) -> Direction {
    match m {
        MessageType::NewOrderRequest | MessageType::CancelRequest => Direction::NbfToExchange,
        _ => Direction::ExchangeToNbf,
    }
}

/// One event per offset (in seconds), all `NewOrderRequest` with distinct ids.
pub fn log_at_secs(offsets: &[i64]) -> EventLog {
    EventLog::from_events(
        offsets
            .iter()
            .enumerate()
            .map(|(i, s)| {
                OrderEvent::new(
                    i as u64,
                    MessageType::NewOrderRequest,
                    origin() + TimeDelta::seconds(*s),
                    "RY",
                    Direction::NbfToExchange,
                )
            })
            .collect(),
    )
}

/// Per-order message paths used by [`scrambled_flow`]: a trade, a full
/// cancel, a cancel without acknowledgement, an orphan trade and an order
/// left open.
pub const FLOW_PATHS: [&[MessageType]; 5] = [
    &[
        MessageType::NewOrderRequest,
        MessageType::NewOrderAcknowledged,
        MessageType::Trade,
    ],
    &[
        MessageType::NewOrderRequest,
        MessageType::NewOrderAcknowledged,
        MessageType::CancelRequest,
        MessageType::CancelAcknowledged,
        MessageType::Cancelled,
    ],
    &[MessageType::NewOrderRequest, MessageType::CancelRequest],
    &[MessageType::Trade],
    &[MessageType::NewOrderRequest],
];

/// Deterministic mixed flow of valid and broken lifecycles.
///
/// Orders are laid out one after another with 100-999 ms between events;
/// the same seed always yields the same log.
pub fn scrambled_flow(seed: u64, orders: usize) -> Vec<OrderEvent> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::new();
    let mut t = origin();
    for o in 0..orders {
        let id = format!("{}", 1000 + o);
        let symbol = if o % 2 == 0 { "RY" } else { "TD" };
        let path = FLOW_PATHS[rng.gen_range(0..FLOW_PATHS.len())];
        for m in path {
            t += TimeDelta::milliseconds(rng.gen_range(100..1000));
            out.push(OrderEvent::new(
                id.as_str(),
                *m,
                t,
                symbol,
                direction_of(*m),
            ));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// On-disk logs
// ---------------------------------------------------------------------------

/// Write events as a JSON array of records in the wire field names.
pub fn write_json_log(dir: &Path, name: &str, events: &[OrderEvent]) -> Result<PathBuf> {
    let rows: Vec<Value> = events
        .iter()
        .map(|e| {
            json!({
                "OrderID": e.order_id.as_str(),
                "MessageType": e.message_type.as_str(),
                "TimeStamp": e.timestamp.to_rfc3339(),
                "Symbol": e.symbol,
                "OrderPrice": e.order_price,
                "Direction": e.direction.as_str(),
            })
        })
        .collect();
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(&rows).context("serialize json log")?;
    std::fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Write events as CSV with a header row.
pub fn write_csv_log(dir: &Path, name: &str, events: &[OrderEvent]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut w =
        csv::Writer::from_path(&path).with_context(|| format!("open {}", path.display()))?;
    w.write_record([
        "OrderID",
        "MessageType",
        "TimeStamp",
        "Symbol",
        "OrderPrice",
        "Direction",
    ])?;
    for e in events {
        let price = e.order_price.map(|p| p.to_string()).unwrap_or_default();
        w.write_record([
            e.order_id.as_str(),
            e.message_type.as_str(),
            &e.timestamp.to_rfc3339(),
            &e.symbol,
            &price,
            e.direction.as_str(),
        ])?;
    }
    w.flush().context("flush csv log")?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Session drivers
// ---------------------------------------------------------------------------

/// What one driven tick delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub rows: Range<usize>,
    pub flushed: bool,
}

/// Advance until the first flushed window (inclusive) or `max_ticks`.
pub fn drive_to_flush(
    session: &mut ReplaySession,
    mode: WindowMode,
    apply: bool,
    max_ticks: usize,
) -> Result<Vec<Delivered>> {
    let mut out = Vec::new();
    for _ in 0..max_ticks {
        let tick = session.advance(mode, apply)?;
        let d = Delivered {
            rows: tick.window.rows.clone(),
            flushed: tick.is_flush(),
        };
        out.push(d);
        if tick.is_flush() {
            break;
        }
    }
    Ok(out)
}
