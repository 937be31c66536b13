use std::collections::HashMap;

use ofr_schemas::{MessageType, OrderEvent, OrderId};
use serde::Serialize;

use crate::transition::{required_predecessor, LifecycleState, ProtocolViolation, Transition};

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Outcome counters. Both only ever increase.
///
/// `cancelled` is also bumped for every protocol violation, so it counts
/// "orders closed without a trade" rather than strictly acknowledged
/// cancellations. Subtract the anomaly log length to recover the latter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub cancelled: u64,
    pub executed: u64,
}

impl Counters {
    pub fn total(&self) -> u64 {
        self.cancelled + self.executed
    }
}

// ---------------------------------------------------------------------------
// OrderLedger
// ---------------------------------------------------------------------------

/// Open orders keyed by id, each holding its last valid message.
///
/// An id is present iff the order is open: terminal transitions and
/// violations both remove it.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    orders: HashMap<OrderId, MessageType>,
    counters: Counters,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event through the transition table.
    ///
    /// # Errors
    /// Returns [`ProtocolViolation`] when the order is not in the required
    /// predecessor state. The order has already been evicted and
    /// `cancelled` incremented when this is returned.
    pub fn apply(&mut self, ev: &OrderEvent) -> Result<Transition, ProtocolViolation> {
        let to = ev.message_type;
        let current = self.state_of(&ev.order_id);
        let required = required_predecessor(to);

        if current != required {
            // An unknown id must first be opened, whatever arrived.
            let expected = match current {
                LifecycleState::Absent => LifecycleState::At(MessageType::NewOrderRequest),
                LifecycleState::At(_) => required,
            };
            self.orders.remove(&ev.order_id);
            self.counters.cancelled += 1;
            return Err(ProtocolViolation {
                order_id: ev.order_id.clone(),
                received: to,
                observed: current,
                expected,
            });
        }

        let transition = match current {
            // Only NewOrderRequest has an absent predecessor.
            LifecycleState::Absent => {
                self.orders.insert(ev.order_id.clone(), to);
                Transition::Opened
            }
            LifecycleState::At(from) => match to {
                MessageType::Cancelled => {
                    self.orders.remove(&ev.order_id);
                    self.counters.cancelled += 1;
                    Transition::Cancelled
                }
                MessageType::Trade => {
                    self.orders.remove(&ev.order_id);
                    self.counters.executed += 1;
                    Transition::Executed
                }
                _ => {
                    self.orders.insert(ev.order_id.clone(), to);
                    Transition::Advanced { from, to }
                }
            },
        };

        Ok(transition)
    }

    pub fn state_of(&self, id: &OrderId) -> LifecycleState {
        self.orders
            .get(id)
            .map_or(LifecycleState::Absent, |m| LifecycleState::At(*m))
    }

    /// Number of open orders.
    pub fn open_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Open orders sorted by id.
    pub fn open(&self) -> Vec<(&OrderId, MessageType)> {
        let mut v: Vec<_> = self.orders.iter().map(|(k, m)| (k, *m)).collect();
        v.sort_by(|a, b| a.0.cmp(b.0));
        v
    }
}
