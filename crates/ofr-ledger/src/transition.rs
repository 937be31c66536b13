//! Order-lifecycle transition table.
//!
//! ```text
//!   (absent) ──NewOrderRequest──► NewOrderRequest
//!                                      │ NewOrderAcknowledged
//!                                      ▼
//!                            NewOrderAcknowledged ──Trade──► (closed, executed)
//!                                      │ CancelRequest
//!                                      ▼
//!                                CancelRequest
//!                                      │ CancelAcknowledged
//!                                      ▼
//!                             CancelAcknowledged ──Cancelled──► (closed, cancelled)
//! ```
//!
//! Each message has exactly one legal predecessor. Anything else is a
//! [`ProtocolViolation`].

use std::fmt;

use ofr_schemas::{MessageType, OrderId};
use serde::{Serialize, Serializer};

/// Where an order id sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No open order with this id.
    Absent,
    /// Open, last valid message was the wrapped one.
    At(MessageType),
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Absent => f.write_str("absent"),
            LifecycleState::At(m) => f.write_str(m.as_str()),
        }
    }
}

// Serialized as its display form: `"absent"` or the message name.
impl Serialize for LifecycleState {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// The single state an order must be in to accept `incoming`.
///
/// A new [`MessageType`] variant does not compile until it has a
/// predecessor here.
pub fn required_predecessor(incoming: MessageType) -> LifecycleState {
    use LifecycleState::*;
    use MessageType::*;

    match incoming {
        NewOrderRequest => Absent,
        NewOrderAcknowledged => At(NewOrderRequest),
        CancelRequest => At(NewOrderAcknowledged),
        CancelAcknowledged => At(CancelRequest),
        Cancelled => At(CancelAcknowledged),
        Trade => At(NewOrderAcknowledged),
    }
}

/// Outcome of a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new order entered the ledger.
    Opened,
    /// An open order moved to a new intermediate state.
    Advanced { from: MessageType, to: MessageType },
    /// `CancelAcknowledged -> Cancelled`; order removed.
    Cancelled,
    /// `NewOrderAcknowledged -> Trade`; order removed.
    Executed,
}

/// Returned when an event does not match its order's required predecessor.
///
/// By the time a caller sees this, the order has already been evicted from
/// the ledger and the cancellation counter bumped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolViolation {
    pub order_id: OrderId,
    /// The message that arrived.
    pub received: MessageType,
    /// The state the order was actually in.
    pub observed: LifecycleState,
    /// The state the order had to be in.
    pub expected: LifecycleState,
}

impl ProtocolViolation {
    /// Human-readable mismatch description stored in the anomaly log.
    pub fn reason(&self) -> String {
        match self.observed {
            LifecycleState::Absent => format!(
                "[NEW ORDER] order `{}`: expected {}, but got `{}`; order was never opened",
                self.order_id, self.expected, self.received
            ),
            LifecycleState::At(_) => format!(
                "order `{}`: `{}` requires state {}, but order was in `{}`; order evicted",
                self.order_id, self.received, self.expected, self.observed
            ),
        }
    }
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

impl std::error::Error for ProtocolViolation {}
