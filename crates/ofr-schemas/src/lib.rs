//! ofr-schemas
//!
//! Shared order-flow record types. Every other crate speaks in these types;
//! nothing here performs IO.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Opaque order identifier.
///
/// Source feeds carry ids either as JSON numbers or as strings; both are kept
/// in their textual form so `1` and `"1"` name the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<u64> for OrderId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

struct OrderIdVisitor;

impl<'de> Visitor<'de> for OrderIdVisitor {
    type Value = OrderId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an order id as string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<OrderId, E> {
        let t = v.trim();
        if t.is_empty() {
            return Err(E::custom("order id is empty"));
        }
        Ok(OrderId::new(t))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<OrderId, E> {
        Ok(OrderId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<OrderId, E> {
        Ok(OrderId::new(v.to_string()))
    }

    // pandas writes integer columns containing NaN as floats ("17.0").
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<OrderId, E> {
        if v.is_finite() && v.fract() == 0.0 {
            Ok(OrderId::new(format!("{}", v as i64)))
        } else {
            Err(E::custom(format!("order id is not integral: {v}")))
        }
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(OrderIdVisitor)
    }
}

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The closed set of order-lifecycle messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageType {
    NewOrderRequest,
    NewOrderAcknowledged,
    CancelRequest,
    CancelAcknowledged,
    Cancelled,
    Trade,
}

impl MessageType {
    /// All variants in lifecycle order.
    pub const ALL: [MessageType; 6] = [
        MessageType::NewOrderRequest,
        MessageType::NewOrderAcknowledged,
        MessageType::CancelRequest,
        MessageType::CancelAcknowledged,
        MessageType::Cancelled,
        MessageType::Trade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::NewOrderRequest => "NewOrderRequest",
            MessageType::NewOrderAcknowledged => "NewOrderAcknowledged",
            MessageType::CancelRequest => "CancelRequest",
            MessageType::CancelAcknowledged => "CancelAcknowledged",
            MessageType::Cancelled => "Cancelled",
            MessageType::Trade => "Trade",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the six literal message names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for MessageType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        MessageType::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == t)
            .ok_or_else(|| UnknownVariant {
                kind: "MessageType",
                value: t.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Venue-relative direction of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Participant → venue (requests).
    #[serde(rename = "NBFToExchange")]
    NbfToExchange,
    /// Venue → participant (acknowledgements, fills).
    #[serde(rename = "ExchangeToNBF")]
    ExchangeToNbf,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::NbfToExchange => "NBFToExchange",
            Direction::ExchangeToNbf => "ExchangeToNBF",
        }
    }

    /// Bar color used by the order-price chart.
    pub fn bar_color(&self) -> &'static str {
        match self {
            Direction::NbfToExchange => "green",
            Direction::ExchangeToNbf => "red",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "NBFToExchange" => Ok(Direction::NbfToExchange),
            "ExchangeToNBF" => Ok(Direction::ExchangeToNbf),
            other => Err(UnknownVariant {
                kind: "Direction",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// OrderEvent
// ---------------------------------------------------------------------------

/// One immutable row of the order-flow log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub order_price: Option<f64>,
    pub direction: Direction,
}

impl OrderEvent {
    pub fn new(
        order_id: impl Into<OrderId>,
        message_type: MessageType,
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            message_type,
            timestamp,
            symbol: symbol.into(),
            order_price: None,
            direction,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.order_price = Some(price);
        self
    }

    /// Price plotted on the demand/supply chart: outbound prices are negated
    /// so both sides of the flow sit on opposite sides of the axis.
    pub fn signed_price(&self) -> Option<f64> {
        self.order_price.map(|p| match self.direction {
            Direction::NbfToExchange => -p,
            Direction::ExchangeToNbf => p,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn message_type_round_trips_literal_names() {
        for m in MessageType::ALL {
            assert_eq!(m.as_str().parse::<MessageType>().unwrap(), m);
        }
        assert!("Filled".parse::<MessageType>().is_err());
    }

    #[test]
    fn order_id_accepts_numbers_and_strings() {
        let a: OrderId = serde_json::from_str("17").unwrap();
        let b: OrderId = serde_json::from_str("\"17\"").unwrap();
        let c: OrderId = serde_json::from_str("17.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(serde_json::from_str::<OrderId>("17.5").is_err());
        assert!(serde_json::from_str::<OrderId>("\"  \"").is_err());
    }

    #[test]
    fn direction_uses_feed_spelling() {
        let d: Direction = serde_json::from_str("\"ExchangeToNBF\"").unwrap();
        assert_eq!(d, Direction::ExchangeToNbf);
        assert_eq!(
            serde_json::to_string(&Direction::NbfToExchange).unwrap(),
            "\"NBFToExchange\""
        );
    }

    #[test]
    fn signed_price_negates_outbound_only() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let out = OrderEvent::new("1", MessageType::NewOrderRequest, ts, "RY", Direction::NbfToExchange)
            .with_price(10.5);
        let inb = OrderEvent::new("1", MessageType::Trade, ts, "RY", Direction::ExchangeToNbf)
            .with_price(10.5);
        let none = OrderEvent::new("2", MessageType::CancelRequest, ts, "RY", Direction::NbfToExchange);
        assert_eq!(out.signed_price(), Some(-10.5));
        assert_eq!(inb.signed_price(), Some(10.5));
        assert_eq!(none.signed_price(), None);
    }
}
