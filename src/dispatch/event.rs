use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Alert raised locally when a reading cannot reach the broker.
pub const UNREACHABLE_MESSAGE: &str = "An error occurred while communicating with the server.";

/// Consumption figures computed by the broker for this meter.
///
/// # Example
///
/// ```rust
/// use meterlink::dispatch::ReadingEvent;
///
/// let event: ReadingEvent = serde_json::from_str(
///     r#"{"currentUsage":1.23,"currentCost":4.56,"totalBill":7.89,"timestamp":1700000000}"#,
/// )
/// .unwrap();
/// assert_eq!(event.total_bill, 7.89);
/// assert!(event.extra.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEvent {
    pub current_usage: f64,
    pub current_cost: f64,
    pub total_bill: f64,
    /// Unix time in seconds, possibly fractional.
    #[serde(default)]
    pub timestamp: Option<f64>,
    /// Any other fields the broker sent, kept as received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReadingEvent {
    pub fn new(current_usage: f64, current_cost: f64, total_bill: f64) -> Self {
        Self {
            current_usage,
            current_cost,
            total_bill,
            timestamp: None,
            extra: Map::new(),
        }
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The reading's timestamp as a UTC date, when present and in range.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp.filter(|ts| ts.is_finite())?;
        let secs = ts.floor();
        let nanos = ((ts - secs) * 1e9) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}

/// A human readable alert, from the broker or synthesized by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub message: String,
}

impl AlertEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The alert raised when a reading is attempted while disconnected.
    pub fn unreachable() -> Self {
        Self::new(UNREACHABLE_MESSAGE)
    }
}

/// Notifications delivered to the consumer, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Handshake and subscriptions were sent; readings can be published.
    Connected,
    Reading(ReadingEvent),
    Alert(AlertEvent),
    /// The socket was lost or closed; a reconnect follows unless stopped.
    Disconnected,
}
