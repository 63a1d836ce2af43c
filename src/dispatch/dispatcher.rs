use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dispatch::event::{AlertEvent, ClientEvent, ReadingEvent};
use crate::protocol::{FramingMode, Inbound, inbound_payload};

const READING_KEYS: [&str; 3] = ["currentUsage", "currentCost", "totalBill"];

/// Result of classifying one JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Reading(ReadingEvent),
    Alert(AlertEvent),
    Unrecognized,
}

/// Classifies a JSON document.
///
/// An object carrying every reading key is a reading, otherwise an object
/// with `message` is an alert; a non-string message is kept as its JSON text.
/// Anything else is unrecognized. Fails only when the text is not JSON or a
/// reading has wrongly typed figures.
pub fn classify(json: &str) -> Result<Classified, serde_json::Error> {
    let value: Value = serde_json::from_str(json)?;
    let Some(object) = value.as_object() else {
        return Ok(Classified::Unrecognized);
    };

    if READING_KEYS.iter().all(|key| object.contains_key(*key)) {
        return serde_json::from_value(value).map(Classified::Reading);
    }
    if let Some(message) = object.get("message") {
        let message = match message {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Ok(Classified::Alert(AlertEvent::new(message)));
    }
    Ok(Classified::Unrecognized)
}

/// Routes inbound text messages to the consumer's event channel.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    events: mpsc::Sender<ClientEvent>,
    framing: FramingMode,
}

impl Dispatcher {
    pub fn new(events: mpsc::Sender<ClientEvent>, framing: FramingMode) -> Self {
        Self { events, framing }
    }

    /// Extracts, classifies and forwards one inbound text message.
    pub async fn handle_text(&self, raw: &str) {
        if let Some(event) = self.event_for(raw) {
            self.deliver(event).await;
        }
    }

    /// The event carried by one inbound text message, if any. Frames that
    /// cannot be decoded are logged and yield `None`.
    pub fn event_for(&self, raw: &str) -> Option<ClientEvent> {
        let inbound = match inbound_payload(raw, self.framing) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!("Dropping malformed frame: {e}");
                return None;
            }
        };

        let event = match inbound {
            Inbound::Nothing => {
                debug!("Frame without payload ignored");
                return None;
            }
            Inbound::BrokerError(message) => {
                warn!("Broker error: {message}");
                ClientEvent::Alert(AlertEvent::new(message))
            }
            Inbound::Json(json) => {
                info!("Received message: {json}");
                match classify(&json) {
                    Ok(Classified::Reading(reading)) => ClientEvent::Reading(reading),
                    Ok(Classified::Alert(alert)) => ClientEvent::Alert(alert),
                    Ok(Classified::Unrecognized) => {
                        warn!("Unrecognized payload dropped: {json}");
                        return None;
                    }
                    Err(e) => {
                        error!("Malformed payload dropped: {e} | {json}");
                        return None;
                    }
                }
            }
        };
        Some(event)
    }

    /// Hands `event` to the consumer, waiting for queue space.
    pub async fn deliver(&self, event: ClientEvent) {
        if self.events.send(event).await.is_err() {
            warn!("Event receiver dropped, notification discarded");
        }
    }

    /// Non-blocking variant for callers outside the supervisor task.
    pub fn try_deliver(&self, event: ClientEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Event queue full, dropping {event:?}");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Event receiver dropped, notification discarded");
            }
        }
    }
}
