use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::identity::ClientIdentity;
use crate::client::state::Link;
use crate::config::ClientSettings;
use crate::dispatch::{AlertEvent, ClientEvent, Dispatcher};
use crate::protocol::encode_send;
use crate::subscription::METER_READING;

/// Body of a reading report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadingReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
    current_usage: f64,
    timestamp: f64,
}

/// Publishes readings on the live connection, best effort.
///
/// Nothing is queued: a reading that cannot be written right now is dropped
/// and the consumer gets an alert instead.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    identity: ClientIdentity,
    settings: Arc<ClientSettings>,
    link: Arc<Link>,
    dispatcher: Dispatcher,
}

impl OutboundSender {
    pub(crate) fn new(
        identity: ClientIdentity,
        settings: Arc<ClientSettings>,
        link: Arc<Link>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            identity,
            settings,
            link,
            dispatcher,
        }
    }

    /// Sends `current_usage` stamped with the current time.
    ///
    /// Returns whether the frame was handed to the socket writer.
    pub fn send_reading(&self, current_usage: f64) -> bool {
        let Some(writer) = self.link.live_writer() else {
            warn!("Cannot send reading, WebSocket is not connected");
            self.alert();
            return false;
        };

        let frame = match self.reading_frame(current_usage, now()) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode reading {current_usage}: {e}");
                return false;
            }
        };

        if writer.send(WsMessage::text(frame)).is_err() {
            error!("Connection is closed, reading {current_usage} dropped");
            self.alert();
            return false;
        }
        debug!("Reading {current_usage} sent to {METER_READING}");
        true
    }

    /// The SEND frame reporting `current_usage` at `timestamp`.
    pub(crate) fn reading_frame(
        &self,
        current_usage: f64,
        timestamp: f64,
    ) -> Result<String, serde_json::Error> {
        let mut headers = Vec::with_capacity(2);
        if self.settings.client_id_header {
            headers.push(("clientId", self.identity.as_str()));
        }
        if let Some(token) = self.settings.auth_token.as_deref() {
            headers.push(("authToken", token));
        }

        let report = ReadingReport {
            client_id: self
                .settings
                .client_id_in_body
                .then(|| self.identity.as_str()),
            current_usage,
            timestamp,
        };
        encode_send(METER_READING, &headers, &report)
    }

    fn alert(&self) {
        self.dispatcher
            .try_deliver(ClientEvent::Alert(AlertEvent::unreachable()));
    }
}

/// Unix time in seconds with millisecond precision.
fn now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
