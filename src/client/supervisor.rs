//! The reconnecting connection loop.
//!
//! One `Supervisor` runs per [`MeterClient::connect`](crate::client::MeterClient::connect)
//! on its own tokio task:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Disconnected -> (backoff) -> Connecting ...
//! ```
//!
//! The stop flag is a `watch` channel observed while opening, while
//! streaming and while sleeping, so a stop request takes effect at the next
//! poll. Once it is set no new socket is opened.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, timeout};
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::state::{ConnectionState, Link};
use crate::config::Settings;
use crate::dispatch::{ClientEvent, Dispatcher};
use crate::protocol::encode_connect;
use crate::subscription::SubscriptionSet;
use crate::transport::{self, WsStream};

/// Interval of client heart-beats, matching the CONNECT proposal.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// How long a closing writer may take to flush before it is aborted.
const WRITER_GRACE: Duration = Duration::from_secs(1);

pub(crate) struct Supervisor {
    settings: Arc<Settings>,
    subscriptions: SubscriptionSet,
    link: Arc<Link>,
    dispatcher: Dispatcher,
}

/// True once a stop was requested or the client was dropped.
fn stopped(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}

/// Resolves when a stop is requested or the client is dropped.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

impl Supervisor {
    pub fn new(
        settings: Arc<Settings>,
        subscriptions: SubscriptionSet,
        link: Arc<Link>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            settings,
            subscriptions,
            link,
            dispatcher,
        }
    }

    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let url = self.settings.url();
        let delay = self.settings.client.reconnect_delay();
        let mut attempt: u64 = 0;

        while !stopped(&stop) {
            attempt += 1;
            self.set_state(ConnectionState::Connecting);
            info!("Connecting to {url} (attempt {attempt})");

            let opened = tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => None,
                opened = transport::open(&self.settings) => Some(opened),
            };
            match opened {
                None => break,
                Some(Ok(ws)) => {
                    attempt = 0;
                    self.stream(ws, &mut stop).await;
                }
                Some(Err(e)) => {
                    error!("Error in WebSocket connection: {e}");
                    self.set_state(ConnectionState::Disconnected);
                }
            }

            if stopped(&stop) {
                break;
            }
            info!("Reconnecting in {delay:?}...");
            tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => break,
                _ = sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Connection supervisor stopped");
    }

    /// Handshake, subscribe, then pump inbound frames until the socket ends.
    async fn stream(&self, ws: WsStream, stop: &mut watch::Receiver<bool>) {
        let (mut ws_sender, mut ws_receiver) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

        // Single write path for handshake, heart-beats and readings.
        let mut writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = msg.is_close();
                if let Err(e) = ws_sender.send(msg).await {
                    error!("Failed to write to broker: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = ws_sender.close().await;
            debug!("Writer closed");
        });

        let handshake = std::iter::once(encode_connect(&self.settings.broker.host))
            .chain(self.subscriptions.frames());
        for frame in handshake {
            // Cannot fail: `rx` lives until every sender is dropped.
            let _ = tx.send(WsMessage::text(frame));
        }

        self.link.install_writer(tx.clone());
        self.set_state(ConnectionState::Connected);
        info!(
            "Connected, subscribed to {} destinations",
            self.subscriptions.len()
        );
        if self.deliver_or_stop(ClientEvent::Connected, stop).await {
            self.pump(&mut ws_receiver, &tx, stop).await;
        }
        if stopped(stop) {
            info!("Disconnect requested, closing WebSocket");
            let _ = tx.send(WsMessage::Close(None));
        }

        self.link.take_writer();
        drop(tx);
        self.set_state(ConnectionState::Disconnected);

        if timeout(WRITER_GRACE, &mut writer).await.is_err() {
            debug!("Writer did not finish in {WRITER_GRACE:?}, aborting");
            writer.abort();
        }
        if stopped(stop) {
            self.dispatcher.try_deliver(ClientEvent::Disconnected);
        } else {
            self.deliver_or_stop(ClientEvent::Disconnected, stop).await;
        }
    }

    /// Reads inbound frames and sends heart-beats until the socket ends or a
    /// stop is requested.
    async fn pump(
        &self,
        ws_receiver: &mut SplitStream<WsStream>,
        tx: &mpsc::UnboundedSender<WsMessage>,
        stop: &mut watch::Receiver<bool>,
    ) {
        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(stop) => break,
                msg = ws_receiver.next() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let Some(event) = self.dispatcher.event_for(text.as_str()) else {
                            continue;
                        };
                        if !self.deliver_or_stop(event, stop).await {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!("WebSocket closed by broker: {frame:?}");
                        break;
                    }
                    Some(Ok(WsMessage::Binary(data))) => {
                        warn!("Ignoring {} byte binary message", data.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {e}");
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended");
                        break;
                    }
                },
                _ = heartbeat.tick() => {
                    let _ = tx.send(WsMessage::text("\n"));
                }
            }
        }
    }

    /// Waits for queue space unless a stop comes first. False when stopped.
    async fn deliver_or_stop(&self, event: ClientEvent, stop: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            biased;
            _ = stop_requested(stop) => {
                debug!("Stop requested while the event queue was full");
                false
            }
            _ = self.dispatcher.deliver(event) => true,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.link.state.send_replace(state);
        if previous != state {
            debug!("Connection state {previous:?} -> {state:?}");
        }
    }
}
