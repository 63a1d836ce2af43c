use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::client::identity::ClientIdentity;
use crate::client::sender::OutboundSender;
use crate::client::state::{ConnectionState, Link};
use crate::client::supervisor::Supervisor;
use crate::config::Settings;
use crate::dispatch::{ClientEvent, Dispatcher};
use crate::subscription::SubscriptionSet;
use crate::utils::error::Result;

/// A running supervisor and the switch that stops it.
#[derive(Debug)]
struct Session {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Handle to one meter's broker connection.
///
/// `connect` starts a background supervisor that keeps the connection
/// alive; events arrive on the receiver returned by [`MeterClient::new`].
/// All methods take `&self`, so the client can be shared behind an `Arc`
/// and stopped from any thread.
#[derive(Debug)]
pub struct MeterClient {
    settings: Arc<Settings>,
    identity: ClientIdentity,
    subscriptions: SubscriptionSet,
    link: Arc<Link>,
    dispatcher: Dispatcher,
    sender: OutboundSender,
    session: Mutex<Option<Session>>,
}

impl MeterClient {
    /// Builds a disconnected client and the receiver of its events.
    pub fn new(settings: Settings) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::channel(settings.client.event_buffer.max(1));
        let identity = ClientIdentity::from_settings(&settings.client);
        let subscriptions =
            SubscriptionSet::for_client(&identity, settings.client.per_client_alerts);
        let dispatcher = Dispatcher::new(events_tx, settings.client.framing);
        let link = Arc::new(Link::new());
        let sender = OutboundSender::new(
            identity.clone(),
            Arc::new(settings.client.clone()),
            link.clone(),
            dispatcher.clone(),
        );

        let client = Self {
            settings: Arc::new(settings),
            identity,
            subscriptions,
            link,
            dispatcher,
            sender,
            session: Mutex::new(None),
        };
        (client, events_rx)
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// A receiver notified on every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.link.state.subscribe()
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the supervised connection loop on the current tokio runtime.
    ///
    /// Returns immediately. A no-op while a loop is already running.
    pub fn connect(&self) -> Result<()> {
        let handle = Handle::try_current()?;
        let mut session = self.session();

        if let Some(current) = session.as_ref() {
            if !*current.stop.borrow() && !current.task.is_finished() {
                warn!("Client {} is already connecting", self.identity);
                return Ok(());
            }
        }
        if let Some(previous) = session.take() {
            // A stopped loop may still be unwinding; it must not race the new one.
            previous.task.abort();
            self.link.take_writer();
        }

        let (stop, stop_rx) = watch::channel(false);
        let supervisor = Supervisor::new(
            self.settings.clone(),
            self.subscriptions.clone(),
            self.link.clone(),
            self.dispatcher.clone(),
        );
        let task = handle.spawn(supervisor.run(stop_rx));
        info!("Client {} started", self.identity);
        *session = Some(Session { stop, task });
        Ok(())
    }

    /// Stops the loop and closes the socket without waiting for either.
    ///
    /// No new connection attempt starts after this returns.
    pub fn disconnect(&self) {
        let running = match self.session().as_ref() {
            Some(current) => !current.stop.send_replace(true),
            None => false,
        };

        if let Some(writer) = self.link.take_writer() {
            let _ = writer.send(WsMessage::Close(None));
        }
        if running {
            info!("Client {} disconnecting", self.identity);
        }
    }

    /// Publishes a reading if connected, otherwise raises an alert.
    ///
    /// See [`OutboundSender::send_reading`].
    pub fn send_reading(&self, current_usage: f64) -> bool {
        self.sender.send_reading(current_usage)
    }

    /// A cloneable handle that only sends readings.
    pub fn sender(&self) -> OutboundSender {
        self.sender.clone()
    }
}

impl Drop for MeterClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
