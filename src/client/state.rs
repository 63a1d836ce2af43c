use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tungstenite::protocol::Message as WsMessage;

/// Lifecycle of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Sending side of the writer task owning the socket's write half.
pub(crate) type Writer = mpsc::UnboundedSender<WsMessage>;

/// What the supervisor publishes and the sender observes.
///
/// Only the supervisor writes `state` and installs `writer`; everyone else
/// reads them.
#[derive(Debug)]
pub(crate) struct Link {
    pub state: watch::Sender<ConnectionState>,
    writer: Mutex<Option<Writer>>,
}

impl Link {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(ConnectionState::Disconnected),
            writer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn writer_slot(&self) -> MutexGuard<'_, Option<Writer>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn install_writer(&self, writer: Writer) {
        *self.writer_slot() = Some(writer);
    }

    pub fn take_writer(&self) -> Option<Writer> {
        self.writer_slot().take()
    }

    /// The writer, if the link is `Connected` and the socket still open.
    pub fn live_writer(&self) -> Option<Writer> {
        if self.state() != ConnectionState::Connected {
            return None;
        }
        self.writer_slot()
            .as_ref()
            .filter(|writer| !writer.is_closed())
            .cloned()
    }
}
