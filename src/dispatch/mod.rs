//! The `dispatch` module turns inbound payloads into consumer events.
//!
//! `event` defines what the consumer receives; `dispatcher` classifies each
//! decoded JSON payload and forwards it, in arrival order, over the event
//! channel. Nothing here can fail the connection: malformed or unknown
//! payloads are logged and dropped.

pub mod dispatcher;
pub mod event;

pub use dispatcher::{Classified, Dispatcher, classify};
pub use event::{AlertEvent, ClientEvent, ReadingEvent};
