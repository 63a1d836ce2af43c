//! The `client` module is the meter's side of the broker connection.
//!
//! [`MeterClient`] is the entry point. It owns a [`ClientIdentity`], starts
//! the reconnecting supervisor on a background task, and publishes readings
//! through the [`OutboundSender`] while the link is up.

pub mod identity;
pub mod meter_client;
pub mod sender;
pub mod state;
pub mod supervisor;

pub use identity::ClientIdentity;
pub use meter_client::MeterClient;
pub use sender::OutboundSender;
pub use state::ConnectionState;
