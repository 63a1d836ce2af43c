//! The `transport` module opens the WebSocket the supervisor streams over.
//!
//! It knows nothing about frames: `websocket` performs the TCP, TLS and
//! WebSocket handshakes for the configured broker URL, and `tls` builds the
//! rustls connector matching the configured trust mode.

pub mod tls;
pub mod websocket;

pub use websocket::{WsStream, open};

#[cfg(test)]
mod tests;
