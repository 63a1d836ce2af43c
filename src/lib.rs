//! # meterlink
//!
//! `meterlink` keeps a smart meter connected to a message broker. It speaks a
//! STOMP-style text protocol over a WebSocket, subscribes to the meter's alert
//! and reading-result channels, publishes readings, and reconnects on its own
//! whenever the connection drops.
//!
//! ## Core Modules
//!
//! - `client`: the `MeterClient` handle, its reconnecting supervisor and the outbound sender.
//! - `config`: loads `Settings` from files and the environment.
//! - `dispatch`: classifies inbound payloads into reading and alert events.
//! - `protocol`: encodes and parses frames, extracts JSON payloads.
//! - `subscription`: derives the destinations a meter subscribes to.
//! - `transport`: opens the WebSocket, plain or over TLS.
//! - `utils`: error type and logging setup.
//!
//! ```no_run
//! use meterlink::client::MeterClient;
//! use meterlink::config::load_config;
//! use meterlink::dispatch::ClientEvent;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, mut events) = MeterClient::new(load_config()?);
//! client.connect()?;
//! while let Some(event) = events.recv().await {
//!     if event == ClientEvent::Connected {
//!         client.send_reading(1.75);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod subscription;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;
