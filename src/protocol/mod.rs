//! The `protocol` module is the frame codec for the STOMP-style text
//! protocol spoken with the broker.
//!
//! It is pure: nothing here touches a socket. `frame` knows how to build and
//! strictly parse frames, `payload` knows how to pull the JSON document out of
//! an inbound text message, either from a parsed frame body or with the
//! permissive substring scan some brokers require.

pub mod frame;
pub mod payload;

pub use frame::{
    Command, Frame, FrameError, HEARTBEAT, encode_connect, encode_send, encode_subscribe,
};
pub use payload::{FramingMode, Inbound, extract_json, inbound_payload};
