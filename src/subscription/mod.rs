//! The `subscription` module derives the destinations a meter listens on.
//!
//! The set depends only on the client identity and on whether the broker
//! offers a per-client alert channel, so it is rebuilt identically for every
//! connection epoch.

pub mod topic;

pub use topic::{
    BROADCAST_ALERTS, METER_READING, SubscriptionDescriptor, SubscriptionSet, client_alerts,
    reading_results,
};
