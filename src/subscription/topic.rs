use crate::client::ClientIdentity;
use crate::protocol::encode_subscribe;

/// Alert channel shared by every meter.
pub const BROADCAST_ALERTS: &str = "/notification/alert";

/// Destination meter readings are published to.
pub const METER_READING: &str = "/app/meterReading";

/// Alert channel scoped to one meter.
pub fn client_alerts(identity: &ClientIdentity) -> String {
    format!("{BROADCAST_ALERTS}/{identity}")
}

/// Channel on which the broker answers a meter's readings.
pub fn reading_results(identity: &ClientIdentity) -> String {
    format!("/notification/readingResult/{identity}")
}

/// A subscription id paired with the destination it listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDescriptor {
    pub id: String,
    pub destination: String,
}

impl SubscriptionDescriptor {
    /// The SUBSCRIBE frame for this descriptor.
    pub fn frame(&self) -> String {
        encode_subscribe(&self.id, &self.destination)
    }
}

/// The fixed, ordered list of subscriptions issued after every CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSet {
    descriptors: Vec<SubscriptionDescriptor>,
}

impl SubscriptionSet {
    /// Builds the set for `identity`.
    ///
    /// Ids are assigned by position (`sub-0`, `sub-1`, ...). Order: broadcast
    /// alerts, the client alert channel when `per_client_alerts` is set, then
    /// reading results.
    pub fn for_client(identity: &ClientIdentity, per_client_alerts: bool) -> Self {
        let mut destinations = vec![BROADCAST_ALERTS.to_string()];
        if per_client_alerts {
            destinations.push(client_alerts(identity));
        }
        destinations.push(reading_results(identity));

        let descriptors = destinations
            .into_iter()
            .enumerate()
            .map(|(index, destination)| SubscriptionDescriptor {
                id: format!("sub-{index}"),
                destination,
            })
            .collect();
        Self { descriptors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubscriptionDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// SUBSCRIBE frames in issue order.
    pub fn frames(&self) -> Vec<String> {
        self.iter().map(SubscriptionDescriptor::frame).collect()
    }
}
