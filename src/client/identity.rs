use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::ClientSettings;

/// Opaque token naming this meter to the broker.
///
/// Fixed for the lifetime of a [`MeterClient`](crate::client::MeterClient);
/// cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(Arc<str>);

impl ClientIdentity {
    /// A fresh random identity (UUID v4).
    pub fn generate() -> Self {
        Self::from(Uuid::new_v4().to_string())
    }

    /// The configured identity, or a generated one when none is set.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        settings
            .client_id
            .as_deref()
            .map_or_else(Self::generate, Self::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientIdentity {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for ClientIdentity {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
