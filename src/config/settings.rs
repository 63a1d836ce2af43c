use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::protocol::FramingMode;

/// Top-level configuration of the meter client.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub tls: TlsSettings,
    pub client: ClientSettings,
}

/// Where the broker's WebSocket endpoint lives.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Transport security of the broker connection.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TlsSettings {
    pub mode: TlsMode,
    pub ca_cert_path: Option<PathBuf>,
    pub version: TlsVersion,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain `ws://`.
    None,
    /// `wss://` accepting any server certificate.
    Insecure,
    /// `wss://` verified against `ca_cert_path`, pinned to `version`.
    Verified,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

/// Identity and protocol-variant switches of this meter.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientSettings {
    /// Generated at start-up when unset.
    pub client_id: Option<String>,
    /// Sent as the `authToken` header of every reading when set.
    pub auth_token: Option<String>,
    pub per_client_alerts: bool,
    pub client_id_header: bool,
    pub client_id_in_body: bool,
    pub reconnect_delay_ms: u64,
    pub event_buffer: usize,
    pub framing: FramingMode,
}

impl Settings {
    /// WebSocket URL of the broker, scheme chosen by the TLS mode.
    pub fn url(&self) -> String {
        let scheme = match self.tls.mode {
            TlsMode::None => "ws",
            TlsMode::Insecure | TlsMode::Verified => "wss",
        };
        format!(
            "{scheme}://{}:{}{}",
            self.broker.host, self.broker.port, self.broker.path
        )
    }
}

impl ClientSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                host: "127.0.0.1".to_string(),
                port: 8443,
                path: "/ws".to_string(),
            },
            tls: TlsSettings {
                mode: TlsMode::Insecure,
                ca_cert_path: None,
                version: TlsVersion::Tls12,
            },
            client: ClientSettings {
                client_id: None,
                auth_token: None,
                per_client_alerts: true,
                client_id_header: true,
                client_id_in_body: false,
                reconnect_delay_ms: 5_000,
                event_buffer: 64,
                framing: FramingMode::Auto,
            },
        }
    }
}

/// Settings as read from files and the environment, every field optional.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub tls: Option<PartialTlsSettings>,
    pub client: Option<PartialClientSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialTlsSettings {
    pub mode: Option<TlsMode>,
    pub ca_cert_path: Option<PathBuf>,
    pub version: Option<TlsVersion>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialClientSettings {
    pub client_id: Option<String>,
    pub auth_token: Option<String>,
    pub per_client_alerts: Option<bool>,
    pub client_id_header: Option<bool>,
    pub client_id_in_body: Option<bool>,
    pub reconnect_delay_ms: Option<u64>,
    pub event_buffer: Option<usize>,
    pub framing: Option<FramingMode>,
}

impl PartialSettings {
    /// Fills every missing value from `default`.
    ///
    /// When no TLS mode is given it is `verified` if a CA certificate is
    /// configured and the default otherwise.
    pub fn merge(self, default: Settings) -> Settings {
        let broker = self.broker.unwrap_or_default();
        let tls = self.tls.unwrap_or_default();
        let client = self.client.unwrap_or_default();

        let ca_cert_path = tls.ca_cert_path.or(default.tls.ca_cert_path);
        let mode = tls.mode.unwrap_or(if ca_cert_path.is_some() {
            TlsMode::Verified
        } else {
            default.tls.mode
        });

        Settings {
            broker: BrokerSettings {
                host: broker.host.unwrap_or(default.broker.host),
                port: broker.port.unwrap_or(default.broker.port),
                path: broker.path.unwrap_or(default.broker.path),
            },
            tls: TlsSettings {
                mode,
                ca_cert_path,
                version: tls.version.unwrap_or(default.tls.version),
            },
            client: ClientSettings {
                client_id: client
                    .client_id
                    .filter(|id| !id.is_empty())
                    .or(default.client.client_id),
                auth_token: client
                    .auth_token
                    .filter(|token| !token.is_empty())
                    .or(default.client.auth_token),
                per_client_alerts: client
                    .per_client_alerts
                    .unwrap_or(default.client.per_client_alerts),
                client_id_header: client
                    .client_id_header
                    .unwrap_or(default.client.client_id_header),
                client_id_in_body: client
                    .client_id_in_body
                    .unwrap_or(default.client.client_id_in_body),
                reconnect_delay_ms: client
                    .reconnect_delay_ms
                    .unwrap_or(default.client.reconnect_delay_ms),
                event_buffer: client
                    .event_buffer
                    .filter(|n| *n > 0)
                    .unwrap_or(default.client.event_buffer),
                framing: client.framing.unwrap_or(default.client.framing),
            },
        }
    }
}
