//! The `config` module loads the client's [`Settings`].
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `config/default.{toml,yaml,json}` file (or an explicit file), environment
//! variables prefixed `METERLINK_` with `__` between nesting levels, and the
//! variable names used by earlier deployments (`WEBSOCKET_HOST`,
//! `WEBSOCKET_PORT`, `CA_CERT_PATH`, `CLIENT_ID`, `AUTHENTICATION_TOKEN`).

mod settings;

use std::env;
use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, ClientSettings, Settings, TlsMode, TlsSettings, TlsVersion};

/// Legacy environment variables and the keys they override.
const LEGACY_ENV: [(&str, &str); 5] = [
    ("WEBSOCKET_HOST", "broker.host"),
    ("WEBSOCKET_PORT", "broker.port"),
    ("CA_CERT_PATH", "tls.ca_cert_path"),
    ("CLIENT_ID", "client.client_id"),
    ("AUTHENTICATION_TOKEN", "client.auth_token"),
];

/// Loads settings from `config/default` (if present) and the environment,
/// merged over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load(Config::builder().add_source(File::with_name("config/default").required(false)))
}

/// Like [`load_config`], but reads the given file, which must exist.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    load(Config::builder().add_source(File::from(path.as_ref()).required(true)))
}

fn load(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("METERLINK")
            .prefix_separator("_")
            .separator("__"),
    );
    let builder = LEGACY_ENV
        .iter()
        .try_fold(builder, |builder, (var, key)| {
            builder.set_override_option(*key, env::var(var).ok())
        })?;

    let partial: PartialSettings = builder.build()?.try_deserialize()?;
    Ok(partial.merge(Settings::default()))
}
