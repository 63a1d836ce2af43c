use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps a `--log-level` value to a tracing level. `warning` is accepted as an
/// alias of `warn`; anything unknown is `None`.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => other.parse().ok(),
    }
}

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies, falling back
/// to `info`. Returns false when a subscriber was already installed.
pub fn init(default_level: &str) -> bool {
    let level = parse_level(default_level).unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
