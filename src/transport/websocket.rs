use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::debug;

use crate::config::Settings;
use crate::transport::tls;
use crate::utils::error::Result;

/// A connected broker socket, TLS or plain.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a WebSocket to the broker described by `settings`.
///
/// Fails on TLS configuration problems as well as on connection or
/// handshake errors; the caller decides whether to retry.
pub async fn open(settings: &Settings) -> Result<WsStream> {
    let url = settings.url();
    let connector = tls::connector(&settings.tls)?;
    let (stream, response) =
        connect_async_tls_with_config(url.as_str(), None, true, Some(connector)).await?;
    debug!("WebSocket handshake with {url} answered {}", response.status());
    Ok(stream)
}
