//! Error types shared by the `meterlink` modules.
//!
//! Transport failures never escape the supervisor loop; they are logged and
//! turned into a reconnect. The variants exist so that the places that *can*
//! fail (opening a socket, building a TLS configuration, starting the client)
//! report a precise cause. Settings loading reports `config::ConfigError`
//! and frame decoding reports [`FrameError`](crate::protocol::FrameError).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("cannot read CA certificate {path}: {source}")]
    CaCertificate {
        path: PathBuf,
        #[source]
        source: rustls::pki_types::pem::Error,
    },

    #[error("CA certificate file {0} holds no usable certificate")]
    NoCertificates(PathBuf),

    #[error("TLS mode `verified` requires tls.ca_cert_path")]
    MissingCaCertificate,

    #[error("no tokio runtime to run the connection on: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
