use super::tls::{connector, insecure_config, verified_config};
use crate::config::{Settings, TlsMode, TlsSettings, TlsVersion};
use crate::utils::error::ClientError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio_tungstenite::Connector;

fn tls(mode: TlsMode, ca_cert_path: Option<PathBuf>) -> TlsSettings {
    TlsSettings {
        mode,
        ca_cert_path,
        version: TlsVersion::Tls12,
    }
}

#[test]
fn test_plain_mode_uses_plain_connector() {
    assert!(matches!(
        connector(&tls(TlsMode::None, None)),
        Ok(Connector::Plain)
    ));
}

#[test]
fn test_insecure_mode_builds_rustls_connector() {
    assert!(insecure_config().is_ok());
    assert!(matches!(
        connector(&tls(TlsMode::Insecure, None)),
        Ok(Connector::Rustls(_))
    ));
}

#[test]
fn test_verified_mode_requires_ca_path() {
    match connector(&tls(TlsMode::Verified, None)) {
        Err(ClientError::MissingCaCertificate) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn test_verified_mode_reports_unreadable_ca() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.pem");
    match verified_config(&missing, TlsVersion::Tls13) {
        Err(ClientError::CaCertificate { path, .. }) => assert_eq!(path, missing),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[test]
fn test_verified_mode_rejects_file_without_certificates() {
    let tmp = TempDir::new().unwrap();
    let empty = tmp.path().join("empty.pem");
    fs::write(&empty, "not a certificate\n").unwrap();
    match verified_config(&empty, TlsVersion::Tls12) {
        Err(ClientError::NoCertificates(path)) => assert_eq!(path, empty),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_open_fails_without_listener() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut settings = Settings::default();
    settings.tls.mode = TlsMode::None;
    settings.broker.port = port;

    match super::open(&settings).await {
        Err(ClientError::Transport(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("connected to a closed port"),
    }
}
