//! TLS/SSL infrastructure.

use crate::error::TransportError;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

/// Creates a TLS client configuration with Mozilla's root certificates.
///
/// This configuration:
/// - Uses webpki-roots for trusted root certificates
/// - Uses the ring crypto provider explicitly, so no process default is needed
/// - Does not use client authentication
/// - Offers only `http/1.1` over ALPN
pub fn create_tls_config() -> Result<Arc<rustls::ClientConfig>, rustls::Error> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Creates a connector over [`create_tls_config`].
pub fn create_tls_connector() -> Result<TlsConnector, rustls::Error> {
    Ok(TlsConnector::from(create_tls_config()?))
}

/// Establishes a TLS connection over an existing TCP stream.
pub async fn connect_tls(
    connector: &TlsConnector,
    tcp_stream: TcpStream,
    server_name: &str,
) -> Result<TlsStream<TcpStream>, TransportError> {
    let server_name = ServerName::try_from(server_name.to_string())
        .map_err(|e| TransportError::InvalidUrl(format!("Invalid server name: {}", e)))?;

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(TransportError::Tls)
}
