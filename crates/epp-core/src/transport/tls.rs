//! TLS session setup for the registry connection
//!
//! The client always presents its certificate. Registry verification is
//! opt-in: without `verify_peer` any server certificate is accepted, but
//! handshake signatures are still checked against it.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, info};

use super::FramedStream;
use crate::config::{EppConfig, TlsSettings, TlsVersion};

/// Open a TCP connection, complete the TLS handshake and wrap the result
/// in EPP framing
pub async fn connect_tls(
    config: &EppConfig,
) -> Result<FramedStream<TlsStream<TcpStream>>, crate::Error> {
    let client_config = build_client_config(&config.tls).await?;
    let io_timeout = config.timeout();

    info!(
        "Connecting to {}:{} (TLS {:?}, verify_peer={})",
        config.host, config.port, config.tls.version, config.tls.verify_peer
    );

    let tcp = timeout(
        io_timeout,
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await
    .map_err(|_| crate::Error::transport(format!("Connect timed out after {:?}", io_timeout)))?
    .map_err(|e| {
        crate::Error::transport(format!(
            "Failed to connect to {}:{}: {}",
            config.host, config.port, e
        ))
    })?;

    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|e| crate::Error::tls(format!("Invalid server name '{}': {}", config.host, e)))?;

    let connector = TlsConnector::from(client_config);
    let stream = timeout(io_timeout, connector.connect(server_name, tcp))
        .await
        .map_err(|_| crate::Error::transport("TLS handshake timed out"))?
        .map_err(|e| crate::Error::tls(format!("TLS handshake failed: {}", e)))?;

    debug!("TLS session established with {}", config.host);
    Ok(FramedStream::new(stream, io_timeout))
}

/// Build the rustls client configuration from the TLS settings
pub async fn build_client_config(
    settings: &TlsSettings,
) -> Result<Arc<ClientConfig>, crate::Error> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let version = match settings.version {
        TlsVersion::Tls12 => &rustls::version::TLS12,
        TlsVersion::Tls13 => &rustls::version::TLS13,
    };

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&[version])
        .map_err(|e| crate::Error::tls(format!("Unsupported protocol version: {}", e)))?;

    let builder = if settings.verify_peer {
        let ca_path = settings
            .ca_path
            .as_deref()
            .ok_or_else(|| crate::Error::config("Peer verification requires a CA bundle"))?;

        let mut roots = RootCertStore::empty();
        for cert in parse_certificates(&read_pem(ca_path).await?)? {
            roots
                .add(cert)
                .map_err(|e| crate::Error::tls(format!("Failed to add CA certificate: {}", e)))?;
        }
        builder.with_root_certificates(roots)
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
    };

    let certs = parse_certificates(&read_pem(&settings.cert_path).await?)?;
    if certs.is_empty() {
        return Err(crate::Error::tls(format!(
            "No certificates found in {}",
            settings.cert_path.display()
        )));
    }
    let key = PrivateKeyDer::from_pem_slice(&read_pem(&settings.key_path).await?)
        .map_err(|e| crate::Error::tls(format!("Failed to parse private key: {}", e)))?;

    let config = builder
        .with_client_auth_cert(certs, key)
        .map_err(|e| crate::Error::tls(format!("Client certificate rejected: {}", e)))?;

    Ok(Arc::new(config))
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, crate::Error> {
    tokio::fs::read(path)
        .await
        .map_err(|e| crate::Error::config(format!("Failed to read {}: {}", path.display(), e)))
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, crate::Error> {
    CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| crate::Error::tls(format!("Failed to parse certificates: {}", e)))
}

/// Accepts any registry certificate while still checking handshake
/// signatures
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
