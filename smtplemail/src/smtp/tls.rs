//! Module dedicated to TLS.
//!
//! This module builds the rustls client configuration shared by the
//! implicit TLS and the STARTTLS modes, and wraps TCP streams into
//! TLS streams.

use std::{net::TcpStream, sync::Arc};

use rustls::{
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider},
    pki_types::{CertificateDer, ServerName, UnixTime},
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
    StreamOwned,
};
use tracing::{debug, warn};

use super::{Cause, SmtpConfig};

pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// Build the TLS client configuration.
///
/// Server certificates are verified against the webpki roots unless
/// verification is disabled in the SMTP configuration.
pub fn build_client_config(config: &SmtpConfig) -> Result<Arc<ClientConfig>, Cause> {
    let provider = Arc::new(ring::default_provider());
    let builder =
        ClientConfig::builder_with_provider(provider.clone()).with_safe_default_protocol_versions()?;

    let tls_config = if config.verify_certificates {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        warn!(host = %config.host, "certificate verification disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification(provider)))
            .with_no_client_auth()
    };

    Ok(Arc::new(tls_config))
}

/// Wrap the given TCP stream into a TLS stream.
///
/// The handshake is completed before returning, so that no SMTP
/// command can be sent before the connection is encrypted.
pub fn handshake(config: &SmtpConfig, mut tcp: TcpStream) -> Result<TlsStream, Cause> {
    let server_name = ServerName::try_from(config.host.clone())
        .map_err(|_| Cause::InvalidServerNameError(config.host.clone()))?;

    let mut conn = ClientConnection::new(build_client_config(config)?, server_name)?;

    while conn.is_handshaking() {
        conn.complete_io(&mut tcp)?;
    }

    debug!(
        version = ?conn.protocol_version(),
        suite = ?conn.negotiated_cipher_suite().map(|suite| suite.suite()),
        "tls handshake completed"
    );

    Ok(StreamOwned::new(conn, tcp))
}

/// Certificate verifier accepting any server certificate.
///
/// Handshake signatures are still checked, so that the peer proves
/// it owns the key of the certificate it sent.
#[derive(Debug)]
struct NoCertificateVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoCertificateVerification {
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
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
