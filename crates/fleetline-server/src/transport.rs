//! QUIC endpoint vehicles connect to.
//!
//! Each vehicle opens one QUIC connection and one bidirectional stream on it;
//! that stream carries the newline-delimited JSON session. QUIC gives the
//! session TLS 1.3 and survives the vehicle changing networks (connection
//! migration), which a moving vehicle does constantly.
//!
//! ALPN is `fleetline`. Deployments pass a PEM certificate chain and key;
//! without them a throwaway self-signed certificate for `localhost` is used.

use std::{net::SocketAddr, path::Path, sync::Arc};

use fleetline_proto::ALPN_PROTOCOL;
use quinn::{Endpoint, RecvStream, SendStream, VarInt};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

use crate::error::ServerError;

/// Where the endpoint's TLS certificate comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsIdentity {
    /// Certificate chain and private key in PEM files
    Pem {
        /// Certificate chain path
        cert: String,
        /// Private key path
        key: String,
    },
    /// Fresh self-signed certificate, local testing only
    SelfSigned,
}

impl TlsIdentity {
    /// PEM identity when both paths are given, self-signed otherwise.
    pub fn from_paths(cert: Option<&str>, key: Option<&str>) -> Self {
        match (cert, key) {
            (Some(cert), Some(key)) => Self::Pem { cert: cert.to_string(), key: key.to_string() },
            _ => Self::SelfSigned,
        }
    }

    fn load(&self) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ServerError> {
        match self {
            Self::Pem { cert, key } => Ok((read_cert_chain(cert)?, read_private_key(key)?)),
            Self::SelfSigned => {
                let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
                    .map_err(|e| ServerError::Config(format!("self-signed certificate: {e}")))?;
                tracing::warn!("vehicle endpoint uses a self-signed certificate");

                let key = PrivatePkcs8KeyDer::from(generated.key_pair.serialize_der());
                Ok((vec![generated.cert.der().clone()], key.into()))
            },
        }
    }
}

/// Listening QUIC endpoint for vehicle sessions.
pub struct VehicleEndpoint {
    endpoint: Endpoint,
}

impl VehicleEndpoint {
    /// Bind to `address` with the given TLS identity.
    pub fn bind(address: &str, identity: &TlsIdentity) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("bad vehicle bind address {address:?}: {e}")))?;

        let (chain, key) = identity.load()?;
        let mut tls = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .map_err(|e| ServerError::Config(format!("certificate rejected: {e}")))?;
        tls.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

        let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(tls)
            .map_err(|e| ServerError::Config(format!("TLS config unusable for QUIC: {e}")))?;
        let endpoint = Endpoint::server(quinn::ServerConfig::with_crypto(Arc::new(crypto)), addr)
            .map_err(|e| ServerError::Transport(format!("cannot listen on {addr}: {e}")))?;

        tracing::info!("vehicle endpoint listening on {}", addr);
        Ok(Self { endpoint })
    }

    /// Wait for the next vehicle to complete its handshake.
    ///
    /// `Ok(None)` means the endpoint was closed. A failed handshake is an
    /// error for that peer only; keep accepting after it.
    pub async fn accept(&self) -> Result<Option<VehicleConnection>, ServerError> {
        let Some(incoming) = self.endpoint.accept().await else {
            return Ok(None);
        };
        let connection = incoming
            .await
            .map_err(|e| ServerError::Transport(format!("vehicle handshake failed: {e}")))?;

        Ok(Some(VehicleConnection { connection }))
    }

    /// Bound address, with the real port when bound to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.endpoint.local_addr()?)
    }

    /// Refuse new vehicles and close every open connection.
    pub fn close(&self) {
        self.endpoint.close(VarInt::from_u32(0), b"server shutting down");
    }
}

/// One vehicle's QUIC connection.
pub struct VehicleConnection {
    connection: quinn::Connection,
}

impl VehicleConnection {
    /// Wait for the vehicle to open its session stream.
    ///
    /// The stream becomes visible once the vehicle writes its first message.
    pub async fn session_stream(&self) -> Result<(SendStream, RecvStream), ServerError> {
        self.connection
            .accept_bi()
            .await
            .map_err(|e| ServerError::Transport(format!("no session stream: {e}")))
    }

    /// Vehicle's current address. Changes if the vehicle migrates.
    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Close with application code 0.
    pub fn finish(&self, reason: &str) {
        self.connection.close(VarInt::from_u32(0), reason.as_bytes());
    }
}

fn read_cert_chain(path: &str) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let pem = read_pem(path)?;
    let chain = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Config(format!("bad certificate in {path}: {e}")))?;

    if chain.is_empty() {
        return Err(ServerError::Config(format!("no certificate in {path}")));
    }
    Ok(chain)
}

fn read_private_key(path: &str) -> Result<PrivateKeyDer<'static>, ServerError> {
    let pem = read_pem(path)?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|e| ServerError::Config(format!("bad private key in {path}: {e}")))?
        .ok_or_else(|| ServerError::Config(format!("no private key in {path}")))
}

fn read_pem(path: &str) -> Result<Vec<u8>, ServerError> {
    std::fs::read(Path::new(path)).map_err(|e| ServerError::Config(format!("cannot read {path}: {e}")))
}
