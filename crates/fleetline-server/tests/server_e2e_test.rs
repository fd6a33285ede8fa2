//! End-to-end: a QUIC vehicle, the HTTP ride endpoint and a stub OSRM.
//!
//! Runs the real `Server` on loopback ports and drives it the way a deployed
//! vehicle and passenger would.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, http::header};
use fleetline_proto::{ALPN_PROTOCOL, OutboundMessage, Point, Reply, ServerPush};
use fleetline_server::{OracleConfig, Server, ServerRuntimeConfig};
use quinn::{ClientConfig, Endpoint, RecvStream, SendStream};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::TcpListener,
    sync::oneshot,
    time::timeout,
};

const OSRM_REPLY: &str = r#"{"code":"Ok","trips":[{"duration":90.0}]}"#;

async fn start_osrm_stub() -> String {
    let app = Router::new()
        .fallback(|| async { ([(header::CONTENT_TYPE, "application/json")], OSRM_REPLY) });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

struct Running {
    quic: SocketAddr,
    http: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<Result<(), fleetline_server::ServerError>>,
}

async fn start_server(osrm: String) -> Running {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        http_address: "127.0.0.1:0".to_string(),
        oracle: OracleConfig { base_url: osrm, ..Default::default() },
        ..Default::default()
    };
    let server = Server::bind(config).await.unwrap();
    let quic = server.local_addr().unwrap();
    let http = server.http_addr().unwrap();

    let (shutdown, signal) = oneshot::channel();
    let task = tokio::spawn(server.run(async move {
        let _ = signal.await;
    }));

    Running { quic, http, shutdown, task }
}

struct Vehicle {
    _endpoint: Endpoint,
    send: SendStream,
    lines: Lines<BufReader<RecvStream>>,
}

impl Vehicle {
    async fn connect(addr: SocketAddr) -> Self {
        let mut endpoint = Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
        endpoint.set_default_client_config(insecure_client_config());

        let connection = endpoint.connect(addr, "localhost").unwrap().await.unwrap();
        let (send, recv) = connection.open_bi().await.unwrap();

        Self { _endpoint: endpoint, send, lines: BufReader::new(recv).lines() }
    }

    async fn send(&mut self, line: &str) {
        self.send.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    /// Next non-keepalive message.
    async fn recv(&mut self) -> OutboundMessage {
        loop {
            let line = timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .expect("timed out waiting for server")
                .unwrap()
                .expect("server closed the stream");
            match OutboundMessage::decode(&line).unwrap() {
                OutboundMessage::Push(ServerPush::Ping) => {},
                message => return message,
            }
        }
    }
}

#[tokio::test]
async fn vehicle_gets_ride_requested_over_http() {
    let server = start_server(start_osrm_stub().await).await;
    let mut vehicle = Vehicle::connect(server.quic).await;

    // The stream only reaches the server once it carries data.
    vehicle.send(r#"{"type":"LOC_PING","location":[37.7749,-122.4194],"loc_time":1700000000}"#).await;
    assert_eq!(vehicle.recv().await, OutboundMessage::Reply(Reply::LocationPingReceived));

    let response = reqwest::get(format!(
        "http://{}/passenger/request_ride?pickup_lat=37.78&pickup_lon=-122.41&dropoff_lat=37.8&dropoff_lon=-122.27",
        server.http
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let matched: Point = response.json().await.unwrap();
    assert_eq!(matched, Point::new(37.7749, -122.4194));

    assert_eq!(
        vehicle.recv().await,
        OutboundMessage::Push(ServerPush::RideRequest {
            pickup: Point::new(37.78, -122.41),
            dropoff: Point::new(37.8, -122.27),
        })
    );

    vehicle.send(r#"{"type":"STOP_RECVD","location":[37.78,-122.41]}"#).await;
    assert_eq!(vehicle.recv().await, OutboundMessage::Reply(Reply::StopReceived));
    vehicle.send(r#"{"type":"GET_NEXT"}"#).await;
    assert_eq!(
        vehicle.recv().await,
        OutboundMessage::Reply(Reply::NextStop(Some(Point::new(37.78, -122.41))))
    );

    server.shutdown.send(()).unwrap();
    timeout(Duration::from_secs(10), server.task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn server_stops_on_shutdown_signal() {
    let server = start_server(start_osrm_stub().await).await;

    server.shutdown.send(()).unwrap();

    timeout(Duration::from_secs(10), server.task).await.unwrap().unwrap().unwrap();
}

fn insecure_client_config() -> ClientConfig {
    let mut crypto = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    ClientConfig::new(Arc::new(quinn::crypto::rustls::QuicClientConfig::try_from(crypto).unwrap()))
}

/// Accepts the server's self-signed certificate.
#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
        ]
    }
}
