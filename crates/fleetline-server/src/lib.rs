//! Fleetline dispatch server.
//!
//! Production runtime around [`fleetline_core`]: vehicles connect over QUIC
//! and keep one session stream open, passengers request rides over HTTP, and
//! the dispatcher prices vehicles with an OSRM routing oracle.
//!
//! # Components
//!
//! - [`FleetRegistry`]: connected vehicle sessions, in registration order
//! - [`serve_session`]: per-vehicle read loop plus outbound writer
//! - [`handle_message`]: one inbound line to one state change and one reply
//! - [`LivenessPinger`]: periodic `PING` pushes, prunes dead sessions
//! - [`Dispatcher`]: matcher plus `RIDE_REQUEST` delivery
//! - [`OsrmClient`]: [`fleetline_core::RoutingOracle`] over HTTP
//! - [`VehicleEndpoint`]: QUIC endpoint for vehicles
//! - [`http::router`]: passenger endpoint
//! - [`Server`]: binds all of the above and runs until shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod dispatcher;
mod error;
mod handler;
pub mod http;
mod liveness;
mod osrm;
mod registry;
mod session;
mod system_env;
mod transport;

use std::{future::Future, net::SocketAddr, sync::Arc};

pub use connection::{DRAIN_TIMEOUT, serve_session};
pub use dispatcher::{Assignment, DispatchError, Dispatcher, FallbackPolicy};
pub use error::ServerError;
use fleetline_core::RoutingOracle;
pub use handler::{apply, handle_message};
pub use liveness::{DEFAULT_PING_INTERVAL, LivenessConfig, LivenessPinger};
pub use osrm::{DEFAULT_ORACLE_TIMEOUT, DEFAULT_OSRM_URL, OracleConfig, OsrmClient};
pub use registry::{FleetRegistry, RegistryError};
pub use session::{OUTBOUND_QUEUE_CAPACITY, SessionError, VehicleSession};
pub use system_env::SystemEnv;
use tokio::{net::TcpListener, sync::watch, task::JoinSet};
pub use transport::{TlsIdentity, VehicleConnection, VehicleEndpoint};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// QUIC address for vehicles (e.g., "0.0.0.0:4433")
    pub bind_address: String,
    /// TCP address for the passenger HTTP endpoint (e.g., "0.0.0.0:8000")
    pub http_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Maximum concurrently connected vehicles
    pub max_connections: usize,
    /// Routing oracle settings
    pub oracle: OracleConfig,
    /// Keepalive settings
    pub liveness: LivenessConfig,
    /// Behavior when no vehicle has a finite cost
    pub fallback: FallbackPolicy,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4433".to_string(),
            http_address: "0.0.0.0:8000".to_string(),
            cert_path: None,
            key_path: None,
            max_connections: 10_000,
            oracle: OracleConfig::default(),
            liveness: LivenessConfig::default(),
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Production fleetline server.
pub struct Server {
    fleet: Arc<FleetRegistry>,
    dispatcher: Arc<http::HttpDispatcher>,
    transport: VehicleEndpoint,
    http_listener: TcpListener,
    liveness: LivenessConfig,
    env: SystemEnv,
}

impl Server {
    /// Bind the QUIC and HTTP listeners.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let fleet = Arc::new(FleetRegistry::with_max_sessions(config.max_connections));

        let oracle: Arc<dyn RoutingOracle> = Arc::new(OsrmClient::new(&config.oracle)?);
        let dispatcher =
            Arc::new(Dispatcher::new(Arc::clone(&fleet), oracle, env, config.fallback));

        let identity =
            TlsIdentity::from_paths(config.cert_path.as_deref(), config.key_path.as_deref());
        let transport = VehicleEndpoint::bind(&config.bind_address, &identity)?;

        let http_listener = TcpListener::bind(&config.http_address).await.map_err(|e| {
            ServerError::Config(format!("failed to bind HTTP '{}': {e}", config.http_address))
        })?;

        tracing::info!("routing oracle at {}", config.oracle.base_url);

        Ok(Self {
            fleet,
            dispatcher,
            transport,
            http_listener,
            liveness: config.liveness,
            env,
        })
    }

    /// Local QUIC address vehicles connect to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Local HTTP address passengers connect to.
    pub fn http_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.http_listener.local_addr()?)
    }

    /// Run until `shutdown` resolves.
    ///
    /// On shutdown the endpoint stops accepting, every vehicle session is
    /// cancelled, and the pinger and HTTP server drain before this returns.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let Self { fleet, dispatcher, transport, http_listener, liveness, env } = self;
        tracing::info!("Server starting on {}", transport.local_addr()?);

        let (stop_tx, stop_rx) = watch::channel(false);

        let pinger = LivenessPinger::new(Arc::clone(&fleet), env, liveness);
        let pinger_task = tokio::spawn(pinger.run(stop_rx.clone()));

        let http_task = {
            let mut stop = stop_rx.clone();
            let app = http::router(dispatcher);
            tokio::spawn(async move {
                axum::serve(http_listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = stop.changed().await;
                    })
                    .await
            })
        };

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = transport.accept() => match accepted {
                    Ok(Some(conn)) => {
                        let fleet = Arc::clone(&fleet);
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(conn, fleet, env).await {
                                tracing::debug!("Connection error: {}", e);
                            }
                        });
                    },
                    Ok(None) => {
                        tracing::warn!("QUIC endpoint closed");
                        break;
                    },
                    Err(e) => tracing::warn!("Accept error: {}", e),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        tracing::error!("Connection task panicked: {}", e);
                    }
                },
            }
        }

        tracing::info!("Server shutting down, {} vehicles connected", fleet.len());
        let _ = stop_tx.send(true);
        transport.close();
        connections.shutdown().await;

        if let Err(e) = pinger_task.await {
            tracing::error!("Liveness task failed: {}", e);
        }
        match http_task.await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => return Err(ServerError::Transport(format!("HTTP server failed: {e}"))),
            Err(e) => return Err(ServerError::Internal(format!("HTTP task failed: {e}"))),
        }

        Ok(())
    }
}

/// Serve the session stream of a single QUIC connection.
async fn handle_connection(
    conn: VehicleConnection,
    fleet: Arc<FleetRegistry>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let remote = conn.remote_addr();
    let (send, recv) = conn.session_stream().await?;
    tracing::debug!("Session stream opened from {}", remote);

    // Closing the connection discards stream data the vehicle has not
    // acknowledged, so wait for the finished stream to be delivered first.
    let delivered = send.stopped();
    let result = serve_session(recv, send, fleet, env).await;
    if tokio::time::timeout(DRAIN_TIMEOUT, delivered).await.is_err() {
        tracing::debug!("Vehicle at {} did not acknowledge final replies", remote);
    }
    conn.finish("session closed");
    result
}
