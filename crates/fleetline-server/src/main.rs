//! `fleetline-server`: vehicle sessions over QUIC, ride requests over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Local development: self-signed certificate, OSRM on localhost
//! fleetline-server --bind 0.0.0.0:4433 --http-bind 0.0.0.0:8000
//!
//! # Deployed: real certificate, OSRM elsewhere
//! fleetline-server --cert cert.pem --key key.pem --osrm-url http://osrm:5000
//! ```

use std::time::Duration;

use clap::Parser;
use fleetline_server::{
    FallbackPolicy, LivenessConfig, OracleConfig, Server, ServerRuntimeConfig,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Command line for the dispatch server
#[derive(Parser, Debug)]
#[command(name = "fleetline-server", version)]
#[command(about = "Ride dispatch server for connected vehicles")]
struct Args {
    /// QUIC listen address for vehicle sessions
    #[arg(short, long, default_value = "0.0.0.0:4433")]
    bind: String,

    /// Listen address of the passenger HTTP API
    #[arg(long, default_value = "0.0.0.0:8000")]
    http_bind: String,

    /// PEM certificate chain for the vehicle endpoint
    #[arg(short, long, requires = "key")]
    cert: Option<String>,

    /// PEM private key matching `--cert`
    #[arg(short, long, requires = "cert")]
    key: Option<String>,

    /// Where the OSRM trip service lives
    #[arg(long, default_value = "http://localhost:5000", env = "OSRM_URL")]
    osrm_url: String,

    /// Per-query OSRM deadline in milliseconds
    #[arg(long, default_value = "5000")]
    osrm_timeout_ms: u64,

    /// Keepalive period in seconds, must be nonzero
    #[arg(long, default_value = "5")]
    ping_interval_secs: u64,

    /// Vehicle sessions accepted at once
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Answer 503 when every route is infeasible rather than falling back to
    /// the first located vehicle
    #[arg(long)]
    no_fallback: bool,

    /// Filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<ServerRuntimeConfig, String> {
        if self.ping_interval_secs == 0 {
            return Err("--ping-interval-secs must be greater than zero".to_string());
        }

        let fallback =
            if self.no_fallback { FallbackPolicy::Reject } else { FallbackPolicy::FirstEligible };

        Ok(ServerRuntimeConfig {
            bind_address: self.bind,
            http_address: self.http_bind,
            cert_path: self.cert,
            key_path: self.key,
            max_connections: self.max_connections,
            oracle: OracleConfig {
                base_url: self.osrm_url,
                timeout: Duration::from_millis(self.osrm_timeout_ms),
            },
            liveness: LivenessConfig { interval: Duration::from_secs(self.ping_interval_secs) },
            fallback,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = args.into_config()?;
    let server = Server::bind(config).await?;

    tracing::info!(
        quic = %server.local_addr()?,
        http = %server.http_addr()?,
        "fleetline dispatching"
    );

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("cannot install ctrl-c handler: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("fleetline stopped");
    Ok(())
}
