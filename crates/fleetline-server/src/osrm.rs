//! OSRM-backed routing oracle.
//!
//! Costs a trip with the OSRM `trip` service:
//!
//! ```text
//! GET <base>/trip/v1/driving/<lon,lat;lon,lat;...>?source=first
//! ```
//!
//! The duration of the first returned trip is the cost. The response body
//! decides success, not the HTTP status: OSRM reports failures such as
//! `NoTrips` as JSON with a non-`Ok` `code`. Every failure (connect error,
//! timeout, non-`Ok` code, missing trips, unparseable body) is logged and
//! priced as [`TripCost::INFEASIBLE`].

use std::time::Duration;

use async_trait::async_trait;
use fleetline_core::{MIN_WAYPOINTS, RoutingOracle, TripCost};
use fleetline_proto::Point;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ServerError;

/// Default OSRM base URL.
pub const DEFAULT_OSRM_URL: &str = "http://localhost:5000";

/// Default per-query timeout.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to reach OSRM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    /// Base URL, without a trailing slash (one is tolerated)
    pub base_url: String,
    /// Whole-request timeout for a single trip query
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_OSRM_URL.to_string(), timeout: DEFAULT_ORACLE_TIMEOUT }
    }
}

/// Reasons a trip query produced no cost.
#[derive(Error, Debug)]
enum QueryError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("oracle answered {0:?}")]
    NotOk(String),

    #[error("response contained no trip duration")]
    NoTrips,
}

/// Minimal OSRM trip response.
#[derive(Deserialize)]
struct TripResponse {
    code: String,
    #[serde(default)]
    trips: Vec<Trip>,
}

#[derive(Deserialize)]
struct Trip {
    duration: Option<f64>,
}

/// Routing oracle that queries an OSRM server over HTTP.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmClient {
    /// Build a client. Fails only if the HTTP stack cannot be initialized.
    pub fn new(config: &OracleConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServerError::Config(format!("failed to build OSRM client: {e}")))?;

        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    /// Base URL queries are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Trip service URL for `waypoints`, first waypoint as the fixed source.
    pub fn trip_url(&self, waypoints: &[Point]) -> String {
        let coordinates: Vec<String> = waypoints.iter().map(Point::oracle_coordinate).collect();
        format!("{}/trip/v1/driving/{}?source=first", self.base_url, coordinates.join(";"))
    }

    async fn query(&self, waypoints: &[Point]) -> Result<f64, QueryError> {
        let response: TripResponse =
            self.client.get(self.trip_url(waypoints)).send().await?.json().await?;

        if response.code != "Ok" {
            return Err(QueryError::NotOk(response.code));
        }
        response.trips.first().and_then(|trip| trip.duration).ok_or(QueryError::NoTrips)
    }
}

#[async_trait]
impl RoutingOracle for OsrmClient {
    async fn trip_cost(&self, waypoints: &[Point]) -> TripCost {
        if waypoints.len() < MIN_WAYPOINTS {
            return TripCost::INFEASIBLE;
        }

        match self.query(waypoints).await {
            Ok(seconds) => TripCost::from_seconds(seconds),
            Err(e) => {
                tracing::warn!(waypoints = waypoints.len(), error = %e, "trip cost query failed");
                TripCost::INFEASIBLE
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> OsrmClient {
        OsrmClient::new(&OracleConfig { base_url: base_url.to_string(), ..Default::default() })
            .unwrap()
    }

    #[test]
    fn trip_url_lists_lon_lat_pairs_in_order() {
        let url = client("http://osrm:5000")
            .trip_url(&[Point::new(37.7, -122.4), Point::new(37.8, -122.5)]);

        assert_eq!(url, "http://osrm:5000/trip/v1/driving/-122.4,37.7;-122.5,37.8?source=first");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(client("http://osrm:5000/").base_url(), "http://osrm:5000");
    }

    #[test]
    fn response_without_trips_parses() {
        let response: TripResponse = serde_json::from_str(r#"{"code":"NoTrips"}"#).unwrap();
        assert_eq!(response.code, "NoTrips");
        assert!(response.trips.is_empty());
    }
}
