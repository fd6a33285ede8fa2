//! Passenger-facing HTTP endpoint.
//!
//! ```text
//! GET /                                   service banner
//! GET /passenger/request_ride?pickup_lat=..&pickup_lon=..&dropoff_lat=..&dropoff_lon=..
//!                                         200 {"latitude":..,"longitude":..}
//!                                         503 {"error":".."} when no vehicle is available
//! GET /fleet                              connected vehicles and their routes
//! ```
//!
//! Missing or non-numeric query parameters are rejected by the extractor with
//! 400 before any matching happens.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use fleetline_core::{RoutingOracle, SessionId};
use fleetline_proto::Point;
use serde::{Deserialize, Serialize};

use crate::{
    dispatcher::{DispatchError, Dispatcher},
    system_env::SystemEnv,
};

/// Dispatcher type served over HTTP.
pub type HttpDispatcher = Dispatcher<Arc<dyn RoutingOracle>, SystemEnv>;

/// Ride request query string.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RideQuery {
    /// Pickup latitude
    pub pickup_lat: f64,
    /// Pickup longitude
    pub pickup_lon: f64,
    /// Dropoff latitude
    pub dropoff_lat: f64,
    /// Dropoff longitude
    pub dropoff_lon: f64,
}

/// One entry of the fleet status listing.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleStatus {
    /// Session identifier
    pub session_id: SessionId,
    /// Wall-clock seconds at connect time
    pub connected_at: u64,
    /// Last reported position
    pub location: Option<Point>,
    /// Vehicle timestamp of that position
    pub location_time: Option<f64>,
    /// Outstanding stops in order
    pub route: Vec<Point>,
}

#[derive(Debug, Serialize)]
struct Banner {
    message: &'static str,
}

/// Build the router.
pub fn router(dispatcher: Arc<HttpDispatcher>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/passenger/request_ride", get(request_ride))
        .route("/fleet", get(fleet_status))
        .with_state(dispatcher)
}

#[axum::debug_handler]
async fn banner() -> Json<Banner> {
    Json(Banner { message: "fleetline dispatch server" })
}

#[axum::debug_handler]
async fn request_ride(
    State(dispatcher): State<Arc<HttpDispatcher>>,
    Query(query): Query<RideQuery>,
) -> Result<Json<Point>, DispatchError> {
    let pickup = Point::new(query.pickup_lat, query.pickup_lon);
    let dropoff = Point::new(query.dropoff_lat, query.dropoff_lon);
    tracing::info!("ride requested from {} to {}", pickup, dropoff);

    let assignment = dispatcher.request_ride(pickup, dropoff).await?;
    Ok(Json(assignment.location))
}

#[axum::debug_handler]
async fn fleet_status(State(dispatcher): State<Arc<HttpDispatcher>>) -> Json<Vec<VehicleStatus>> {
    let vehicles = dispatcher
        .fleet()
        .snapshot()
        .iter()
        .map(|session| {
            let state = session.state_snapshot();
            VehicleStatus {
                session_id: session.id(),
                connected_at: session.connected_at(),
                location: state.location(),
                location_time: state.location_time(),
                route: state.route().as_slice().to_vec(),
            }
        })
        .collect();
    Json(vehicles)
}
