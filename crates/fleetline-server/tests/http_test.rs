//! Passenger HTTP endpoint over a real socket.

use std::sync::Arc;

use fleetline_core::RoutingOracle;
use fleetline_harness::ScriptedOracle;
use fleetline_proto::{OutboundMessage, Point, ServerPush};
use fleetline_server::{
    Dispatcher, FallbackPolicy, FleetRegistry, SystemEnv, VehicleSession, http::router,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::mpsc::Receiver};

const DEPOT: Point = Point::new(37.7749, -122.4194);
const AIRPORT: Point = Point::new(37.6213, -122.379);

const RIDE: &str =
    "/passenger/request_ride?pickup_lat=37.78&pickup_lon=-122.41&dropoff_lat=37.80&dropoff_lon=-122.27";

async fn serve(fleet: &Arc<FleetRegistry>, oracle: ScriptedOracle, policy: FallbackPolicy) -> String {
    let oracle: Arc<dyn RoutingOracle> = Arc::new(oracle);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(fleet), oracle, SystemEnv::new(), policy));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router(dispatcher)).await.unwrap() });

    format!("http://{addr}")
}

fn add_vehicle(fleet: &FleetRegistry, id: u64, location: Point) -> Receiver<OutboundMessage> {
    let (session, rx) = VehicleSession::new(id, 1_700_000_000);
    session.update_location(location, 1_700_000_100.0);
    fleet.register(Arc::new(session)).unwrap();
    rx
}

#[tokio::test]
async fn banner_is_served() {
    let fleet = Arc::new(FleetRegistry::new());
    let base = serve(&fleet, ScriptedOracle::new(), FallbackPolicy::default()).await;

    let response = reqwest::get(format!("{base}/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn ride_request_returns_matched_vehicle_location() {
    let fleet = Arc::new(FleetRegistry::new());
    let _far = add_vehicle(&fleet, 1, AIRPORT);
    let mut near = add_vehicle(&fleet, 2, DEPOT);
    let oracle = ScriptedOracle::new().with_cost(AIRPORT, 900.0).with_cost(DEPOT, 200.0);
    let base = serve(&fleet, oracle, FallbackPolicy::Reject).await;

    let response = reqwest::get(format!("{base}{RIDE}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "latitude": 37.7749, "longitude": -122.4194 }));

    assert_eq!(
        near.try_recv().unwrap(),
        OutboundMessage::Push(ServerPush::RideRequest {
            pickup: Point::new(37.78, -122.41),
            dropoff: Point::new(37.80, -122.27),
        })
    );
}

#[tokio::test]
async fn empty_fleet_is_service_unavailable() {
    let fleet = Arc::new(FleetRegistry::new());
    let base = serve(&fleet, ScriptedOracle::new(), FallbackPolicy::FirstEligible).await;

    let response = reqwest::get(format!("{base}{RIDE}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "no vehicle available" }));
}

#[tokio::test]
async fn unroutable_fleet_is_service_unavailable_without_fallback() {
    let fleet = Arc::new(FleetRegistry::new());
    let _rx = add_vehicle(&fleet, 1, DEPOT);
    let base = serve(&fleet, ScriptedOracle::new(), FallbackPolicy::Reject).await;

    let response = reqwest::get(format!("{base}{RIDE}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn missing_coordinates_are_bad_request() {
    let fleet = Arc::new(FleetRegistry::new());
    let _rx = add_vehicle(&fleet, 1, DEPOT);
    let oracle = ScriptedOracle::new().with_cost(DEPOT, 10.0);
    let base = serve(&fleet, oracle, FallbackPolicy::Reject).await;

    let missing = reqwest::get(format!("{base}/passenger/request_ride?pickup_lat=1.0")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let garbled = reqwest::get(format!(
        "{base}/passenger/request_ride?pickup_lat=north&pickup_lon=1&dropoff_lat=1&dropoff_lon=1"
    ))
    .await
    .unwrap();
    assert_eq!(garbled.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fleet_listing_shows_sessions_in_registration_order() {
    let fleet = Arc::new(FleetRegistry::new());
    let _a = add_vehicle(&fleet, 7, DEPOT);
    let (unlocated, _b) = VehicleSession::new(3, 1_700_000_050);
    unlocated.append_stop(AIRPORT);
    fleet.register(Arc::new(unlocated)).unwrap();
    let base = serve(&fleet, ScriptedOracle::new(), FallbackPolicy::default()).await;

    let body: Value = reqwest::get(format!("{base}/fleet")).await.unwrap().json().await.unwrap();

    assert_eq!(
        body,
        json!([
            {
                "session_id": 7,
                "connected_at": 1_700_000_000u64,
                "location": { "latitude": 37.7749, "longitude": -122.4194 },
                "location_time": 1_700_000_100.0,
                "route": [],
            },
            {
                "session_id": 3,
                "connected_at": 1_700_000_050u64,
                "location": null,
                "location_time": null,
                "route": [{ "latitude": 37.6213, "longitude": -122.379 }],
            },
        ])
    );
}
