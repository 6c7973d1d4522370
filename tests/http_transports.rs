//! HTTP transports against a local stub of the routing backend.
//!
//! The stub speaks just enough of `osrm-routed` and the yard gateway to
//! check what goes over the wire and how replies are classified.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;

use fixtures::*;
use yard_routing::osrm::{GatewayTransport, OsrmHttpTransport, RouteTransport, TransportError};
use yard_routing::{RouteOptions, Router, RouterConfig, RoutingError, Waypoint};

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Option<Value>,
}

struct Stub {
    reply: Mutex<(StatusCode, String)>,
    seen: Mutex<Vec<Seen>>,
}

impl Stub {
    fn replying(status: StatusCode, body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new((status, body.into())),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }
}

async fn osrm_route(
    State(stub): State<Arc<Stub>>,
    Path((profile, coordinates)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> (StatusCode, String) {
    stub.seen.lock().push(Seen {
        path: format!("{profile}/{coordinates}"),
        query,
        authorization: None,
        body: None,
    });
    stub.reply.lock().clone()
}

async fn gateway_route(State(stub): State<Arc<Stub>>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, String) {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    stub.seen.lock().push(Seen {
        path: "gateway".to_string(),
        query: None,
        authorization,
        body: Some(body),
    });
    stub.reply.lock().clone()
}

/// Serve the stub on an ephemeral port and return its base URL.
async fn serve(stub: Arc<Stub>) -> String {
    let app = axum::Router::new()
        .route("/route/v1/{profile}/{coordinates}", get(osrm_route))
        .route("/routing/calculate-route", post(gateway_route))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

fn gate_to_dock() -> Vec<Waypoint> {
    vec![
        Waypoint::named(ENTRANCE.coordinate(), ENTRANCE.name),
        Waypoint::named(KEASBY_DOCK.coordinate(), KEASBY_DOCK.name),
    ]
}

fn osrm_router(base_url: &str) -> Router {
    let config = RouterConfig {
        service_url: base_url.to_string(),
        ..RouterConfig::default()
    };
    let transport = config.osrm_transport().unwrap();
    Router::new(config, Arc::new(transport))
}

#[tokio::test]
async fn osrm_request_carries_coordinates_and_flags() {
    init_tracing();
    let points = [ENTRANCE.coordinate(), KEASBY_DOCK.coordinate()];
    let stub = Stub::replying(StatusCode::OK, direct_response("Smith Street", &points).to_string());
    let base_url = serve(Arc::clone(&stub)).await;

    let router = osrm_router(&base_url);
    let routes = router.compute_route(&gate_to_dock(), RouteOptions::default()).await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].name, "Smith Street");
    assert_eq!(routes[0].waypoints[1].name, KEASBY_DOCK.name);

    let seen = stub.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].path,
        format!(
            "driving/{},{};{},{}",
            ENTRANCE.lng, ENTRANCE.lat, KEASBY_DOCK.lng, KEASBY_DOCK.lat
        )
    );
    assert_eq!(
        seen[0].query.as_deref(),
        Some("overview=false&alternatives=true&steps=true&hints=;")
    );
}

#[tokio::test]
async fn hints_from_one_reply_go_out_with_the_next_request() {
    init_tracing();
    let points = [ENTRANCE.coordinate(), KEASBY_DOCK.coordinate()];
    let stub = Stub::replying(StatusCode::OK, direct_response("Smith Street", &points).to_string());
    let base_url = serve(Arc::clone(&stub)).await;

    let router = osrm_router(&base_url);
    router.compute_route(&gate_to_dock(), RouteOptions::default()).await.unwrap();
    router.compute_route(&gate_to_dock(), RouteOptions::default()).await.unwrap();

    let seen = stub.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen[1].query.as_deref().unwrap().ends_with("hints=hint-0;hint-1"));
}

#[tokio::test]
async fn no_route_body_with_error_status_is_a_rejection() {
    init_tracing();
    let stub = Stub::replying(StatusCode::BAD_REQUEST, no_route().to_string());
    let base_url = serve(stub).await;

    let err = osrm_router(&base_url)
        .compute_route(&gate_to_dock(), RouteOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RoutingError::RoutingRejected {
            code: "NoRoute".to_string(),
            message: "Impossible route between points".to_string(),
        }
    );
    assert_eq!(err.status(), 1);
}

#[tokio::test]
async fn server_error_without_route_body_is_a_transport_failure() {
    init_tracing();
    let stub = Stub::replying(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded");
    let base_url = serve(stub).await;

    let transport = OsrmHttpTransport::new(base_url.clone(), Duration::from_secs(5)).unwrap();
    let request = osrm_router(&base_url).build_request(&gate_to_dock(), &RouteOptions::default());
    match transport.fetch(&request).await {
        Err(TransportError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected a status error, got {other:?}"),
    }

    let err = osrm_router(&base_url)
        .compute_route(&gate_to_dock(), RouteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RoutingError::Transport(_)));
    assert!(!err.clears_route());
}

#[tokio::test]
async fn garbage_with_ok_status_is_a_decode_failure() {
    init_tracing();
    let stub = Stub::replying(StatusCode::OK, "<html>maintenance</html>");
    let base_url = serve(stub).await;

    let err = osrm_router(&base_url)
        .compute_route(&gate_to_dock(), RouteOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), -3);
}

#[tokio::test]
async fn gateway_posts_waypoints_with_bearer_token() {
    init_tracing();
    let points = [APPROACH_ROAD.coordinate(), ENTRANCE.coordinate()];
    let stub = Stub::replying(StatusCode::OK, direct_response("Smith Street", &points).to_string());
    let base_url = serve(Arc::clone(&stub)).await;

    let transport = GatewayTransport::new(base_url, Duration::from_secs(5))
        .unwrap()
        .with_token("driver-token");
    let router = Router::new(RouterConfig::default(), Arc::new(transport));
    let waypoints = vec![Waypoint::new(APPROACH_ROAD.coordinate()), Waypoint::new(ENTRANCE.coordinate())];
    let routes = router.compute_route(&waypoints, RouteOptions::default()).await.unwrap();
    assert_eq!(routes.len(), 1);

    let seen = stub.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer driver-token"));
    let body = seen[0].body.as_ref().unwrap();
    assert_eq!(body["profile"], "driving");
    assert_eq!(body["waypoints"].as_array().map(Vec::len), Some(2));
    let lat = body["waypoints"][0]["lat"].as_f64().unwrap();
    let lng = body["waypoints"][1]["lng"].as_f64().unwrap();
    assert!((lat - APPROACH_ROAD.lat).abs() < 1e-9);
    assert!((lng - ENTRANCE.lng).abs() < 1e-9);
}

#[tokio::test]
async fn gateway_without_token_sends_no_authorization() {
    init_tracing();
    let points = [APPROACH_ROAD.coordinate(), ENTRANCE.coordinate()];
    let stub = Stub::replying(StatusCode::OK, direct_response("Smith Street", &points).to_string());
    let base_url = serve(Arc::clone(&stub)).await;

    let transport = GatewayTransport::new(base_url, Duration::from_secs(5)).unwrap();
    let router = Router::new(RouterConfig::default(), Arc::new(transport));
    let waypoints = vec![Waypoint::new(APPROACH_ROAD.coordinate()), Waypoint::new(ENTRANCE.coordinate())];
    router.compute_route(&waypoints, RouteOptions::default()).await.unwrap();

    assert_eq!(stub.seen()[0].authorization, None);
}
