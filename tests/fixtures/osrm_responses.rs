//! Canned OSRM responses and in-memory transports.

use std::collections::VecDeque;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{Value, json};

use yard_routing::Coordinate;
use yard_routing::osrm::{OsrmResponse, RouteRequest, RouteTransport, TransportError};
use yard_routing::polyline;

/// One `depart` step over `points` followed by an `arrive`.
pub fn route_json(summary: &str, points: &[Coordinate], distance: f64, duration: f64) -> Value {
    let last = points[points.len() - 1];
    json!({
        "distance": distance,
        "duration": duration,
        "legs": [{
            "summary": summary,
            "steps": [
                {
                    "geometry": polyline::encode(points, 5),
                    "maneuver": { "type": "depart", "bearing_after": 270 },
                    "distance": distance,
                    "duration": duration,
                    "name": summary,
                    "mode": "driving",
                },
                {
                    "geometry": polyline::encode(&[last], 5),
                    "maneuver": { "type": "arrive", "bearing_after": 0 },
                    "distance": 0.0,
                    "duration": 0.0,
                    "name": summary,
                    "mode": "driving",
                },
            ],
        }],
    })
}

/// An `Ok` response echoing `waypoints` as the snapped locations.
pub fn ok_response(routes: Vec<Value>, waypoints: &[Coordinate]) -> Value {
    let snapped: Vec<Value> = waypoints
        .iter()
        .enumerate()
        .map(|(i, c)| json!({ "location": [c.lng, c.lat], "hint": format!("hint-{i}") }))
        .collect();
    json!({ "code": "Ok", "routes": routes, "waypoints": snapped })
}

pub fn no_route() -> Value {
    json!({ "code": "NoRoute", "message": "Impossible route between points" })
}

/// Straight line through the given points, as a single-route response.
pub fn direct_response(name: &str, points: &[Coordinate]) -> Value {
    ok_response(vec![route_json(name, points, 400.0, 90.0)], points)
}

/// Replies in order, each after an optional delay; the last reply repeats.
pub struct Scripted {
    replies: Mutex<VecDeque<(Duration, Value)>>,
    requests: Mutex<Vec<RouteRequest>>,
}

impl Scripted {
    pub fn new(replies: Vec<(Duration, Value)>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: Value) -> Self {
        Self::new(vec![(Duration::ZERO, reply)])
    }

    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().clone()
    }

    fn next(&self) -> (Duration, Value) {
        let mut replies = self.replies.lock();
        if replies.len() > 1 {
            replies.pop_front().unwrap_or((Duration::ZERO, Value::Null))
        } else {
            replies.front().cloned().unwrap_or((Duration::ZERO, Value::Null))
        }
    }
}

impl RouteTransport for Scripted {
    fn fetch<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<OsrmResponse, TransportError>> {
        self.requests.lock().push(request.clone());
        let (delay, reply) = self.next();
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(serde_json::from_value(reply)?)
        }
        .boxed()
    }
}
