//! Ties the plan, the router, the route lines and the itinerary together.
//!
//! The control is driven through `&mut self` by the host's event loop.
//! Anything that needs the network hands back a [`RouteTicket`]; the host
//! awaits [`RouteTicket::run`] wherever it likes and feeds the outcome to
//! [`Control::finish_route`]. Only the most recently issued ticket is ever
//! applied.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use tracing::{debug, error, warn};

use crate::error::{RoutingError, format_error_message};
use crate::events::Signal;
use crate::formatter::RouteFormatter;
use crate::itinerary::{Itinerary, ItineraryOptions};
use crate::line::{LineOptions, RouteLine};
use crate::map::{LayerId, MapSurface};
use crate::plan::{GeocodeOutcome, GeocodeTicket, NewWaypoint, Plan, PlanEvent};
use crate::route::{Route, RouteSet};
use crate::router::{RouteOptions, Router};
use crate::waypoint::{Coordinate, Waypoint};

/// When to fit the map to a freshly selected route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitMode {
    /// Only when the waypoints are not already comfortably in view.
    #[default]
    Smart,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaypointMode {
    /// Keep waypoints where the user put them and draw dashed connectors.
    #[default]
    Connect,
    /// Move waypoints onto the road network after each route.
    Snap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlOptions {
    pub auto_route: bool,
    pub route_while_dragging: bool,
    pub drag_interval: Duration,
    pub waypoint_mode: WaypointMode,
    pub show_alternatives: bool,
    pub fit_selected_routes: FitMode,
    pub line_options: LineOptions,
    pub alt_line_options: LineOptions,
    /// Touching the main line may spawn a waypoint.
    pub add_waypoints: bool,
    pub itinerary: ItineraryOptions,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            auto_route: true,
            route_while_dragging: false,
            drag_interval: Duration::from_millis(500),
            waypoint_mode: WaypointMode::Connect,
            show_alternatives: false,
            fit_selected_routes: FitMode::Smart,
            line_options: LineOptions::default(),
            alt_line_options: LineOptions::alternative(),
            add_waypoints: true,
            itinerary: ItineraryOptions::default(),
        }
    }
}

/// Receives routing failures the user should hear about.
pub trait Notifier: Send + Sync {
    fn routing_error(&self, error: &RoutingError, message: &str);
}

/// Logs routing failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn routing_error(&self, error: &RoutingError, message: &str) {
        error!(status = error.status(), %error, "{message}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    RoutingStart { waypoints: Vec<Waypoint> },
    RoutesFound { waypoints: Vec<Waypoint>, routes: Vec<Route> },
    RouteSelected { routes_index: usize },
    RoutingError { error: RoutingError, message: String },
    WaypointsChanged { waypoints: Vec<Waypoint> },
}

/// Coalesces drag updates into at most one request per interval.
#[derive(Debug, Clone, Copy)]
pub struct DragThrottle {
    interval: Duration,
    deadline: Option<Instant>,
}

impl DragThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Start an interval unless one is already running. Returns whether a
    /// new deadline was set.
    pub fn arm(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.interval);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// A route computation that borrows nothing from the control.
pub struct RouteTicket {
    seq: u64,
    waypoints: Vec<Waypoint>,
    options: RouteOptions,
    router: Arc<Router>,
    registration: AbortRegistration,
}

impl std::fmt::Debug for RouteTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTicket")
            .field("seq", &self.seq)
            .field("waypoints", &self.waypoints.len())
            .field("options", &self.options)
            .finish()
    }
}

impl RouteTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn options(&self) -> RouteOptions {
        self.options
    }

    /// Resolves to [`RoutingError::Aborted`] once a newer ticket was issued.
    pub async fn run(self) -> RouteOutcome {
        let Self {
            seq,
            waypoints,
            options,
            router,
            registration,
        } = self;

        let computation = router.compute_route(&waypoints, options);
        let result = match Abortable::new(computation, registration).await {
            Ok(result) => result,
            Err(_) => Err(RoutingError::Aborted),
        };
        RouteOutcome {
            seq,
            waypoints,
            options,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub seq: u64,
    pub waypoints: Vec<Waypoint>,
    pub options: RouteOptions,
    pub result: Result<Vec<Route>, RoutingError>,
}

pub struct Control {
    options: ControlOptions,
    router: Arc<Router>,
    plan: Plan,
    itinerary: Itinerary,
    notifier: Box<dyn Notifier>,
    routes: Option<RouteSet>,
    line: Option<RouteLine>,
    alternative_lines: Vec<RouteLine>,
    seq: u64,
    pending: Option<AbortHandle>,
    throttle: DragThrottle,
    events: Signal<ControlEvent>,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("options", &self.options)
            .field("plan", &self.plan)
            .field("seq", &self.seq)
            .field("routing", &self.pending.is_some())
            .finish()
    }
}

impl Control {
    pub fn new(router: Arc<Router>, plan: Plan, options: ControlOptions) -> Self {
        let itinerary = Itinerary::new(options.itinerary.clone());
        let throttle = DragThrottle::new(options.drag_interval);
        Self {
            options,
            router,
            plan,
            itinerary,
            notifier: Box::new(TracingNotifier),
            routes: None,
            line: None,
            alternative_lines: Vec::new(),
            seq: 0,
            pending: None,
            throttle,
            events: Signal::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_formatter(mut self, formatter: impl RouteFormatter + 'static) -> Self {
        self.itinerary = std::mem::take(&mut self.itinerary).with_formatter(formatter);
        self
    }

    pub fn options(&self) -> &ControlOptions {
        &self.options
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn events(&mut self) -> &mut Signal<ControlEvent> {
        &mut self.events
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_events(&mut self) -> &mut Signal<PlanEvent> {
        self.plan.events()
    }

    pub fn itinerary(&self) -> &Itinerary {
        &self.itinerary
    }

    /// Row hover, click and visibility. Change the selection through
    /// [`Control::select_alternative`] so the lines follow.
    pub fn itinerary_mut(&mut self) -> &mut Itinerary {
        &mut self.itinerary
    }

    pub fn routes(&self) -> Option<&RouteSet> {
        self.routes.as_ref()
    }

    pub fn selected_route(&self) -> Option<&Route> {
        self.routes.as_ref().map(RouteSet::selected)
    }

    pub fn line(&self) -> Option<&RouteLine> {
        self.line.as_ref()
    }

    pub fn alternative_lines(&self) -> &[RouteLine] {
        &self.alternative_lines
    }

    /// Sequence number of the most recently issued request.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_routing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn drag_deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// Put the plan's markers on `map` and start the first route.
    pub fn add_to(&mut self, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.plan.attach(map);
        if self.options.auto_route {
            self.route(RouteOptions::default())
        } else {
            None
        }
    }

    pub fn remove(&mut self, map: &mut dyn MapSurface) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.throttle.cancel();
        self.clear_lines(map);
        self.itinerary.clear(map);
        self.plan.detach(map);
    }

    /// Issue a request for the plan's current waypoints, superseding any
    /// request still in flight. `None` while the plan has unplaced waypoints.
    pub fn route(&mut self, options: RouteOptions) -> Option<RouteTicket> {
        self.seq += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        if !self.plan.is_ready() {
            return None;
        }

        let waypoints = self.plan.waypoints().to_vec();
        self.events.emit(&ControlEvent::RoutingStart {
            waypoints: waypoints.clone(),
        });

        let (handle, registration) = AbortHandle::new_pair();
        self.pending = Some(handle);
        debug!(
            seq = self.seq,
            waypoints = waypoints.len(),
            geometry_only = options.geometry_only,
            "routing"
        );

        Some(RouteTicket {
            seq: self.seq,
            waypoints,
            options,
            router: Arc::clone(&self.router),
            registration,
        })
    }

    /// Apply a finished computation. Returns `false` when it was superseded.
    pub fn finish_route(&mut self, outcome: RouteOutcome, map: &mut dyn MapSurface) -> bool {
        if outcome.seq != self.seq {
            warn!(seq = outcome.seq, latest = self.seq, "discarding stale routing result");
            return false;
        }
        self.pending = None;

        if outcome.options.geometry_only {
            self.update_line(outcome.result, map);
            return true;
        }

        match outcome.result {
            Err(RoutingError::Aborted) => debug!(seq = outcome.seq, "routing aborted"),
            Err(error) => self.routing_failed(error, map),
            Ok(routes) => match RouteSet::new(routes.clone()) {
                Some(set) => {
                    self.clear_lines(map);
                    self.events.emit(&ControlEvent::RoutesFound {
                        waypoints: outcome.waypoints,
                        routes: routes.clone(),
                    });
                    self.routes = Some(set);
                    self.itinerary.set_alternatives(&routes, map);
                    self.route_selected(0, map);
                }
                None => self.routing_failed(
                    RoutingError::RoutingRejected {
                        code: "NoRoute".to_string(),
                        message: "no routes returned".to_string(),
                    },
                    map,
                ),
            },
        }
        true
    }

    /// Make `routes_index` the drawn route. No request is issued.
    pub fn select_alternative(&mut self, routes_index: usize, map: &mut dyn MapSurface) -> bool {
        let known = self.routes.as_ref().is_some_and(|routes| routes_index < routes.len());
        if !known {
            return false;
        }
        self.itinerary.select(routes_index, map);
        self.route_selected(routes_index, map);
        true
    }

    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.plan.set_waypoints(waypoints, map);
        self.on_waypoints_changed(map)
    }

    pub fn splice_waypoints(
        &mut self,
        index: usize,
        removed: usize,
        added: Vec<Waypoint>,
        map: &mut dyn MapSurface,
    ) -> Option<RouteTicket> {
        self.plan.splice(index, removed, added, map);
        self.on_waypoints_changed(map)
    }

    pub fn add_waypoint(&mut self, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.plan.add_waypoint(map);
        self.on_waypoints_changed(map)
    }

    pub fn reverse_waypoints(&mut self, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.plan.reverse_waypoints(map);
        self.on_waypoints_changed(map)
    }

    pub fn remove_waypoint(&mut self, index: usize, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.plan.remove_waypoint(index, map)?;
        self.on_waypoints_changed(map)
    }

    pub fn geocoded(&mut self, index: usize, waypoint: Waypoint, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        if !self.plan.geocoded(index, waypoint, map) {
            return None;
        }
        self.on_waypoints_changed(map)
    }

    pub fn reverse_geocode(&self, index: usize) -> Option<GeocodeTicket> {
        self.plan.reverse_geocode(index)
    }

    /// Naming a waypoint never re-routes.
    pub fn finish_geocode(&mut self, outcome: GeocodeOutcome) -> Option<String> {
        self.plan.finish_geocode(outcome)
    }

    pub fn drag_start(&mut self, index: usize) -> bool {
        self.plan.drag_start(index)
    }

    pub fn drag(&mut self, index: usize, position: Coordinate, now: Instant, map: &mut dyn MapSurface) {
        if self.plan.drag(index, position, map) && self.options.route_while_dragging {
            self.throttle.arm(now);
        }
    }

    /// Issue the throttled geometry-only request once the interval passed.
    pub fn poll_drag(&mut self, now: Instant) -> Option<RouteTicket> {
        if !self.throttle.fire(now) {
            return None;
        }
        self.route(RouteOptions {
            geometry_only: true,
            ..RouteOptions::default()
        })
    }

    pub fn drag_end(&mut self, index: usize, position: Coordinate, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.throttle.cancel();
        if !self.plan.drag_end(index, position, map) {
            return None;
        }
        match self.on_waypoints_changed(map) {
            None if self.options.route_while_dragging => self.route(RouteOptions::default()),
            ticket => ticket,
        }
    }

    /// Pointer-down on one of the route layers.
    pub fn line_pointer_down(&mut self, layer: LayerId, position: Coordinate, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        if let Some(line) = self.line.as_ref().filter(|line| line.owns(layer)) {
            let touched = line.touch(position)?;
            let last = self.plan.len().saturating_sub(1);
            if !line.accepts_new_waypoints() || touched.after_index.is_some_and(|index| index >= last) {
                return None;
            }
            return match self.plan.drag_new_waypoint(&touched, map) {
                NewWaypoint::Inserted(_) => self.on_waypoints_changed(map),
                NewWaypoint::Preview(_) => None,
            };
        }

        let alternative = self
            .alternative_lines
            .iter()
            .find(|line| line.owns(layer))
            .map(RouteLine::routes_index)?;
        self.select_alternative(alternative, map);
        None
    }

    pub fn move_new_waypoint(&mut self, position: Coordinate, map: &mut dyn MapSurface) -> bool {
        self.plan.move_new_waypoint(position, map)
    }

    pub fn drop_new_waypoint(&mut self, position: Coordinate, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        self.plan.drop_new_waypoint(position, map)?;
        self.on_waypoints_changed(map)
    }

    fn on_waypoints_changed(&mut self, map: &mut dyn MapSurface) -> Option<RouteTicket> {
        let ticket = if self.options.auto_route {
            self.route(RouteOptions::default())
        } else {
            None
        };
        if !self.plan.is_ready() {
            self.clear_lines(map);
            self.itinerary.clear(map);
        }
        self.events.emit(&ControlEvent::WaypointsChanged {
            waypoints: self.plan.waypoints().to_vec(),
        });
        ticket
    }

    fn route_selected(&mut self, routes_index: usize, map: &mut dyn MapSurface) {
        let Some(routes) = self.routes.as_mut() else {
            return;
        };
        if !routes.select(routes_index) {
            return;
        }
        let selected = routes.selected().waypoints.clone();

        let fit = match self.options.fit_selected_routes {
            FitMode::Smart => !self.waypoints_visible(map),
            FitMode::Always => true,
            FitMode::Never => false,
        };
        self.update_lines(map);
        if fit {
            if let Some(bounds) = self.line.as_ref().and_then(RouteLine::bounds) {
                map.fit_bounds(&bounds);
            }
        }

        if self.options.waypoint_mode == WaypointMode::Snap && !selected.is_empty() {
            self.plan.set_waypoints(selected, map);
        }
        self.events.emit(&ControlEvent::RouteSelected { routes_index });
    }

    /// Drag preview result: only the lines change, the selection is kept.
    fn update_line(&mut self, result: Result<Vec<Route>, RoutingError>, map: &mut dyn MapSurface) {
        match result {
            Ok(routes) => {
                let keep = self.routes.as_ref().map_or(0, RouteSet::selected_index);
                let keep = if keep < routes.len() { keep } else { 0 };
                match RouteSet::with_selected(routes, keep) {
                    Some(set) => {
                        self.routes = Some(set);
                        self.update_lines(map);
                    }
                    None => self.clear_lines(map),
                }
            }
            Err(RoutingError::Aborted) => {}
            Err(error) => {
                debug!(%error, "drag update failed");
                if error.clears_route() {
                    self.clear_lines(map);
                    self.itinerary.clear(map);
                    self.routes = None;
                }
            }
        }
    }

    fn routing_failed(&mut self, error: RoutingError, map: &mut dyn MapSurface) {
        if error.clears_route() {
            self.clear_lines(map);
            self.itinerary.clear(map);
            self.routes = None;
        }
        let message = format_error_message(&error);
        self.notifier.routing_error(&error, &message);
        self.events.emit(&ControlEvent::RoutingError { error, message });
    }

    fn update_lines(&mut self, map: &mut dyn MapSurface) {
        self.clear_lines(map);
        let Some(routes) = self.routes.as_ref() else {
            return;
        };

        // Alternatives first so they sit below the main line.
        if self.options.show_alternatives {
            self.alternative_lines = routes
                .alternatives()
                .map(|route| RouteLine::draw(route, &self.options.alt_line_options, map))
                .collect();
        }

        let base = &self.options.line_options;
        let options = LineOptions {
            add_waypoints: base.add_waypoints && self.options.add_waypoints,
            extend_to_waypoints: base.extend_to_waypoints && self.options.waypoint_mode == WaypointMode::Connect,
            ..base.clone()
        };
        self.line = Some(RouteLine::draw(routes.selected(), &options, map));
    }

    fn clear_lines(&mut self, map: &mut dyn MapSurface) {
        if let Some(line) = self.line.take() {
            line.remove(map);
        }
        for line in self.alternative_lines.drain(..) {
            line.remove(map);
        }
    }

    /// Waypoints spread over more than a fifth of the map and at least one
    /// of them on screen.
    fn waypoints_visible(&self, map: &dyn MapSurface) -> bool {
        let positions: Vec<Coordinate> = self.plan.waypoints().iter().filter_map(|wp| wp.position).collect();
        let projected: Vec<_> = positions.iter().filter_map(|position| map.project(*position)).collect();
        let Some(first) = projected.first() else {
            return false;
        };

        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for point in &projected[1..] {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }

        let size = map.size();
        let spread = max_x - min_x > size.x / 5.0 || max_y - min_y > size.y / 5.0;
        let on_screen = map
            .viewport_bounds()
            .is_some_and(|viewport| positions.iter().any(|position| viewport.contains(*position)));
        spread && on_screen
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::config::RouterConfig;
    use crate::geometry::Bounds;
    use crate::map::HeadlessMap;
    use crate::osrm::{OsrmResponse, RouteRequest, RouteTransport, TransportError};
    use crate::plan::PlanOptions;
    use crate::polyline;

    struct Canned(serde_json::Value);

    impl RouteTransport for Canned {
        fn fetch<'a>(&'a self, _request: &'a RouteRequest) -> BoxFuture<'a, Result<OsrmResponse, TransportError>> {
            let value = self.0.clone();
            async move { Ok(serde_json::from_value(value)?) }.boxed()
        }
    }

    #[derive(Default)]
    struct Recording(Arc<Mutex<Vec<i32>>>);

    impl Notifier for Recording {
        fn routing_error(&self, error: &RoutingError, _message: &str) {
            self.0.lock().push(error.status());
        }
    }

    fn gate() -> Coordinate {
        Coordinate::new(40.5209, -74.3239)
    }

    fn dock() -> Coordinate {
        Coordinate::new(40.5211, -74.3252)
    }

    fn osrm_route(summary: &str, points: &[Coordinate]) -> serde_json::Value {
        let last = points[points.len() - 1];
        json!({
            "distance": 150.0,
            "duration": 30.0,
            "legs": [{
                "summary": summary,
                "steps": [
                    {
                        "geometry": polyline::encode(points, 5),
                        "maneuver": { "type": "depart", "bearing_after": 270 },
                        "distance": 150.0, "duration": 30.0, "name": summary, "mode": "driving",
                    },
                    {
                        "geometry": polyline::encode(&[last], 5),
                        "maneuver": { "type": "arrive", "bearing_after": 0 },
                        "distance": 0.0, "duration": 0.0, "name": summary, "mode": "driving",
                    },
                ],
            }],
        })
    }

    fn response() -> serde_json::Value {
        let middle = Coordinate::new(40.5210, -74.3245);
        let detour = Coordinate::new(40.5220, -74.3245);
        json!({
            "code": "Ok",
            "routes": [
                osrm_route("main road", &[gate(), middle, dock()]),
                osrm_route("scale road", &[gate(), detour, dock()]),
            ],
            "waypoints": [
                { "location": [-74.32391, 40.52091], "hint": "a" },
                { "location": [-74.32521, 40.52111], "hint": "b" },
            ],
        })
    }

    fn control(options: ControlOptions) -> Control {
        let router = Router::new(RouterConfig::default(), Arc::new(Canned(response())));
        let plan = Plan::new(vec![Waypoint::new(gate()), Waypoint::new(dock())], PlanOptions::default());
        Control::new(Arc::new(router), plan, options)
    }

    fn record(control: &mut Control) -> Arc<Mutex<Vec<ControlEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        control.events().subscribe(move |event: &ControlEvent| sink.lock().push(event.clone()));
        seen
    }

    async fn routed(options: ControlOptions) -> (Control, HeadlessMap) {
        let mut map = HeadlessMap::default();
        let mut control = control(options);
        let ticket = control.add_to(&mut map).unwrap();
        let outcome = ticket.run().await;
        assert!(control.finish_route(outcome, &mut map));
        (control, map)
    }

    fn outcome(seq: u64, result: Result<Vec<Route>, RoutingError>) -> RouteOutcome {
        RouteOutcome {
            seq,
            waypoints: Vec::new(),
            options: RouteOptions::default(),
            result,
        }
    }

    #[tokio::test]
    async fn successful_route_draws_and_fits() {
        let mut map = HeadlessMap::default();
        let mut control = control(ControlOptions::default());
        let seen = record(&mut control);

        let ticket = control.add_to(&mut map).unwrap();
        assert!(control.is_routing());
        let outcome = ticket.run().await;
        assert!(control.finish_route(outcome, &mut map));

        assert!(!control.is_routing());
        assert_eq!(control.selected_route().map(|r| r.name.as_str()), Some("Main road"));
        assert_eq!(control.itinerary().alternatives().len(), 2);
        assert_eq!(map.fitted().len(), 1);
        assert!(control.line().is_some());
        assert!(control.alternative_lines().is_empty());

        let events = seen.lock();
        assert!(matches!(events[0], ControlEvent::RoutingStart { .. }));
        assert!(matches!(&events[1], ControlEvent::RoutesFound { routes, .. } if routes.len() == 2));
        assert_eq!(events[2], ControlEvent::RouteSelected { routes_index: 0 });
    }

    #[tokio::test]
    async fn latest_request_wins() {
        let mut map = HeadlessMap::default();
        let mut control = control(ControlOptions::default());

        let first = control.route(RouteOptions::default()).unwrap();
        let second = control.route(RouteOptions::default()).unwrap();
        assert!(second.seq() > first.seq());

        let second = second.run().await;
        let first = first.run().await;
        assert_eq!(first.result, Err(RoutingError::Aborted));

        assert!(control.finish_route(second, &mut map));
        let drawn = map.polylines().count();
        assert!(!control.finish_route(first, &mut map));
        assert_eq!(map.polylines().count(), drawn);
        assert!(control.selected_route().is_some());
    }

    #[tokio::test]
    async fn rejection_clears_but_timeout_keeps() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let (control, mut map) = routed(ControlOptions::default()).await;
        let mut control = control.with_notifier(Recording(Arc::clone(&recorded)));
        let seen = record(&mut control);

        let seq = control.route(RouteOptions::default()).unwrap().seq();
        control.finish_route(outcome(seq, Err(RoutingError::Timeout)), &mut map);
        assert!(control.line().is_some());
        assert_eq!(control.itinerary().alternatives().len(), 2);

        let seq = control.route(RouteOptions::default()).unwrap().seq();
        let rejected = RoutingError::RoutingRejected {
            code: "NoRoute".into(),
            message: "Impossible route".into(),
        };
        control.finish_route(outcome(seq, Err(rejected)), &mut map);
        assert!(control.line().is_none());
        assert!(control.routes().is_none());
        assert_eq!(map.polylines().count(), 0);

        assert_eq!(*recorded.lock(), vec![-1, 1]);
        let messages: Vec<_> = seen
            .lock()
            .iter()
            .filter_map(|event| match event {
                ControlEvent::RoutingError { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].starts_with("The route could not be calculated."));
    }

    #[tokio::test]
    async fn stale_success_leaves_the_newer_route_in_place() {
        let mut map = HeadlessMap::default();
        let mut control = control(ControlOptions::default());

        // Completes before the next request, so nothing aborts it.
        let stale = control.route(RouteOptions::default()).unwrap().run().await;
        let routes = stale.result.clone().unwrap();
        assert_eq!(routes.len(), 2);

        let seq = control.route(RouteOptions::default()).unwrap().seq();
        assert!(control.finish_route(outcome(seq, Ok(vec![routes[1].clone()])), &mut map));
        let drawn = map.polylines().count();

        assert!(!control.finish_route(stale, &mut map));
        assert_eq!(control.routes().map(RouteSet::len), Some(1));
        assert_eq!(control.selected_route().map(|r| r.name.as_str()), Some("Scale road"));
        assert_eq!(control.itinerary().alternatives().len(), 1);
        assert_eq!(map.polylines().count(), drawn);
    }

    #[tokio::test]
    async fn rejected_drag_update_clears_the_whole_route() {
        let (mut control, mut map) = routed(ControlOptions {
            route_while_dragging: true,
            ..ControlOptions::default()
        })
        .await;
        assert_eq!(control.itinerary().alternatives().len(), 2);

        let geometry_only = RouteOptions {
            geometry_only: true,
            ..RouteOptions::default()
        };
        let seq = control.route(geometry_only).unwrap().seq();
        let rejected = RoutingError::RoutingRejected {
            code: "NoRoute".into(),
            message: "Impossible route".into(),
        };
        let update = RouteOutcome {
            options: geometry_only,
            ..outcome(seq, Err(rejected))
        };
        assert!(control.finish_route(update, &mut map));

        assert!(control.line().is_none());
        assert!(control.routes().is_none());
        assert!(control.itinerary().alternatives().is_empty());
        assert_eq!(map.polylines().count(), 0);
    }

    struct Named(&'static str);

    impl crate::plan::Geocoder for Named {
        fn reverse<'a>(&'a self, _position: Coordinate) -> BoxFuture<'a, Option<String>> {
            let name = self.0.to_string();
            async move { Some(name) }.boxed()
        }
    }

    #[tokio::test]
    async fn routing_proceeds_while_a_name_is_looked_up() {
        let mut map = HeadlessMap::default();
        let mut control = control(ControlOptions::default());
        let geocoder = Named("Smith Street Gate");
        let lookup = control.reverse_geocode(0).unwrap().run(&geocoder);

        let outcome = control.add_to(&mut map).unwrap().run().await;
        assert!(control.finish_route(outcome, &mut map));
        let seq = control.seq();

        let name = control.finish_geocode(lookup.await);
        assert_eq!(name.as_deref(), Some("Smith Street Gate"));
        assert_eq!(control.plan().waypoints()[0].name, "Smith Street Gate");
        assert_eq!(control.seq(), seq);
        assert!(!control.is_routing());
    }

    #[tokio::test]
    async fn abort_is_silent() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let (control, mut map) = routed(ControlOptions::default()).await;
        let mut control = control.with_notifier(Recording(Arc::clone(&recorded)));

        let seq = control.route(RouteOptions::default()).unwrap().seq();
        assert!(control.finish_route(outcome(seq, Err(RoutingError::Aborted)), &mut map));
        assert!(recorded.lock().is_empty());
        assert!(control.line().is_some());
    }

    #[tokio::test]
    async fn smart_fit_skips_visible_waypoints() {
        let mut map = HeadlessMap::default().with_viewport(Bounds::new(
            Coordinate::new(40.5205, -74.3256),
            Coordinate::new(40.5215, -74.3235),
        ));
        let mut control = control(ControlOptions::default());
        let outcome = control.add_to(&mut map).unwrap().run().await;
        control.finish_route(outcome, &mut map);
        assert!(map.fitted().is_empty());

        let mut never = control_with_fit(FitMode::Never);
        let mut blank = HeadlessMap::default();
        let outcome = never.add_to(&mut blank).unwrap().run().await;
        never.finish_route(outcome, &mut blank);
        assert!(blank.fitted().is_empty());
    }

    fn control_with_fit(fit_selected_routes: FitMode) -> Control {
        control(ControlOptions {
            fit_selected_routes,
            ..ControlOptions::default()
        })
    }

    #[tokio::test]
    async fn alternatives_are_touchable() {
        let (mut control, mut map) = routed(ControlOptions {
            show_alternatives: true,
            ..ControlOptions::default()
        })
        .await;
        assert_eq!(control.alternative_lines().len(), 1);

        let layer = map
            .layers()
            .map(|(id, _)| *id)
            .find(|id| control.alternative_lines()[0].owns(*id))
            .unwrap();
        let before = control.seq();
        assert!(control.line_pointer_down(layer, Coordinate::new(40.5220, -74.3245), &mut map).is_none());

        assert_eq!(control.routes().map(RouteSet::selected_index), Some(1));
        assert_eq!(control.itinerary().selected().map(|alt| alt.routes_index), Some(1));
        assert_eq!(control.alternative_lines()[0].routes_index(), 0);
        assert_eq!(control.seq(), before);
    }

    #[tokio::test]
    async fn touching_main_line_previews_new_waypoint() {
        let (mut control, mut map) = routed(ControlOptions::default()).await;
        let layer = map
            .layers()
            .map(|(id, _)| *id)
            .find(|id| control.line().is_some_and(|line| line.owns(*id)))
            .unwrap();

        let middle = Coordinate::new(40.5210, -74.3245);
        assert!(control.line_pointer_down(layer, middle, &mut map).is_none());
        assert!(control.plan().has_preview());

        let ticket = control.drop_new_waypoint(middle, &mut map).unwrap();
        assert_eq!(control.plan().len(), 3);
        assert_eq!(control.plan().waypoints()[1].position, Some(middle));
        assert_eq!(ticket.seq(), control.seq());
    }

    #[tokio::test]
    async fn snap_mode_moves_waypoints_without_rerouting() {
        let (control, _map) = routed(ControlOptions {
            waypoint_mode: WaypointMode::Snap,
            ..ControlOptions::default()
        })
        .await;
        assert_eq!(control.plan().waypoints()[0].position, Some(Coordinate::new(40.52091, -74.32391)));
        assert_eq!(control.seq(), 1);
        assert!(!control.is_routing());
    }

    #[tokio::test]
    async fn unready_plan_clears_lines() {
        let (mut control, mut map) = routed(ControlOptions::default()).await;
        let seen = record(&mut control);
        assert!(control.add_waypoint(&mut map).is_none());
        assert!(control.line().is_none());
        assert!(control.itinerary().alternatives().is_empty());
        assert!(matches!(&seen.lock()[0], ControlEvent::WaypointsChanged { waypoints } if waypoints.len() == 3));
    }

    #[tokio::test]
    async fn drag_updates_are_throttled() {
        let (mut control, mut map) = routed(ControlOptions {
            route_while_dragging: true,
            show_alternatives: true,
            ..ControlOptions::default()
        })
        .await;
        control.select_alternative(1, &mut map);

        let t0 = Instant::now();
        let moved = Coordinate::new(40.5213, -74.3253);
        assert!(control.drag_start(1));
        control.drag(1, moved, t0, &mut map);
        control.drag(1, moved, t0 + Duration::from_millis(100), &mut map);
        assert_eq!(control.drag_deadline(), Some(t0 + Duration::from_millis(500)));
        assert!(control.poll_drag(t0 + Duration::from_millis(200)).is_none());

        let ticket = control.poll_drag(t0 + Duration::from_millis(500)).unwrap();
        assert!(ticket.options().geometry_only);
        assert!(control.poll_drag(t0 + Duration::from_millis(600)).is_none());

        let outcome = ticket.run().await;
        assert!(control.finish_route(outcome, &mut map));
        assert_eq!(control.routes().map(RouteSet::selected_index), Some(1));

        control.drag(1, moved, t0 + Duration::from_millis(700), &mut map);
        let full = control.drag_end(1, moved, &mut map).unwrap();
        assert!(!full.options().geometry_only);
        assert!(control.drag_deadline().is_none());
    }

    #[test]
    fn throttle_arms_once_per_interval() {
        let t0 = Instant::now();
        let mut throttle = DragThrottle::new(Duration::from_millis(500));
        assert!(throttle.arm(t0));
        assert!(!throttle.arm(t0 + Duration::from_millis(10)));
        assert!(!throttle.fire(t0 + Duration::from_millis(499)));
        assert!(throttle.fire(t0 + Duration::from_millis(500)));
        assert!(throttle.arm(t0 + Duration::from_millis(501)));
        throttle.cancel();
        assert!(throttle.deadline().is_none());
    }
}
