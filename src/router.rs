//! Turns waypoints into routes through a [`RouteTransport`].
//!
//! The router owns the hint cache and the client-side deadline. Response
//! conversion (geometry concatenation, instruction translation, waypoint
//! snapping) happens here so transports only move bytes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::error::RoutingError;
use crate::geometry::Bounds;
use crate::instructions::{StepMetrics, StepPosition, StepToText, TemplateStepText, translate};
use crate::localization::capitalize;
use crate::osrm::{OsrmResponse, OsrmRoute, OsrmWaypoint, Overview, RouteRequest, RouteTransport};
use crate::polyline;
use crate::route::{Route, RouteSummary};
use crate::waypoint::Waypoint;

/// Per-call flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOptions {
    /// Only the line is needed (drag previews); instructions are ignored.
    pub geometry_only: bool,
    /// With `geometry_only`, accept the backend's simplified overview.
    pub simplify_geometry: bool,
    /// Sends `continue_straight=false` when set.
    pub allow_u_turns: bool,
}

pub struct Router {
    config: RouterConfig,
    transport: Arc<dyn RouteTransport>,
    step_text: Arc<dyn StepToText>,
    hints: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("hints", &self.hints.lock().len())
            .finish()
    }
}

impl Router {
    pub fn new(config: RouterConfig, transport: Arc<dyn RouteTransport>) -> Self {
        if config.is_demo_server() && !config.suppress_demo_server_warning {
            warn!(
                service_url = %config.service_url,
                "using the public OSRM demo server, which is not suitable for production use"
            );
        }
        let step_text = Arc::new(TemplateStepText::new(&config.language));

        Self {
            config,
            transport,
            step_text,
            hints: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the default localized phrasing.
    pub fn with_step_text(mut self, step_text: Arc<dyn StepToText>) -> Self {
        self.step_text = step_text;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn hint_for(&self, location_key: &str) -> Option<String> {
        self.hints.lock().get(location_key).cloned()
    }

    pub fn hint_count(&self) -> usize {
        self.hints.lock().len()
    }

    /// Build the backend request. Waypoints without a position are skipped.
    pub fn build_request(&self, waypoints: &[Waypoint], options: &RouteOptions) -> RouteRequest {
        let coordinates: Vec<_> = waypoints.iter().filter_map(|wp| wp.position).collect();
        let mut request = RouteRequest::new(coordinates, self.config.profile.clone());

        request.overview = match (options.geometry_only, options.simplify_geometry) {
            (false, _) => Overview::False,
            (true, false) => Overview::Full,
            (true, true) => Overview::Simplified,
        };
        request.precision = self.config.polyline_precision;
        if self.config.use_hints {
            let hints = self.hints.lock();
            request.hints = Some(
                request
                    .coordinates
                    .iter()
                    .map(|c| hints.get(&c.location_key()).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        if options.allow_u_turns {
            request.continue_straight = Some(false);
        }
        request
    }

    /// Compute routes for `waypoints`.
    ///
    /// The waypoints are copied up front, so the caller may keep editing its
    /// own list while the request is in flight.
    pub async fn compute_route(&self, waypoints: &[Waypoint], options: RouteOptions) -> Result<Vec<Route>, RoutingError> {
        let input: Vec<Waypoint> = waypoints.iter().filter(|wp| wp.is_resolved()).cloned().collect();
        let request = self.build_request(&input, &options);

        let response = match tokio::time::timeout(self.config.timeout, self.transport.fetch(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = self.config.timeout.as_millis() as u64, "routing request timed out");
                return Err(RoutingError::Timeout);
            }
        };

        self.route_done(response, input, &options)
    }

    fn route_done(&self, response: OsrmResponse, input: Vec<Waypoint>, options: &RouteOptions) -> Result<Vec<Route>, RoutingError> {
        if response.code != "Ok" {
            return Err(RoutingError::RoutingRejected {
                code: response.code,
                message: response.message.unwrap_or_default(),
            });
        }

        let snapped = snap_waypoints(&input, &response.waypoints);
        let is_simplified = !options.geometry_only || options.simplify_geometry;

        let mut routes = Vec::with_capacity(response.routes.len());
        for (routes_index, raw) in response.routes.iter().enumerate() {
            let mut route = self.convert_route(raw, routes_index)?;
            route.input_waypoints = input.clone();
            route.waypoints = snapped.clone();
            route.is_simplified = is_simplified;
            routes.push(route);
        }
        debug!(routes = routes.len(), "routes decoded");

        self.save_hints(&response.waypoints, &input);
        Ok(routes)
    }

    fn convert_route(&self, raw: &OsrmRoute, routes_index: usize) -> Result<Route, RoutingError> {
        let precision = self.config.polyline_precision;
        let leg_count = raw.legs.len();
        let has_steps = raw.legs.first().is_some_and(|leg| !leg.steps.is_empty());

        let mut geometry = Vec::new();
        let mut instructions = Vec::new();
        let mut waypoint_indices = Vec::new();
        let mut leg_names = Vec::with_capacity(leg_count);

        for (leg_index, leg) in raw.legs.iter().enumerate() {
            leg_names.push(capitalize(&leg.summary));
            for (step_index, step) in leg.steps.iter().enumerate() {
                let step_geometry = polyline::decode(&step.geometry, precision)?;
                let position = StepPosition {
                    leg_index,
                    leg_count,
                    step_index,
                    geometry_index: geometry.len(),
                };

                let kind = step.maneuver.kind.as_str();
                if (leg_index == 0 && kind == "depart") || kind == "arrive" {
                    waypoint_indices.push(position.geometry_index);
                }

                let metrics = StepMetrics {
                    distance_m: step.distance,
                    duration_s: step.duration,
                    road: &step.name,
                    mode: &step.mode,
                };
                let mut instruction = translate(&step.maneuver, metrics, position);
                instruction.text = self.step_text.step_text(&instruction, &position);
                instructions.push(instruction);

                geometry.extend(step_geometry);
            }
        }

        if !has_steps {
            geometry = match &raw.geometry {
                Some(encoded) => polyline::decode(encoded, precision)?,
                None => Vec::new(),
            };
            waypoint_indices.clear();
        }

        Ok(Route {
            name: leg_names.join(", "),
            geometry,
            instructions,
            summary: RouteSummary {
                distance_m: raw.distance,
                duration_s: raw.duration,
            },
            waypoint_indices,
            input_waypoints: Vec::new(),
            waypoints: Vec::new(),
            is_simplified: false,
            routes_index,
        })
    }

    /// Swap in the hints from the latest response in one assignment.
    fn save_hints(&self, snapped: &[OsrmWaypoint], input: &[Waypoint]) {
        let fresh: HashMap<String, String> = snapped
            .iter()
            .zip(input)
            .filter_map(|(via, wp)| Some((wp.position?.location_key(), via.hint.clone()?)))
            .collect();
        *self.hints.lock() = fresh;
    }

    /// Whether a simplified route needs a detailed re-fetch for this view.
    pub fn requires_more_detail(route: &Route, viewport: &Bounds) -> bool {
        route.is_simplified
            && route
                .input_waypoints
                .iter()
                .filter_map(|wp| wp.position)
                .any(|position| !viewport.contains(position))
    }
}

/// Input waypoints moved to their snapped locations, names kept.
fn snap_waypoints(input: &[Waypoint], vias: &[OsrmWaypoint]) -> Vec<Waypoint> {
    vias.iter()
        .zip(input)
        .map(|(via, wp)| Waypoint {
            position: Some(via.coordinate()),
            name: wp.name.clone(),
            options: wp.options,
        })
        .collect()
}
