//! Computed routes and the set of alternatives returned together.

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;
use crate::instructions::Instruction;
use crate::waypoint::{Coordinate, Waypoint};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
}

/// One complete path as returned by a single computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Leg summaries joined with `", "`.
    pub name: String,
    pub geometry: Vec<Coordinate>,
    pub instructions: Vec<Instruction>,
    pub summary: RouteSummary,
    /// Offsets into `geometry` for each input waypoint.
    ///
    /// Empty when the response carried no steps; consumers fall back to a
    /// closest-point search.
    pub waypoint_indices: Vec<usize>,
    pub input_waypoints: Vec<Waypoint>,
    /// Input waypoints moved to where the backend snapped them.
    pub waypoints: Vec<Waypoint>,
    pub is_simplified: bool,
    /// Position of this route in the backend response.
    pub routes_index: usize,
}

impl Route {
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.geometry)
    }
}

/// A selected route plus its alternatives, replaced as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSet {
    routes: Vec<Route>,
    selected: usize,
}

impl RouteSet {
    /// Returns `None` when the computation produced no routes.
    pub fn new(routes: Vec<Route>) -> Option<Self> {
        Self::with_selected(routes, 0)
    }

    pub fn with_selected(routes: Vec<Route>, selected: usize) -> Option<Self> {
        if selected >= routes.len() {
            return None;
        }
        Some(Self { routes, selected })
    }

    pub fn selected(&self) -> &Route {
        &self.routes[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .enumerate()
            .filter(move |(index, _)| *index != self.selected)
            .map(|(_, route)| route)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Change the selection without touching the routes.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.routes.len() {
            return false;
        }
        self.selected = index;
        true
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
