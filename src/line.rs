//! Drawing a route on the map and mapping touches back to waypoints.

use crate::geometry::{Bounds, closest_point_index};
use crate::map::{LayerId, MapSurface, PathStyle};
use crate::route::Route;
use crate::waypoint::Coordinate;

#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    /// Drawn bottom to top.
    pub styles: Vec<PathStyle>,
    pub missing_route_styles: Vec<PathStyle>,
    /// Whether touching the line may spawn a waypoint.
    pub add_waypoints: bool,
    /// Draw dashed gaps from input waypoints to where the route starts.
    pub extend_to_waypoints: bool,
    /// Gap in meters below which no dashed segment is drawn.
    pub missing_route_tolerance: f64,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            styles: vec![
                PathStyle::new("black", 0.15, 9.0),
                PathStyle::new("white", 0.8, 6.0),
                PathStyle::new("red", 1.0, 2.0),
            ],
            missing_route_styles: vec![
                PathStyle::new("black", 0.15, 7.0),
                PathStyle::new("white", 0.6, 4.0),
                PathStyle::new("gray", 0.8, 2.0).dashed("7,12"),
            ],
            add_waypoints: true,
            extend_to_waypoints: true,
            missing_route_tolerance: 10.0,
        }
    }
}

impl LineOptions {
    /// Styling for an unselected alternative.
    pub fn alternative() -> Self {
        Self {
            styles: vec![
                PathStyle::new("black", 0.15, 9.0),
                PathStyle::new("white", 0.8, 6.0),
                PathStyle::new("blue", 0.5, 2.0),
            ],
            add_waypoints: false,
            extend_to_waypoints: false,
            ..Self::default()
        }
    }
}

/// A pointer-down on the route line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTouched {
    /// Last waypoint at or before the touched point; `None` when the touch
    /// lies before the first waypoint's offset.
    pub after_index: Option<usize>,
    pub position: Coordinate,
}

impl LineTouched {
    /// Where a waypoint spawned from this touch is inserted.
    pub fn insertion_index(&self) -> usize {
        self.after_index.map_or(0, |index| index + 1)
    }
}

#[derive(Debug, Clone)]
pub struct RouteLine {
    routes_index: usize,
    geometry: Vec<Coordinate>,
    waypoint_indices: Vec<usize>,
    add_waypoints: bool,
    route_layers: Vec<LayerId>,
    gap_layers: Vec<LayerId>,
    gap_count: usize,
}

impl RouteLine {
    pub fn draw(route: &Route, options: &LineOptions, map: &mut dyn MapSurface) -> Self {
        let waypoint_indices = if route.waypoint_indices.is_empty() {
            find_waypoint_indices(route)
        } else {
            route.waypoint_indices.clone()
        };

        let mut line = Self {
            routes_index: route.routes_index,
            geometry: route.geometry.clone(),
            waypoint_indices,
            add_waypoints: options.add_waypoints,
            route_layers: Vec::new(),
            gap_layers: Vec::new(),
            gap_count: 0,
        };

        if options.extend_to_waypoints {
            line.draw_gaps(route, options, map);
        }
        for style in &options.styles {
            line.route_layers.push(map.add_polyline(&line.geometry, style));
        }
        line
    }

    fn draw_gaps(&mut self, route: &Route, options: &LineOptions, map: &mut dyn MapSurface) {
        let segments: Vec<[Coordinate; 2]> = route
            .input_waypoints
            .iter()
            .zip(&self.waypoint_indices)
            .filter_map(|(waypoint, index)| {
                let position = waypoint.position?;
                let route_point = *self.geometry.get(*index)?;
                (position.distance_to(&route_point) > options.missing_route_tolerance)
                    .then_some([position, route_point])
            })
            .collect();

        for segment in segments {
            self.gap_count += 1;
            for style in &options.missing_route_styles {
                self.gap_layers.push(map.add_polyline(&segment, style));
            }
        }
    }

    pub fn routes_index(&self) -> usize {
        self.routes_index
    }

    pub fn waypoint_indices(&self) -> &[usize] {
        &self.waypoint_indices
    }

    /// Waypoints drawn with a dashed connector to the route.
    pub fn gap_count(&self) -> usize {
        self.gap_count
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.geometry)
    }

    /// Whether `layer` is one of the touchable route strokes.
    pub fn owns(&self, layer: LayerId) -> bool {
        self.route_layers.contains(&layer)
    }

    /// Translate a pointer-down at `position` into an insertion point.
    pub fn touch(&self, position: Coordinate) -> Option<LineTouched> {
        let touched = closest_point_index(position, &self.geometry)?;
        let after_index = self.waypoint_indices.iter().rposition(|offset| *offset <= touched);
        Some(LineTouched { after_index, position })
    }

    pub fn accepts_new_waypoints(&self) -> bool {
        self.add_waypoints
    }

    pub fn remove(self, map: &mut dyn MapSurface) {
        for layer in self.route_layers.into_iter().chain(self.gap_layers) {
            map.remove_layer(layer);
        }
    }
}

fn find_waypoint_indices(route: &Route) -> Vec<usize> {
    route
        .input_waypoints
        .iter()
        .map(|waypoint| {
            waypoint
                .position
                .and_then(|position| closest_point_index(position, &route.geometry))
                .unwrap_or(0)
        })
        .collect()
}
