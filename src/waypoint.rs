//! Coordinates and waypoints used as routing input.

use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Key used to look up per-location data such as snapping hints.
    ///
    /// Rounded to six decimals (roughly 10 cm) so that positions that went
    /// through a float round trip still map to the same entry.
    pub fn location_key(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        crate::geometry::haversine_meters(*self, *other)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(coordinate: Coordinate) -> Self {
        (coordinate.lat, coordinate.lng)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointOptions {
    pub allow_u_turn: bool,
}

/// A named, optionally resolved point.
///
/// `position` stays `None` until the waypoint is placed on the map or
/// resolved by a geocoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Option<Coordinate>,
    pub name: String,
    pub options: WaypointOptions,
}

impl Waypoint {
    pub fn new(position: Coordinate) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn named(position: Coordinate, name: impl Into<String>) -> Self {
        Self {
            position: Some(position),
            name: name.into(),
            options: WaypointOptions::default(),
        }
    }

    /// A placeholder waypoint with no position.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: WaypointOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.position.is_some()
    }
}

impl From<Coordinate> for Waypoint {
    fn from(position: Coordinate) -> Self {
        Waypoint::new(position)
    }
}
