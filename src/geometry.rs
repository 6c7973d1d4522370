//! Shared geometry helpers: great-circle distance, polygon membership and
//! bounding boxes.
//!
//! Both the facility waypoint rules and the arrival check go through these
//! functions so the two never disagree about where the yard is.

use serde::{Deserialize, Serialize};

use crate::waypoint::Coordinate;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
pub fn haversine_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Ray-casting membership test against a closed ring of vertices.
///
/// The ring is implicitly closed (last vertex connects to the first).
/// Points exactly on an edge may land on either side.
pub fn point_in_polygon(point: Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut previous = ring[ring.len() - 1];
    for &current in ring {
        let crosses = (current.lat > point.lat) != (previous.lat > point.lat);
        if crosses {
            let edge_lng = (previous.lng - current.lng) * (point.lat - current.lat)
                / (previous.lat - current.lat)
                + current.lng;
            if point.lng < edge_lng {
                inside = !inside;
            }
        }
        previous = current;
    }
    inside
}

/// Index of the coordinate in `line` closest to `point`.
///
/// Ties resolve to the lowest index. Returns `None` for an empty line.
pub fn closest_point_index(point: Coordinate, line: &[Coordinate]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in line.iter().enumerate() {
        let distance = haversine_meters(point, *candidate);
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

/// Axis-aligned lat/lng box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    pub fn new(a: Coordinate, b: Coordinate) -> Self {
        Self {
            south_west: Coordinate::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: Coordinate::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Bounds::new(first, first);
        for point in iter {
            bounds.extend(*point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: Coordinate) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}
