//! Named locations around the Keasby/Edison yard in New Jersey.
//!
//! Gate and warehouse coordinates match the built-in facility layout; the
//! off-site points are public roads that route with New Jersey OSM data.

use yard_routing::Coordinate;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

// ============================================================================
// Inside the fence
// ============================================================================

pub const ENTRANCE: Location = Location::new("Main Entrance", 40.52089277603273, -74.3238705322726);
pub const EXIT_GATE: Location = Location::new("Exit Gate", 40.52095077401237, -74.33012071183727);
pub const SCALE_ROAD: Location = Location::new("Scale Road", 40.522938276208464, -74.32479685593358);
pub const KEASBY_DOCK: Location = Location::new("Keasby Warehouse", 40.52110811959847, -74.32518090892168);
pub const EDISON_DOCK: Location = Location::new("Edison Warehouse", 40.52077350945153, -74.32823664353462);
pub const YARD: Location = Location::new("Yard", 40.52208284394376, -74.32851733730054);

/// Inside the Keasby box, between the entrance and the scale.
pub const KEASBY_LANE: Location = Location::new("Keasby Lane", 40.5209, -74.3242);

// ============================================================================
// Outside the fence
// ============================================================================

/// Approach road east of the entrance; the default start without GPS.
pub const APPROACH_ROAD: Location = Location::new("Approach Road", 40.52077772489141, -74.32183388092261);
pub const ROUTE_440: Location = Location::new("Route 440 Ramp", 40.5262, -74.3121);
pub const PERTH_AMBOY: Location = Location::new("Perth Amboy", 40.5068, -74.2654);

pub const OFF_SITE: &[Location] = &[APPROACH_ROAD, ROUTE_440, PERTH_AMBOY];
