//! Yard geometry and the rule that picks which waypoints a driver is routed
//! through.
//!
//! Drivers enter through the main entrance. Anyone bound for the Edison side
//! or the yard has to pass the scale road first, and drivers already inside
//! the fence on the Edison side leave through the exit gate. Leaving from
//! the Keasby box goes back past the scale road.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::geometry::point_in_polygon;
use crate::waypoint::{Coordinate, Waypoint};

pub const KEASBY_WAREHOUSE: &str = "Keasby Warehouse";
pub const EXIT: &str = "EXIT";

/// A named closed ring, used for membership tests only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityPolygon {
    pub name: String,
    pub ring: Vec<Coordinate>,
}

impl FacilityPolygon {
    pub fn new(name: impl Into<String>, ring: &[(f64, f64)]) -> Self {
        Self {
            name: name.into(),
            ring: ring.iter().copied().map(Coordinate::from).collect(),
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point_in_polygon(point, &self.ring)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityPoint {
    pub name: String,
    pub position: Coordinate,
}

impl FacilityPoint {
    fn new(name: &str, lat: f64, lng: f64) -> Self {
        Self {
            name: name.to_string(),
            position: Coordinate::new(lat, lng),
        }
    }
}

/// Where the dispatcher sent the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationArea {
    KeasbyWarehouse,
    /// The load shipped and the truck is leaving.
    Exit,
    /// Edison, the yard, or anything else past the scale.
    Other(String),
}

impl DestinationArea {
    pub fn parse(area: &str) -> Self {
        match area {
            KEASBY_WAREHOUSE => Self::KeasbyWarehouse,
            EXIT => Self::Exit,
            other => Self::Other(other.to_string()),
        }
    }
}

/// What is known about the driver when the route is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverAssignment {
    /// Last GPS fix, if any.
    pub position: Option<Coordinate>,
    pub sharing_location: bool,
    /// `None` or `(0, 0)` means no assignment yet.
    pub destination: Option<Coordinate>,
    pub area: DestinationArea,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityLayout {
    pub entrance: Coordinate,
    pub exit: Coordinate,
    pub scale_road: Coordinate,
    /// Start used when the driver has no GPS fix.
    pub default_start: Coordinate,
    pub facility_box: FacilityPolygon,
    pub keasby_box: FacilityPolygon,
    /// Wider zone that counts as having arrived at the facility.
    pub arrival_zone: FacilityPolygon,
    pub destination_center: Coordinate,
    #[serde(default)]
    pub areas: Vec<FacilityPolygon>,
    #[serde(default)]
    pub points: Vec<FacilityPoint>,
}

const FACILITY_BOX: [(f64, f64); 8] = [
    (40.52302959924054, -74.32324877112171),
    (40.523202602650116, -74.32639714054851),
    (40.522228010948794, -74.32654886919558),
    (40.52255095415221, -74.3299172453026),
    (40.51962710810491, -74.3305014006403),
    (40.5191945756738, -74.3267461166252),
    (40.51901579475845, -74.32685232666907),
    (40.51868130020615, -74.32425018037173),
];

// Extends the facility box east over the approach road.
const ARRIVAL_EXTENSION: [(f64, f64); 7] = [
    (40.52066517452486, -74.32373430297169),
    (40.5205556016006, -74.32201976919733),
    (40.51801230609231, -74.32154182395904),
    (40.518219925668284, -74.32056317406513),
    (40.520930455590985, -74.32133699016521),
    (40.52114383308044, -74.32358257414191),
    (40.52298923171724, -74.32334739472645),
];

impl FacilityLayout {
    /// The Keasby/Edison yard.
    pub fn keasby() -> Self {
        let arrival: Vec<(f64, f64)> = FACILITY_BOX.iter().chain(&ARRIVAL_EXTENSION).copied().collect();
        Self {
            entrance: Coordinate::new(40.52089277603273, -74.3238705322726),
            exit: Coordinate::new(40.52092168218135, -74.33031143249039),
            scale_road: Coordinate::new(40.522938276208464, -74.32479685593358),
            default_start: Coordinate::new(40.52077772489141, -74.32183388092261),
            facility_box: FacilityPolygon::new("Facility", &FACILITY_BOX),
            keasby_box: FacilityPolygon::new(
                "Keasby",
                &[
                    (40.52289761332336, -74.32345174168512),
                    (40.52297305038485, -74.32411935775559),
                    (40.51879645258316, -74.32485914853635),
                    (40.51868130020615, -74.32425018037173),
                ],
            ),
            arrival_zone: FacilityPolygon::new("Arrival zone", &arrival),
            destination_center: Coordinate::new(40.52073949391192, -74.32665600727385),
            areas: vec![
                FacilityPolygon::new(
                    "Keasby Warehouse Area",
                    &[
                        (40.522854961560824, -74.32416972109392),
                        (40.523019837006935, -74.32577733084416),
                        (40.51931974045873, -74.32644716824011),
                        (40.51916455501402, -74.32483317908607),
                    ],
                ),
                FacilityPolygon::new(
                    "Edison Warehouse Area",
                    &[
                        (40.5217590144595, -74.32929238246729),
                        (40.521516545867215, -74.3268618296306),
                        (40.51967375590442, -74.32718717922292),
                        (40.51995017762826, -74.32959859384827),
                    ],
                ),
                FacilityPolygon::new(
                    "Yard Area",
                    &[
                        (40.52204720353357, -74.32741745523055),
                        (40.52186889515224, -74.32744452074854),
                        (40.52212435605154, -74.3298104981135),
                        (40.52228894779312, -74.32976538891683),
                    ],
                ),
            ],
            points: vec![
                FacilityPoint::new(KEASBY_WAREHOUSE, 40.52110811959847, -74.32518090892168),
                FacilityPoint::new("Edison Warehouse", 40.52077350945153, -74.32823664353462),
                FacilityPoint::new("Yard", 40.52208284394376, -74.32851733730054),
                FacilityPoint::new("Exit Gate", 40.52095077401237, -74.33012071183727),
                FacilityPoint::new("Employee Parking", 40.51900382485979, -74.32548866567979),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_in_facility_box(&self, point: Coordinate) -> bool {
        self.facility_box.contains(point)
    }

    pub fn is_in_keasby_box(&self, point: Coordinate) -> bool {
        self.keasby_box.contains(point)
    }

    pub fn has_arrived(&self, point: Coordinate) -> bool {
        self.arrival_zone.contains(point)
    }

    /// First named area containing `point`.
    pub fn area_at(&self, point: Coordinate) -> Option<&FacilityPolygon> {
        self.areas.iter().find(|area| area.contains(point))
    }

    pub fn point(&self, name: &str) -> Option<Coordinate> {
        self.points.iter().find(|point| point.name == name).map(|point| point.position)
    }

    /// Ordered stops to route the driver through.
    pub fn waypoint_sequence(&self, assignment: &DriverAssignment) -> Vec<Coordinate> {
        let start = assignment.position.unwrap_or(self.default_start);
        let destination = match assignment.destination {
            Some(destination) if destination.lat != 0.0 || destination.lng != 0.0 => destination,
            _ => return vec![start, self.entrance],
        };

        if !assignment.sharing_location || !self.is_in_facility_box(start) {
            return match assignment.area {
                DestinationArea::KeasbyWarehouse => vec![start, self.entrance, destination],
                _ => vec![start, self.entrance, self.scale_road, destination],
            };
        }

        let in_keasby = self.is_in_keasby_box(start);
        match (&assignment.area, in_keasby) {
            (DestinationArea::Exit, true) => vec![start, self.scale_road, destination],
            (DestinationArea::Exit, false) => vec![start, self.exit, self.entrance, destination],
            (DestinationArea::KeasbyWarehouse, true) => vec![start, destination],
            (DestinationArea::KeasbyWarehouse, false) => vec![start, self.exit, self.entrance, destination],
            (DestinationArea::Other(_), true) => vec![start, self.scale_road, destination],
            (DestinationArea::Other(_), false) => vec![start, destination],
        }
    }

    /// [`Self::waypoint_sequence`] as plan input.
    pub fn waypoints(&self, assignment: &DriverAssignment) -> Vec<Waypoint> {
        self.waypoint_sequence(assignment).into_iter().map(Waypoint::new).collect()
    }
}

impl Default for FacilityLayout {
    fn default() -> Self {
        Self::keasby()
    }
}
