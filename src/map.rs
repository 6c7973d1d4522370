//! The map capability the engine draws on.
//!
//! The renderer itself lives in the host. Components receive a
//! `&mut dyn MapSurface` for the duration of a call and keep only the
//! [`LayerId`]s they were handed back.

use std::collections::BTreeMap;

use crate::geometry::Bounds;
use crate::waypoint::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

/// Stroke style for one polyline layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStyle {
    pub color: String,
    pub opacity: f64,
    pub weight: f64,
    pub dash_array: Option<String>,
}

impl PathStyle {
    pub fn new(color: &str, opacity: f64, weight: f64) -> Self {
        Self {
            color: color.to_string(),
            opacity,
            weight,
            dash_array: None,
        }
    }

    pub fn dashed(mut self, dash_array: &str) -> Self {
        self.dash_array = Some(dash_array.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircleStyle {
    pub radius: f64,
    pub color: String,
    pub fill_color: String,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl Default for CircleStyle {
    fn default() -> Self {
        Self {
            radius: 5.0,
            color: "#03f".to_string(),
            fill_color: "white".to_string(),
            opacity: 1.0,
            fill_opacity: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: Coordinate,
    pub draggable: bool,
    pub title: Option<String>,
}

/// Pixel position or size on the rendered map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

pub trait MapSurface {
    fn add_polyline(&mut self, points: &[Coordinate], style: &PathStyle) -> LayerId;
    fn add_marker(&mut self, marker: &MarkerSpec) -> LayerId;
    fn add_circle_marker(&mut self, center: Coordinate, style: &CircleStyle) -> LayerId;
    fn remove_layer(&mut self, layer: LayerId);
    fn move_marker(&mut self, layer: LayerId, position: Coordinate);
    /// Replace the points of an existing polyline.
    fn set_polyline_points(&mut self, layer: LayerId, points: &[Coordinate]);
    fn fit_bounds(&mut self, bounds: &Bounds);
    fn pan_to(&mut self, center: Coordinate);

    /// `None` while the map has no viewport yet.
    fn viewport_bounds(&self) -> Option<Bounds>;
    fn size(&self) -> ScreenPoint;
    fn project(&self, point: Coordinate) -> Option<ScreenPoint>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Polyline { points: Vec<Coordinate>, style: PathStyle },
    Marker(MarkerSpec),
    Circle { center: Coordinate, style: CircleStyle },
}

/// In-memory surface for headless hosts and tests.
///
/// Projection is linear inside the current viewport, which is enough for
/// visibility checks at yard scale.
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    next_id: u64,
    layers: BTreeMap<LayerId, Layer>,
    viewport: Option<Bounds>,
    size: ScreenPoint,
    fitted: Vec<Bounds>,
    panned: Vec<Coordinate>,
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::new(ScreenPoint { x: 800.0, y: 600.0 })
    }
}

impl HeadlessMap {
    pub fn new(size: ScreenPoint) -> Self {
        Self {
            next_id: 1,
            layers: BTreeMap::new(),
            viewport: None,
            size,
            fitted: Vec::new(),
            panned: Vec::new(),
        }
    }

    pub fn with_viewport(mut self, viewport: Bounds) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = (&LayerId, &Layer)> {
        self.layers.iter()
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&[Coordinate], &PathStyle)> {
        self.layers.values().filter_map(|layer| match layer {
            Layer::Polyline { points, style } => Some((points.as_slice(), style)),
            _ => None,
        })
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.layers.values().filter_map(|layer| match layer {
            Layer::Marker(spec) => Some(spec),
            _ => None,
        })
    }

    pub fn circles(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.layers.values().filter_map(|layer| match layer {
            Layer::Circle { center, .. } => Some(*center),
            _ => None,
        })
    }

    pub fn fitted(&self) -> &[Bounds] {
        &self.fitted
    }

    pub fn panned(&self) -> &[Coordinate] {
        &self.panned
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.insert(id, layer);
        id
    }
}

impl MapSurface for HeadlessMap {
    fn add_polyline(&mut self, points: &[Coordinate], style: &PathStyle) -> LayerId {
        self.insert(Layer::Polyline {
            points: points.to_vec(),
            style: style.clone(),
        })
    }

    fn add_marker(&mut self, marker: &MarkerSpec) -> LayerId {
        self.insert(Layer::Marker(marker.clone()))
    }

    fn add_circle_marker(&mut self, center: Coordinate, style: &CircleStyle) -> LayerId {
        self.insert(Layer::Circle {
            center,
            style: style.clone(),
        })
    }

    fn remove_layer(&mut self, layer: LayerId) {
        self.layers.remove(&layer);
    }

    fn move_marker(&mut self, layer: LayerId, position: Coordinate) {
        if let Some(Layer::Marker(spec)) = self.layers.get_mut(&layer) {
            spec.position = position;
        }
    }

    fn set_polyline_points(&mut self, layer: LayerId, new_points: &[Coordinate]) {
        if let Some(Layer::Polyline { points, .. }) = self.layers.get_mut(&layer) {
            *points = new_points.to_vec();
        }
    }

    fn fit_bounds(&mut self, bounds: &Bounds) {
        self.fitted.push(*bounds);
        self.viewport = Some(*bounds);
    }

    fn pan_to(&mut self, center: Coordinate) {
        self.panned.push(center);
        if let Some(viewport) = self.viewport.as_mut() {
            let current = viewport.center();
            let (dlat, dlng) = (center.lat - current.lat, center.lng - current.lng);
            viewport.south_west = Coordinate::new(viewport.south_west.lat + dlat, viewport.south_west.lng + dlng);
            viewport.north_east = Coordinate::new(viewport.north_east.lat + dlat, viewport.north_east.lng + dlng);
        }
    }

    fn viewport_bounds(&self) -> Option<Bounds> {
        self.viewport
    }

    fn size(&self) -> ScreenPoint {
        self.size
    }

    fn project(&self, point: Coordinate) -> Option<ScreenPoint> {
        let viewport = self.viewport?;
        let width = viewport.north_east.lng - viewport.south_west.lng;
        let height = viewport.north_east.lat - viewport.south_west.lat;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(ScreenPoint {
            x: (point.lng - viewport.south_west.lng) / width * self.size.x,
            y: (viewport.north_east.lat - point.lat) / height * self.size.y,
        })
    }
}
