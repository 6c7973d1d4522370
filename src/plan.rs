//! The ordered waypoint list and its markers.
//!
//! A plan always holds at least two waypoints; missing ends are padded with
//! empty placeholders. Every mutation goes through [`Plan::splice`], which
//! rebuilds the markers and emits the change events.

use futures::future::BoxFuture;
use tracing::debug;

use crate::events::Signal;
use crate::line::LineTouched;
use crate::map::{LayerId, MapSurface, MarkerSpec, PathStyle};
use crate::waypoint::{Coordinate, Waypoint};

const MIN_WAYPOINTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct PlanOptions {
    pub draggable_waypoints: bool,
    /// Insert a touched-line waypoint immediately instead of previewing it.
    pub route_while_dragging: bool,
    pub add_waypoints: bool,
    pub reverse_waypoints: bool,
    /// Strokes of the preview drawn while a new waypoint is dragged off the line.
    pub drag_styles: Vec<PathStyle>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            draggable_waypoints: false,
            route_while_dragging: false,
            add_waypoints: false,
            reverse_waypoints: false,
            drag_styles: vec![
                PathStyle::new("black", 0.15, 9.0),
                PathStyle::new("white", 0.8, 6.0),
                PathStyle::new("red", 1.0, 2.0).dashed("7,12"),
            ],
        }
    }
}

/// Decides which waypoints get a marker and how it looks.
pub trait MarkerFactory: Send + Sync {
    fn create(&self, index: usize, waypoint: &Waypoint, count: usize) -> Option<MarkerSpec>;
}

/// One marker per positioned waypoint, titled with its name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMarkers;

impl MarkerFactory for DefaultMarkers {
    fn create(&self, _index: usize, waypoint: &Waypoint, _count: usize) -> Option<MarkerSpec> {
        let position = waypoint.position?;
        Some(MarkerSpec {
            position,
            draggable: true,
            title: (!waypoint.name.is_empty()).then(|| waypoint.name.clone()),
        })
    }
}

/// Hides waypoint markers entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMarkers;

impl MarkerFactory for NoMarkers {
    fn create(&self, _index: usize, _waypoint: &Waypoint, _count: usize) -> Option<MarkerSpec> {
        None
    }
}

/// Reverse geocoding used to name dropped pins.
pub trait Geocoder: Send + Sync {
    fn reverse<'a>(&'a self, position: Coordinate) -> BoxFuture<'a, Option<String>>;
}

/// A pending reverse lookup. Owns the position, so the plan stays free
/// while the geocoder runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeTicket {
    index: usize,
    position: Coordinate,
}

impl GeocodeTicket {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub async fn run(self, geocoder: &dyn Geocoder) -> GeocodeOutcome {
        GeocodeOutcome {
            index: self.index,
            position: self.position,
            name: geocoder.reverse(self.position).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeOutcome {
    pub index: usize,
    pub position: Coordinate,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    WaypointsChanged { waypoints: Vec<Waypoint> },
    WaypointsSpliced { index: usize, removed: usize, added: Vec<Waypoint> },
    WaypointDragStart { index: usize, position: Coordinate },
    WaypointDrag { index: usize, position: Coordinate },
    WaypointDragEnd { index: usize, position: Coordinate },
    WaypointGeocoded { index: usize, waypoint: Waypoint },
}

/// Outcome of touching the route line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewWaypoint {
    /// Spliced in right away at this index.
    Inserted(usize),
    /// Previewed; it lands at this index on [`Plan::drop_new_waypoint`].
    Preview(usize),
}

#[derive(Debug)]
struct NewWaypointPreview {
    index: usize,
    marker: Option<LayerId>,
    lines: Vec<LayerId>,
    anchors: (Option<Coordinate>, Option<Coordinate>),
}

pub struct Plan {
    waypoints: Vec<Waypoint>,
    options: PlanOptions,
    marker_factory: Box<dyn MarkerFactory>,
    markers: Vec<Option<LayerId>>,
    attached: bool,
    preview: Option<NewWaypointPreview>,
    events: Signal<PlanEvent>,
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("waypoints", &self.waypoints)
            .field("options", &self.options)
            .field("markers", &self.markers)
            .field("attached", &self.attached)
            .finish()
    }
}

impl Plan {
    pub fn new(waypoints: Vec<Waypoint>, options: PlanOptions) -> Self {
        let mut plan = Self {
            waypoints,
            options,
            marker_factory: Box::new(DefaultMarkers),
            markers: Vec::new(),
            attached: false,
            preview: None,
            events: Signal::new(),
        };
        plan.pad();
        plan
    }

    pub fn with_marker_factory(mut self, factory: impl MarkerFactory + 'static) -> Self {
        self.marker_factory = Box::new(factory);
        self
    }

    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    pub fn events(&mut self) -> &mut Signal<PlanEvent> {
        &mut self.events
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false once constructed.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Every waypoint has a position.
    pub fn is_ready(&self) -> bool {
        self.waypoints.iter().all(Waypoint::is_resolved)
    }

    /// Start drawing markers on `map`.
    pub fn attach(&mut self, map: &mut dyn MapSurface) {
        self.attached = true;
        self.update_markers(map);
    }

    /// Remove everything this plan drew.
    pub fn detach(&mut self, map: &mut dyn MapSurface) {
        self.remove_markers(map);
        self.clear_preview(map);
        self.attached = false;
    }

    /// Waypoint index of a marker layer.
    pub fn marker_index(&self, layer: LayerId) -> Option<usize> {
        self.markers.iter().position(|marker| *marker == Some(layer))
    }

    /// Remove `removed` waypoints at `index` and insert `added` in their place.
    ///
    /// Out-of-range arguments are clamped. Returns the removed waypoints.
    pub fn splice(&mut self, index: usize, removed: usize, added: Vec<Waypoint>, map: &mut dyn MapSurface) -> Vec<Waypoint> {
        let index = index.min(self.waypoints.len());
        let end = index.saturating_add(removed).min(self.waypoints.len());
        let taken: Vec<Waypoint> = self.waypoints.splice(index..end, added.iter().cloned()).collect();
        let padded = self.pad();

        self.update_markers(map);
        self.events.emit(&PlanEvent::WaypointsChanged {
            waypoints: self.waypoints.clone(),
        });
        self.events.emit(&PlanEvent::WaypointsSpliced {
            index,
            removed: taken.len(),
            added,
        });
        for at in padded {
            self.events.emit(&PlanEvent::WaypointsSpliced {
                index: at,
                removed: 0,
                added: vec![Waypoint::empty()],
            });
        }
        taken
    }

    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>, map: &mut dyn MapSurface) -> Vec<Waypoint> {
        let len = self.waypoints.len();
        self.splice(0, len, waypoints, map)
    }

    /// Append an empty waypoint for the user to fill in.
    pub fn add_waypoint(&mut self, map: &mut dyn MapSurface) {
        let len = self.waypoints.len();
        self.splice(len, 0, vec![Waypoint::empty()], map);
    }

    pub fn reverse_waypoints(&mut self, map: &mut dyn MapSurface) {
        let mut reversed = self.waypoints.clone();
        reversed.reverse();
        self.set_waypoints(reversed, map);
    }

    /// Delete a waypoint. The start of a two-waypoint plan is emptied
    /// rather than removed.
    pub fn remove_waypoint(&mut self, index: usize, map: &mut dyn MapSurface) -> Option<Waypoint> {
        if index >= self.waypoints.len() {
            return None;
        }
        let replacement = if index > 0 || self.waypoints.len() > MIN_WAYPOINTS {
            Vec::new()
        } else {
            vec![Waypoint::empty()]
        };
        self.splice(index, 1, replacement, map).into_iter().next()
    }

    /// Store a geocoder result for `index`.
    pub fn geocoded(&mut self, index: usize, waypoint: Waypoint, map: &mut dyn MapSurface) -> bool {
        let Some(slot) = self.waypoints.get_mut(index) else {
            return false;
        };
        *slot = waypoint.clone();
        self.update_markers(map);
        self.events.emit(&PlanEvent::WaypointsChanged {
            waypoints: self.waypoints.clone(),
        });
        self.events.emit(&PlanEvent::WaypointGeocoded { index, waypoint });
        true
    }

    /// Start naming the waypoint at `index` from a reverse lookup of its
    /// position. `None` when the waypoint is not placed.
    pub fn reverse_geocode(&self, index: usize) -> Option<GeocodeTicket> {
        let position = self.waypoints.get(index)?.position?;
        Some(GeocodeTicket { index, position })
    }

    /// Apply a finished lookup. The name is dropped when the waypoint has
    /// moved since the lookup was issued.
    pub fn finish_geocode(&mut self, outcome: GeocodeOutcome) -> Option<String> {
        let GeocodeOutcome { index, position, name } = outcome;
        let Some(name) = name else {
            debug!(index, "reverse geocoding found no name");
            return None;
        };

        let waypoint = self.waypoints.get_mut(index)?;
        let key = position.location_key();
        if !waypoint.position.is_some_and(|current| current.location_key() == key) {
            debug!(index, %key, "discarding name for a moved waypoint");
            return None;
        }
        waypoint.name = name.clone();
        let waypoint = waypoint.clone();
        self.events.emit(&PlanEvent::WaypointGeocoded { index, waypoint });
        Some(name)
    }

    pub fn drag_start(&mut self, index: usize) -> bool {
        let Some(position) = self.waypoints.get(index).and_then(|wp| wp.position) else {
            return false;
        };
        self.events.emit(&PlanEvent::WaypointDragStart { index, position });
        true
    }

    /// Live position while a marker is dragged.
    pub fn drag(&mut self, index: usize, position: Coordinate, map: &mut dyn MapSurface) -> bool {
        let Some(waypoint) = self.waypoints.get_mut(index) else {
            return false;
        };
        waypoint.position = Some(position);
        if let Some(Some(marker)) = self.markers.get(index) {
            map.move_marker(*marker, position);
        }
        self.events.emit(&PlanEvent::WaypointDrag { index, position });
        true
    }

    /// Drop the marker. The old name no longer describes the new spot.
    pub fn drag_end(&mut self, index: usize, position: Coordinate, map: &mut dyn MapSurface) -> bool {
        let Some(waypoint) = self.waypoints.get_mut(index) else {
            return false;
        };
        waypoint.position = Some(position);
        waypoint.name.clear();
        if let Some(Some(marker)) = self.markers.get(index) {
            map.move_marker(*marker, position);
        }
        self.events.emit(&PlanEvent::WaypointDragEnd { index, position });
        self.events.emit(&PlanEvent::WaypointsChanged {
            waypoints: self.waypoints.clone(),
        });
        true
    }

    /// Spawn a waypoint from a touch on the route line.
    pub fn drag_new_waypoint(&mut self, touched: &LineTouched, map: &mut dyn MapSurface) -> NewWaypoint {
        let index = touched.insertion_index().max(1).min(self.waypoints.len());
        if self.options.route_while_dragging {
            self.splice(index, 0, vec![Waypoint::new(touched.position)], map);
            return NewWaypoint::Inserted(index);
        }

        self.clear_preview(map);
        let previous = self.waypoints.get(index - 1).and_then(|wp| wp.position);
        let next = self.waypoints.get(index).and_then(|wp| wp.position);
        let marker = self
            .marker_factory
            .create(index, &Waypoint::new(touched.position), self.waypoints.len() + 1)
            .map(|spec| map.add_marker(&spec));

        let mut preview = NewWaypointPreview {
            index,
            marker,
            lines: Vec::new(),
            anchors: (previous, next),
        };
        let points = preview.points(touched.position);
        for style in &self.options.drag_styles {
            preview.lines.push(map.add_polyline(&points, style));
        }
        self.preview = Some(preview);
        NewWaypoint::Preview(index)
    }

    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Follow the pointer with the new-waypoint preview.
    pub fn move_new_waypoint(&mut self, position: Coordinate, map: &mut dyn MapSurface) -> bool {
        let Some(preview) = self.preview.as_ref() else {
            return false;
        };
        if let Some(marker) = preview.marker {
            map.move_marker(marker, position);
        }
        let points = preview.points(position);
        for line in &preview.lines {
            map.set_polyline_points(*line, &points);
        }
        true
    }

    /// Release the preview and insert the waypoint where it was dropped.
    pub fn drop_new_waypoint(&mut self, position: Coordinate, map: &mut dyn MapSurface) -> Option<usize> {
        let index = self.preview.as_ref()?.index;
        self.clear_preview(map);
        self.splice(index, 0, vec![Waypoint::new(position)], map);
        Some(index)
    }

    fn clear_preview(&mut self, map: &mut dyn MapSurface) {
        if let Some(preview) = self.preview.take() {
            for layer in preview.marker.into_iter().chain(preview.lines) {
                map.remove_layer(layer);
            }
        }
    }

    /// Returns the indices of the placeholders that were appended.
    fn pad(&mut self) -> Vec<usize> {
        let mut padded = Vec::new();
        while self.waypoints.len() < MIN_WAYPOINTS {
            padded.push(self.waypoints.len());
            self.waypoints.push(Waypoint::empty());
        }
        padded
    }

    fn remove_markers(&mut self, map: &mut dyn MapSurface) {
        for marker in self.markers.drain(..).flatten() {
            map.remove_layer(marker);
        }
    }

    fn update_markers(&mut self, map: &mut dyn MapSurface) {
        if !self.attached {
            return;
        }
        self.remove_markers(map);

        let count = self.waypoints.len();
        for (index, waypoint) in self.waypoints.iter().enumerate() {
            let marker = self.marker_factory.create(index, waypoint, count).map(|mut spec| {
                spec.draggable &= self.options.draggable_waypoints;
                map.add_marker(&spec)
            });
            self.markers.push(marker);
        }
    }
}

impl NewWaypointPreview {
    fn points(&self, position: Coordinate) -> Vec<Coordinate> {
        let (previous, next) = self.anchors;
        previous.into_iter().chain(Some(position)).chain(next).collect()
    }
}
