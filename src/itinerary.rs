//! View model for the list of alternative routes and their turn rows.
//!
//! The host renders [`AlternativeView`]s however it likes and reports row
//! interaction back through `hover_row`, `leave_row` and `click_row`.

use crate::events::Signal;
use crate::formatter::{Formatter, RouteFormatter};
use crate::localization::render_template;
use crate::map::{CircleStyle, LayerId, MapSurface};
use crate::route::Route;
use crate::waypoint::Coordinate;

#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryOptions {
    /// Marker shown while a row is hovered. `None` disables it.
    pub point_marker_style: Option<CircleStyle>,
    /// Placeholders: `{name}`, `{distance}`, `{time}`.
    pub summary_template: String,
    pub total_distance_rounding_sensitivity: Option<i32>,
    pub show: bool,
}

impl Default for ItineraryOptions {
    fn default() -> Self {
        Self {
            point_marker_style: Some(CircleStyle::default()),
            summary_template: "{name}: {distance}, {time}".to_string(),
            total_distance_rounding_sensitivity: Some(-1),
            show: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnRow {
    pub text: String,
    pub distance: String,
    pub icon: &'static str,
    /// Where the maneuver happens on the route geometry.
    pub position: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeView {
    pub routes_index: usize,
    pub name: String,
    pub distance: String,
    pub time: String,
    pub summary: String,
    pub minimized: bool,
    pub rows: Vec<TurnRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItineraryEvent {
    RouteSelected { routes_index: usize },
}

pub struct Itinerary {
    options: ItineraryOptions,
    formatter: Box<dyn RouteFormatter>,
    alternatives: Vec<AlternativeView>,
    hover_marker: Option<LayerId>,
    visible: bool,
    events: Signal<ItineraryEvent>,
}

impl std::fmt::Debug for Itinerary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Itinerary")
            .field("options", &self.options)
            .field("alternatives", &self.alternatives)
            .field("visible", &self.visible)
            .finish()
    }
}

impl Default for Itinerary {
    fn default() -> Self {
        Self::new(ItineraryOptions::default())
    }
}

impl Itinerary {
    pub fn new(options: ItineraryOptions) -> Self {
        let visible = options.show;
        Self {
            options,
            formatter: Box::new(Formatter::default()),
            alternatives: Vec::new(),
            hover_marker: None,
            visible,
            events: Signal::new(),
        }
    }

    pub fn with_formatter(mut self, formatter: impl RouteFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn events(&mut self) -> &mut Signal<ItineraryEvent> {
        &mut self.events
    }

    pub fn alternatives(&self) -> &[AlternativeView] {
        &self.alternatives
    }

    /// The expanded alternative.
    pub fn selected(&self) -> Option<&AlternativeView> {
        self.alternatives.iter().find(|alt| !alt.minimized)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Rebuild the panel for `routes`, expanding the first one.
    pub fn set_alternatives(&mut self, routes: &[Route], map: &mut dyn MapSurface) {
        self.alternatives = routes
            .iter()
            .enumerate()
            .map(|(position, route)| self.alternative_view(route, position > 0))
            .collect();

        if let Some(first) = self.alternatives.first() {
            let routes_index = first.routes_index;
            self.clear_hover(map);
            self.events.emit(&ItineraryEvent::RouteSelected { routes_index });
        }
    }

    /// Expand the alternative for `routes_index` and minimize the rest.
    pub fn select(&mut self, routes_index: usize, map: &mut dyn MapSurface) -> bool {
        if !self.alternatives.iter().any(|alt| alt.routes_index == routes_index) {
            return false;
        }
        for alt in &mut self.alternatives {
            alt.minimized = alt.routes_index != routes_index;
        }
        self.clear_hover(map);
        self.events.emit(&ItineraryEvent::RouteSelected { routes_index });
        true
    }

    pub fn hover_row(&mut self, alternative: usize, row: usize, map: &mut dyn MapSurface) {
        let Some(position) = self.row_position(alternative, row) else {
            return;
        };
        let Some(style) = self.options.point_marker_style.clone() else {
            return;
        };
        self.clear_hover(map);
        self.hover_marker = Some(map.add_circle_marker(position, &style));
    }

    pub fn leave_row(&mut self, map: &mut dyn MapSurface) {
        self.clear_hover(map);
    }

    pub fn click_row(&mut self, alternative: usize, row: usize, map: &mut dyn MapSurface) {
        if let Some(position) = self.row_position(alternative, row) {
            map.pan_to(position);
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn clear(&mut self, map: &mut dyn MapSurface) {
        self.alternatives.clear();
        self.clear_hover(map);
    }

    fn row_position(&self, alternative: usize, row: usize) -> Option<Coordinate> {
        self.alternatives.get(alternative)?.rows.get(row)?.position
    }

    fn clear_hover(&mut self, map: &mut dyn MapSurface) {
        if let Some(marker) = self.hover_marker.take() {
            map.remove_layer(marker);
        }
    }

    fn alternative_view(&self, route: &Route, minimized: bool) -> AlternativeView {
        let formatter = &self.formatter;
        let distance = formatter.format_distance(
            route.summary.distance_m,
            self.options.total_distance_rounding_sensitivity,
        );
        let time = formatter.format_time(route.summary.duration_s);
        let summary = render_template(
            &self.options.summary_template,
            &[
                ("name", route.name.as_str()),
                ("distance", distance.as_str()),
                ("time", time.as_str()),
            ],
        );

        let rows = route
            .instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| TurnRow {
                text: formatter.format_instruction(instruction, index),
                distance: formatter.format_distance(instruction.distance_m, None),
                icon: formatter.icon_name(instruction, index),
                position: route.geometry.get(instruction.geometry_index).copied(),
            })
            .collect();

        AlternativeView {
            routes_index: route.routes_index,
            name: route.name.clone(),
            distance,
            time,
            summary,
            minimized,
            rows,
        }
    }
}
