//! yard-routing
//!
//! Turn-by-turn routing for the driver portal: talks to an OSRM-compatible
//! backend, turns responses into routes and instructions, and keeps a map
//! surface, a waypoint plan and an itinerary panel in step with each other.

pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod facility;
pub mod formatter;
pub mod geometry;
pub mod instructions;
pub mod itinerary;
pub mod line;
pub mod localization;
pub mod map;
pub mod osrm;
pub mod plan;
pub mod polyline;
pub mod route;
pub mod router;
pub mod waypoint;

pub use config::RouterConfig;
pub use control::{Control, ControlEvent, ControlOptions, RouteTicket};
pub use error::RoutingError;
pub use facility::FacilityLayout;
pub use route::{Route, RouteSet};
pub use router::{RouteOptions, Router};
pub use waypoint::{Coordinate, Waypoint};
