//! Translation of OSRM maneuvers into typed turn instructions.
//!
//! Kind and modifier derivation are pure functions of the maneuver and the
//! step's position in the route; text is produced afterwards by a
//! [`StepToText`] implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::localization::Localization;

/// Maneuver descriptor as sent by the routing backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub bearing_after: f64,
    #[serde(default)]
    pub exit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionKind {
    Head,
    Continue,
    Roundabout,
    Merge,
    Fork,
    OnRamp,
    OffRamp,
    EndOfRoad,
    WaypointReached,
    DestinationReached,
    BearRight,
    TurnRight,
    SharpRight,
    UTurn,
    SharpLeft,
    TurnLeft,
    BearLeft,
}

impl InstructionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionKind::Head => "Head",
            InstructionKind::Continue => "Continue",
            InstructionKind::Roundabout => "Roundabout",
            InstructionKind::Merge => "Merge",
            InstructionKind::Fork => "Fork",
            InstructionKind::OnRamp => "OnRamp",
            InstructionKind::OffRamp => "OffRamp",
            InstructionKind::EndOfRoad => "EndOfRoad",
            InstructionKind::WaypointReached => "WaypointReached",
            InstructionKind::DestinationReached => "DestinationReached",
            InstructionKind::BearRight => "BearRight",
            InstructionKind::TurnRight => "TurnRight",
            InstructionKind::SharpRight => "SharpRight",
            InstructionKind::UTurn => "UTurn",
            InstructionKind::SharpLeft => "SharpLeft",
            InstructionKind::TurnLeft => "TurnLeft",
            InstructionKind::BearLeft => "BearLeft",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maneuver modifier, camel-cased from the backend vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Straight,
    SlightRight,
    Right,
    SharpRight,
    Uturn,
    SharpLeft,
    Left,
    SlightLeft,
}

impl Modifier {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "straight" => Some(Modifier::Straight),
            "slight right" => Some(Modifier::SlightRight),
            "right" => Some(Modifier::Right),
            "sharp right" => Some(Modifier::SharpRight),
            "uturn" | "turnaround" => Some(Modifier::Uturn),
            "sharp left" => Some(Modifier::SharpLeft),
            "left" => Some(Modifier::Left),
            "slight left" => Some(Modifier::SlightLeft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Straight => "Straight",
            Modifier::SlightRight => "SlightRight",
            Modifier::Right => "Right",
            Modifier::SharpRight => "SharpRight",
            Modifier::Uturn => "Uturn",
            Modifier::SharpLeft => "SharpLeft",
            Modifier::Left => "Left",
            Modifier::SlightLeft => "SlightLeft",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassDirection {
    const ALL: [CompassDirection; 8] = [
        CompassDirection::N,
        CompassDirection::NE,
        CompassDirection::E,
        CompassDirection::SE,
        CompassDirection::S,
        CompassDirection::SW,
        CompassDirection::W,
        CompassDirection::NW,
    ];

    /// Octant for a bearing in degrees clockwise from north.
    pub fn from_bearing(bearing: f64) -> Self {
        let octant = ((bearing / 45.0).round() as i64).rem_euclid(8);
        Self::ALL[octant as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompassDirection::N => "N",
            CompassDirection::NE => "NE",
            CompassDirection::E => "E",
            CompassDirection::SE => "SE",
            CompassDirection::S => "S",
            CompassDirection::SW => "SW",
            CompassDirection::W => "W",
            CompassDirection::NW => "NW",
        }
    }
}

/// One maneuver step along a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub modifier: Option<Modifier>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub road: String,
    pub direction: CompassDirection,
    pub exit: Option<u32>,
    /// Offset of the maneuver point in the route's concatenated geometry.
    pub geometry_index: usize,
    pub mode: String,
    pub text: String,
}

/// Where a step sits in the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPosition {
    pub leg_index: usize,
    pub leg_count: usize,
    /// Index of the step within its leg.
    pub step_index: usize,
    pub geometry_index: usize,
}

impl StepPosition {
    pub fn is_first_step(&self) -> bool {
        self.leg_index == 0 && self.step_index == 0
    }

    pub fn is_last_leg(&self) -> bool {
        self.leg_index + 1 >= self.leg_count
    }
}

/// Step metrics carried over into the instruction unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepMetrics<'a> {
    pub distance_m: f64,
    pub duration_s: f64,
    pub road: &'a str,
    pub mode: &'a str,
}

pub fn instruction_kind(maneuver: &Maneuver, position: &StepPosition) -> InstructionKind {
    match maneuver.kind.as_str() {
        "depart" if position.is_first_step() => InstructionKind::Head,
        "depart" => InstructionKind::Continue,
        "arrive" if position.is_last_leg() => InstructionKind::DestinationReached,
        "arrive" => InstructionKind::WaypointReached,
        "roundabout" | "rotary" => InstructionKind::Roundabout,
        "merge" => InstructionKind::Merge,
        "fork" => InstructionKind::Fork,
        "on ramp" => InstructionKind::OnRamp,
        "off ramp" => InstructionKind::OffRamp,
        "end of road" => InstructionKind::EndOfRoad,
        _ => kind_from_modifier(maneuver.modifier.as_deref()),
    }
}

pub fn instruction_modifier(maneuver: &Maneuver) -> Option<Modifier> {
    let raw = maneuver.modifier.as_deref()?;
    match maneuver.kind.as_str() {
        "merge" | "fork" | "on ramp" | "off ramp" | "end of road" => {
            if raw.contains("left") {
                Some(Modifier::Left)
            } else {
                Some(Modifier::Right)
            }
        }
        _ => Modifier::parse(raw),
    }
}

fn kind_from_modifier(modifier: Option<&str>) -> InstructionKind {
    match modifier.and_then(Modifier::parse) {
        Some(Modifier::SlightRight) => InstructionKind::BearRight,
        Some(Modifier::Right) => InstructionKind::TurnRight,
        Some(Modifier::SharpRight) => InstructionKind::SharpRight,
        Some(Modifier::Uturn) => InstructionKind::UTurn,
        Some(Modifier::SharpLeft) => InstructionKind::SharpLeft,
        Some(Modifier::Left) => InstructionKind::TurnLeft,
        Some(Modifier::SlightLeft) => InstructionKind::BearLeft,
        Some(Modifier::Straight) | None => InstructionKind::Continue,
    }
}

/// Build an instruction for one step. The text is left empty.
pub fn translate(maneuver: &Maneuver, metrics: StepMetrics<'_>, position: StepPosition) -> Instruction {
    Instruction {
        kind: instruction_kind(maneuver, &position),
        modifier: instruction_modifier(maneuver),
        distance_m: metrics.distance_m,
        duration_s: metrics.duration_s,
        road: metrics.road.to_string(),
        direction: CompassDirection::from_bearing(maneuver.bearing_after),
        exit: maneuver.exit,
        geometry_index: position.geometry_index,
        mode: metrics.mode.to_string(),
        text: String::new(),
    }
}

/// Produces the display text for a translated step.
pub trait StepToText: Send + Sync {
    fn step_text(&self, instruction: &Instruction, position: &StepPosition) -> String;
}

/// Default text source: localized templates keyed by instruction kind.
#[derive(Debug, Clone)]
pub struct TemplateStepText {
    localization: Localization,
}

impl TemplateStepText {
    pub fn new(language: &str) -> Self {
        Self {
            localization: Localization::new(&[language]),
        }
    }
}

impl Default for TemplateStepText {
    fn default() -> Self {
        Self::new("en")
    }
}

impl StepToText for TemplateStepText {
    fn step_text(&self, instruction: &Instruction, _position: &StepPosition) -> String {
        self.localization.instruction_text(instruction)
    }
}

/// Adapts a closure into a [`StepToText`] for custom phrasing.
pub struct FnStepText<F>(pub F);

impl<F> StepToText for FnStepText<F>
where
    F: Fn(&Instruction, &StepPosition) -> String + Send + Sync,
{
    fn step_text(&self, instruction: &Instruction, position: &StepPosition) -> String {
        (self.0)(instruction, position)
    }
}
