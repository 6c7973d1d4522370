//! Display strings for distances, durations and turn instructions.

use crate::instructions::{Instruction, InstructionKind, Modifier};
use crate::localization::{Localization, render_template};

const METERS_PER_YARD: f64 = 0.9144;
const METERS_PER_MILE: f64 = 1609.344;
const FEET_PER_METER: f64 = 3.28084;

/// Formatting used by the itinerary panel.
pub trait RouteFormatter: Send + Sync {
    fn format_distance(&self, meters: f64, sensitivity: Option<i32>) -> String;
    fn format_time(&self, seconds: f64) -> String;
    fn format_instruction(&self, instruction: &Instruction, index: usize) -> String;
    fn icon_name(&self, instruction: &Instruction, index: usize) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitNames {
    pub meters: String,
    pub kilometers: String,
    pub yards: String,
    pub miles: String,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl UnitNames {
    pub fn localized(localization: &Localization) -> Self {
        let label = |key: &str, fallback: &str| localization.localize(key).unwrap_or(fallback).to_string();
        Self {
            meters: label("units.meters", "m"),
            kilometers: label("units.kilometers", "km"),
            yards: label("units.yards", "yd"),
            miles: label("units.miles", "mi"),
            hours: label("units.hours", "h"),
            minutes: label("units.minutes", "min"),
            seconds: label("units.seconds", "s"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatterOptions {
    pub units: Units,
    /// Overrides the localized labels when set.
    pub unit_names: Option<UnitNames>,
    pub language: Vec<String>,
    /// Bucket size used when a positive sensitivity is requested without
    /// a value of its own.
    pub rounding_sensitivity: i32,
    pub distance_template: String,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            units: Units::Metric,
            unit_names: None,
            language: vec!["en".to_string()],
            rounding_sensitivity: 1,
            distance_template: "{value} {unit}".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    options: FormatterOptions,
    localization: Localization,
    units: UnitNames,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FormatterOptions::default())
    }
}

impl Formatter {
    pub fn new(options: FormatterOptions) -> Self {
        let languages: Vec<&str> = options.language.iter().map(String::as_str).collect();
        let localization = Localization::new(&languages);
        let units = options
            .unit_names
            .clone()
            .unwrap_or_else(|| UnitNames::localized(&localization));
        Self {
            options,
            localization,
            units,
        }
    }

    pub fn options(&self) -> &FormatterOptions {
        &self.options
    }

    /// Round to the nearest 1/2/5 step of the value's leading digit.
    fn round(&self, d: f64, sensitivity: i32) -> f64 {
        let s = if sensitivity > 0 {
            sensitivity
        } else {
            self.options.rounding_sensitivity.max(1)
        } as f64;
        let digits = ((d / s).floor() as i64).to_string().len() as i32;
        let pow10 = 10f64.powi(digits - 1);
        let r = (d / pow10).floor();
        let p = if r > 5.0 { pow10 } else { pow10 / 2.0 };

        (d / p).round() * p
    }
}

impl RouteFormatter for Formatter {
    /// A sensitivity of `None` or zero prints the exact value, a negative
    /// one keeps that many decimals, and a positive one buckets.
    fn format_distance(&self, meters: f64, sensitivity: Option<i32>) -> String {
        let sensitivity = sensitivity.unwrap_or(0);
        let bucketed = sensitivity > 0;
        let round = |v: f64| if bucketed { self.round(v, sensitivity) } else { v };

        let (mut value, unit) = match self.options.units {
            Units::Imperial => {
                let yards = meters / METERS_PER_YARD;
                if yards >= 1000.0 {
                    (round(meters / METERS_PER_MILE), &self.units.miles)
                } else {
                    (round(yards), &self.units.yards)
                }
            }
            Units::Metric => {
                let v = round(meters);
                if v >= 1000.0 {
                    (v / 1000.0, &self.units.kilometers)
                } else {
                    (v, &self.units.meters)
                }
            }
        };

        if sensitivity < 0 {
            let decimals = sensitivity.unsigned_abs() as usize;
            value = format!("{value:.decimals$}").parse().unwrap_or(value);
        }

        let value = value.to_string();
        render_template(
            &self.options.distance_template,
            &[("value", value.as_str()), ("unit", unit.as_str())],
        )
    }

    fn format_time(&self, seconds: f64) -> String {
        // Finer than 30 seconds is noise for a driver.
        let t = ((seconds / 30.0).round() * 30.0) as i64;
        let units = &self.units;

        if t > 86_400 {
            format!("{} {}", (t as f64 / 3600.0).round() as i64, units.hours)
        } else if t >= 3600 {
            format!(
                "{} {} {} {}",
                t / 3600,
                units.hours,
                ((t % 3600) as f64 / 60.0).round() as i64,
                units.minutes
            )
        } else if t > 300 {
            format!("{} {}", (t as f64 / 60.0).round() as i64, units.minutes)
        } else if t > 60 {
            let mut text = format!("{} {}", t / 60, units.minutes);
            if t % 60 != 0 {
                text.push_str(&format!(" {} {}", t % 60, units.seconds));
            }
            text
        } else {
            format!("{} {}", t, units.seconds)
        }
    }

    fn format_instruction(&self, instruction: &Instruction, _index: usize) -> String {
        if instruction.text.is_empty() {
            self.localization.instruction_text(instruction)
        } else {
            instruction.text.clone()
        }
    }

    fn icon_name(&self, instruction: &Instruction, index: usize) -> &'static str {
        match instruction.kind {
            InstructionKind::Head if index == 0 => return "depart",
            InstructionKind::WaypointReached => return "via",
            InstructionKind::Roundabout => return "enter-roundabout",
            InstructionKind::DestinationReached => return "arrive",
            _ => {}
        }

        match instruction.modifier {
            Some(Modifier::SlightRight) => "bear-right",
            Some(Modifier::Right) => "turn-right",
            Some(Modifier::SharpRight) => "sharp-right",
            Some(Modifier::Uturn) => "u-turn",
            Some(Modifier::SharpLeft) => "sharp-left",
            Some(Modifier::Left) => "turn-left",
            Some(Modifier::SlightLeft) => "bear-left",
            Some(Modifier::Straight) | None => "continue",
        }
    }
}

/// Driver portal distances: feet up close, tenths of a mile further out.
#[derive(Debug, Clone)]
pub struct FeetMilesFormatter {
    inner: Formatter,
}

impl Default for FeetMilesFormatter {
    fn default() -> Self {
        Self::new(FormatterOptions {
            units: Units::Imperial,
            rounding_sensitivity: 10,
            ..FormatterOptions::default()
        })
    }
}

impl FeetMilesFormatter {
    pub fn new(options: FormatterOptions) -> Self {
        Self {
            inner: Formatter::new(options),
        }
    }
}

impl RouteFormatter for FeetMilesFormatter {
    fn format_distance(&self, meters: f64, _sensitivity: Option<i32>) -> String {
        let feet = meters * FEET_PER_METER;
        if feet <= 1000.0 {
            format!("{} ft", ((feet / 100.0).round() * 100.0) as i64)
        } else {
            let miles = ((meters / METERS_PER_MILE) * 10.0).round() / 10.0;
            format!("{miles} mi")
        }
    }

    fn format_time(&self, seconds: f64) -> String {
        self.inner.format_time(seconds)
    }

    fn format_instruction(&self, instruction: &Instruction, index: usize) -> String {
        self.inner.format_instruction(instruction, index)
    }

    fn icon_name(&self, instruction: &Instruction, index: usize) -> &'static str {
        self.inner.icon_name(instruction, index)
    }
}
