//! Language tables for unit labels, compass directions and instruction
//! phrasing.
//!
//! Lookups walk the configured languages in order and always end with
//! English, so a missing language or key degrades to English text.

use tracing::debug;

use crate::instructions::Instruction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or(code);
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Language::English),
            "es" => Some(Language::Spanish),
            _ => None,
        }
    }

    fn table(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::English => ENGLISH,
            Language::Spanish => SPANISH,
        }
    }

    fn ordinal(&self, n: u32) -> String {
        match self {
            Language::English => {
                let suffix = match (n % 10, n % 100) {
                    (_, 11..=13) => "th",
                    (1, _) => "st",
                    (2, _) => "nd",
                    (3, _) => "rd",
                    _ => "th",
                };
                format!("{n}{suffix}")
            }
            Language::Spanish => format!("{n}ª"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localization {
    languages: Vec<Language>,
}

impl Default for Localization {
    fn default() -> Self {
        Self {
            languages: vec![Language::English],
        }
    }
}

impl Localization {
    /// Build a lookup chain from language codes such as `"es"` or `"en-US"`.
    pub fn new(codes: &[&str]) -> Self {
        let mut languages = Vec::with_capacity(codes.len() + 1);
        for code in codes {
            match Language::from_code(code) {
                Some(language) if !languages.contains(&language) => languages.push(language),
                Some(_) => {}
                None => debug!(code, "no localization table for language, falling back"),
            }
        }
        if !languages.contains(&Language::English) {
            languages.push(Language::English);
        }
        Self { languages }
    }

    pub fn primary(&self) -> Language {
        self.languages[0]
    }

    pub fn localize(&self, key: &str) -> Option<&'static str> {
        self.languages.iter().find_map(|language| {
            language
                .table()
                .iter()
                .find(|(candidate, _)| *candidate == key)
                .map(|(_, value)| *value)
        })
    }

    pub fn ordinal(&self, n: u32) -> String {
        self.primary().ordinal(n)
    }

    /// Render the default phrase for an instruction, capitalized.
    pub fn instruction_text(&self, instruction: &Instruction) -> String {
        let kind = instruction.kind.as_str();
        let mut template = self
            .localize(&format!("instructions.{kind}"))
            .unwrap_or(kind)
            .to_string();
        if !instruction.road.is_empty() {
            if let Some(suffix) = self.localize(&format!("instructions.{kind}.road")) {
                template.push_str(suffix);
            }
        }

        let dir = self
            .localize(&format!("directions.{}", instruction.direction.as_str()))
            .unwrap_or_default();
        let modifier = instruction
            .modifier
            .and_then(|modifier| self.localize(&format!("directions.{}", modifier.as_str())))
            .unwrap_or_default();
        let exit = instruction.exit.map(|exit| self.ordinal(exit)).unwrap_or_default();

        capitalize(&render_template(
            &template,
            &[
                ("dir", dir),
                ("modifier", modifier),
                ("road", instruction.road.as_str()),
                ("exit", exit.as_str()),
            ],
        ))
    }
}

/// Substitute `{name}` placeholders. Unknown names render as empty.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                if let Some((_, value)) = values.iter().find(|(key, _)| *key == name) {
                    out.push_str(value);
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const ENGLISH: &[(&str, &str)] = &[
    ("units.meters", "m"),
    ("units.kilometers", "km"),
    ("units.yards", "yd"),
    ("units.miles", "mi"),
    ("units.hours", "h"),
    ("units.minutes", "min"),
    ("units.seconds", "s"),
    ("directions.N", "north"),
    ("directions.NE", "northeast"),
    ("directions.E", "east"),
    ("directions.SE", "southeast"),
    ("directions.S", "south"),
    ("directions.SW", "southwest"),
    ("directions.W", "west"),
    ("directions.NW", "northwest"),
    ("directions.Straight", "straight"),
    ("directions.SlightRight", "slight right"),
    ("directions.Right", "right"),
    ("directions.SharpRight", "sharp right"),
    ("directions.Uturn", "around"),
    ("directions.SharpLeft", "sharp left"),
    ("directions.Left", "left"),
    ("directions.SlightLeft", "slight left"),
    ("instructions.Head", "head {dir}"),
    ("instructions.Head.road", " on {road}"),
    ("instructions.Continue", "continue {dir}"),
    ("instructions.Continue.road", " on {road}"),
    ("instructions.Roundabout", "take the {exit} exit in the roundabout"),
    ("instructions.Roundabout.road", " onto {road}"),
    ("instructions.Merge", "merge {modifier}"),
    ("instructions.Merge.road", " onto {road}"),
    ("instructions.Fork", "at the fork, keep {modifier}"),
    ("instructions.Fork.road", " onto {road}"),
    ("instructions.OnRamp", "take the ramp on the {modifier}"),
    ("instructions.OnRamp.road", " onto {road}"),
    ("instructions.OffRamp", "take the exit on the {modifier}"),
    ("instructions.OffRamp.road", " onto {road}"),
    ("instructions.EndOfRoad", "turn {modifier} at the end of the road"),
    ("instructions.EndOfRoad.road", " onto {road}"),
    ("instructions.WaypointReached", "waypoint reached"),
    ("instructions.DestinationReached", "destination reached"),
    ("instructions.BearRight", "keep slightly right"),
    ("instructions.BearRight.road", " onto {road}"),
    ("instructions.TurnRight", "turn right"),
    ("instructions.TurnRight.road", " onto {road}"),
    ("instructions.SharpRight", "make a sharp right"),
    ("instructions.SharpRight.road", " onto {road}"),
    ("instructions.UTurn", "make a U-turn"),
    ("instructions.UTurn.road", " onto {road}"),
    ("instructions.SharpLeft", "make a sharp left"),
    ("instructions.SharpLeft.road", " onto {road}"),
    ("instructions.TurnLeft", "turn left"),
    ("instructions.TurnLeft.road", " onto {road}"),
    ("instructions.BearLeft", "keep slightly left"),
    ("instructions.BearLeft.road", " onto {road}"),
];

// Length units share the English abbreviations and resolve through English.
const SPANISH: &[(&str, &str)] = &[
    ("units.hours", "h"),
    ("units.minutes", "min"),
    ("units.seconds", "s"),
    ("directions.N", "norte"),
    ("directions.NE", "noreste"),
    ("directions.E", "este"),
    ("directions.SE", "sureste"),
    ("directions.S", "sur"),
    ("directions.SW", "suroeste"),
    ("directions.W", "oeste"),
    ("directions.NW", "noroeste"),
    ("directions.Straight", "recto"),
    ("directions.SlightRight", "ligeramente a la derecha"),
    ("directions.Right", "derecha"),
    ("directions.SharpRight", "cerrada a la derecha"),
    ("directions.Uturn", "media vuelta"),
    ("directions.SharpLeft", "cerrada a la izquierda"),
    ("directions.Left", "izquierda"),
    ("directions.SlightLeft", "ligeramente a la izquierda"),
    ("instructions.Head", "dirígete al {dir}"),
    ("instructions.Head.road", " por {road}"),
    ("instructions.Continue", "continúa al {dir}"),
    ("instructions.Continue.road", " por {road}"),
    ("instructions.Roundabout", "toma la {exit} salida en la rotonda"),
    ("instructions.Roundabout.road", " hacia {road}"),
    ("instructions.Merge", "incorpórate por la {modifier}"),
    ("instructions.Merge.road", " hacia {road}"),
    ("instructions.Fork", "en el cruce, mantente a la {modifier}"),
    ("instructions.Fork.road", " hacia {road}"),
    ("instructions.OnRamp", "toma la rampa a la {modifier}"),
    ("instructions.OnRamp.road", " hacia {road}"),
    ("instructions.OffRamp", "toma la salida a la {modifier}"),
    ("instructions.OffRamp.road", " hacia {road}"),
    ("instructions.EndOfRoad", "gira a la {modifier} al final de la calle"),
    ("instructions.EndOfRoad.road", " hacia {road}"),
    ("instructions.WaypointReached", "has llegado a un punto intermedio"),
    ("instructions.DestinationReached", "has llegado a tu destino"),
    ("instructions.BearRight", "mantente ligeramente a la derecha"),
    ("instructions.BearRight.road", " hacia {road}"),
    ("instructions.TurnRight", "gira a la derecha"),
    ("instructions.TurnRight.road", " hacia {road}"),
    ("instructions.SharpRight", "gira bruscamente a la derecha"),
    ("instructions.SharpRight.road", " hacia {road}"),
    ("instructions.UTurn", "cambia de sentido"),
    ("instructions.UTurn.road", " hacia {road}"),
    ("instructions.SharpLeft", "gira bruscamente a la izquierda"),
    ("instructions.SharpLeft.road", " hacia {road}"),
    ("instructions.TurnLeft", "gira a la izquierda"),
    ("instructions.TurnLeft.road", " hacia {road}"),
    ("instructions.BearLeft", "mantente ligeramente a la izquierda"),
    ("instructions.BearLeft.road", " hacia {road}"),
];
