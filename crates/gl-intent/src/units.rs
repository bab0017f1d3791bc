//! Distance unit parsing and conversion.
//!
//! All distances are canonicalized to meters as early as possible; the
//! multipliers are fixed constants shared by every stage that parses a
//! "<number> <unit>" phrase.

use serde::{Deserialize, Serialize};

/// Meters per kilometer.
pub const METERS_PER_KILOMETER: f64 = 1000.0;
/// Meters per foot.
pub const METERS_PER_FOOT: f64 = 0.3048;
/// Meters per mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// Supported distance units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Meters,
    Kilometers,
    Feet,
    Miles,
}

impl Unit {
    /// Parse a unit word as it appears in command text.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "meter" | "meters" | "m" => Some(Self::Meters),
            "kilometer" | "kilometers" | "km" => Some(Self::Kilometers),
            "feet" | "foot" | "ft" => Some(Self::Feet),
            "mile" | "miles" | "mi" => Some(Self::Miles),
            _ => None,
        }
    }

    pub fn to_meters_factor(&self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Kilometers => METERS_PER_KILOMETER,
            Self::Feet => METERS_PER_FOOT,
            Self::Miles => METERS_PER_MILE,
        }
    }
}

/// Convert a value in the given unit to meters.
pub fn to_meters(value: f64, unit: Unit) -> f64 {
    value * unit.to_meters_factor()
}

/// Parse "<number> <unit-word>" fragments already split by a regex
/// capture and return the value in meters.
pub fn parse_distance(value: &str, unit_word: &str) -> Option<f64> {
    let value: f64 = value.parse().ok()?;
    let unit = Unit::parse(unit_word)?;
    Some(to_meters(value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_multipliers() {
        assert_eq!(to_meters(2.0, Unit::Kilometers), 2000.0);
        assert_eq!(to_meters(1.0, Unit::Feet), 0.3048);
        assert_eq!(to_meters(1.0, Unit::Miles), 1609.34);
        assert_eq!(to_meters(42.0, Unit::Meters), 42.0);
    }

    #[test]
    fn conversion_to_meters_is_idempotent() {
        for (value, unit) in [
            (2.0, Unit::Kilometers),
            (500.0, Unit::Feet),
            (1.5, Unit::Miles),
            (250.0, Unit::Meters),
        ] {
            let meters = to_meters(value, unit);
            assert_eq!(to_meters(meters, Unit::Meters), meters);
        }
    }

    #[test]
    fn parse_unit_words() {
        assert_eq!(Unit::parse("KM"), Some(Unit::Kilometers));
        assert_eq!(Unit::parse("foot"), Some(Unit::Feet));
        assert_eq!(Unit::parse("mi"), Some(Unit::Miles));
        assert_eq!(Unit::parse("furlong"), None);
    }

    #[test]
    fn parse_distance_fragment() {
        assert_eq!(parse_distance("2", "kilometers"), Some(2000.0));
        assert_eq!(parse_distance("500", "meters"), Some(500.0));
        assert_eq!(parse_distance("abc", "meters"), None);
        assert_eq!(parse_distance("5", "lightyears"), None);
    }
}
