// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Heating level ⇄ temperature conversion.
//!
//! The platform drives the mattress with an abstract -100..100 "heating
//! level". There is no closed-form formula relating it to degrees; the app
//! ships hand-calibrated lookup tables, reproduced here. Level → degrees
//! interpolates linearly between the bracketing entries; degrees → level is
//! a nearest-neighbor scan and therefore a coarser quantization. The two
//! directions are intentionally not exact inverses.

use std::str::FromStr;

use crate::error::PodError;

/// Temperature unit accepted by the conversion helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    fn table(self) -> &'static [(i32, f64)] {
        match self {
            Self::Celsius => &RAW_TO_CELSIUS,
            Self::Fahrenheit => &RAW_TO_FAHRENHEIT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = PodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            other => Err(PodError::validation(format!(
                "Unknown temperature unit: {other}"
            ))),
        }
    }
}

// Calibrated against the vendor app over the full level range. Keys are
// identical in both tables; values are whole degrees and strictly
// increasing.
const RAW_TO_CELSIUS: [(i32, f64); 33] = [
    (-100, 13.0),
    (-97, 14.0),
    (-94, 15.0),
    (-91, 16.0),
    (-83, 17.0),
    (-75, 18.0),
    (-66, 19.0),
    (-58, 20.0),
    (-50, 21.0),
    (-42, 22.0),
    (-33, 23.0),
    (-25, 24.0),
    (-17, 25.0),
    (-8, 26.0),
    (0, 27.0),
    (6, 28.0),
    (11, 29.0),
    (17, 30.0),
    (22, 31.0),
    (28, 32.0),
    (33, 33.0),
    (39, 34.0),
    (44, 35.0),
    (50, 36.0),
    (56, 37.0),
    (61, 38.0),
    (67, 39.0),
    (72, 40.0),
    (78, 41.0),
    (83, 42.0),
    (89, 43.0),
    (94, 44.0),
    (100, 45.0),
];

const RAW_TO_FAHRENHEIT: [(i32, f64); 33] = [
    (-100, 55.0),
    (-97, 57.0),
    (-94, 59.0),
    (-91, 60.0),
    (-83, 62.0),
    (-75, 64.0),
    (-66, 66.0),
    (-58, 68.0),
    (-50, 70.0),
    (-42, 72.0),
    (-33, 73.0),
    (-25, 75.0),
    (-17, 77.0),
    (-8, 79.0),
    (0, 81.0),
    (6, 82.0),
    (11, 84.0),
    (17, 86.0),
    (22, 88.0),
    (28, 90.0),
    (33, 91.0),
    (39, 93.0),
    (44, 95.0),
    (50, 97.0),
    (56, 99.0),
    (61, 100.0),
    (67, 102.0),
    (72, 104.0),
    (78, 106.0),
    (83, 108.0),
    (89, 110.0),
    (94, 111.0),
    (100, 113.0),
];

/// Convert a heating level to degrees.
///
/// Exact table keys return the calibrated value; anything between two keys
/// is linearly interpolated. Levels outside the table clamp to the nearest
/// edge value.
pub fn level_to_temp(level: i32, unit: TemperatureUnit) -> f64 {
    let table = unit.table();
    let (first_key, first_value) = table[0];
    if level <= first_key {
        return first_value;
    }

    // Iterative search instead of binary: the table is constant-size.
    let mut last = table[0];
    for &(key, value) in table {
        if level == key {
            return value;
        }
        if key > level {
            let (last_key, last_value) = last;
            let ratio = f64::from(level - last_key) / f64::from(key - last_key);
            return last_value + ratio * (value - last_value);
        }
        last = (key, value);
    }

    last.1
}

/// Convert degrees to the nearest heating level.
///
/// Nearest-neighbor over the table values, no interpolation; ties go to the
/// entry encountered first in ascending key order.
pub fn temp_to_level(temp: f64, unit: TemperatureUnit) -> i32 {
    let table = unit.table();
    let mut closest_key = table[0].0;
    let mut min_diff = f64::INFINITY;
    for &(key, value) in table {
        let diff = (value - temp).abs();
        if diff < min_diff {
            min_diff = diff;
            closest_key = key;
        }
    }
    closest_key
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: [TemperatureUnit; 2] = [TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit];

    #[test]
    fn test_monotonic_over_full_range() {
        for unit in UNITS {
            let mut last = f64::NEG_INFINITY;
            for level in -100..=100 {
                let temp = level_to_temp(level, unit);
                assert!(
                    temp >= last,
                    "{:?} not monotonic at level {}: {} < {}",
                    unit,
                    level,
                    temp,
                    last
                );
                last = temp;
            }
        }
    }

    #[test]
    fn test_exact_keys_have_zero_error() {
        for unit in UNITS {
            for &(key, value) in unit.table() {
                assert_eq!(level_to_temp(key, unit), value);
            }
        }
    }

    #[test]
    fn test_round_trip_at_table_keys() {
        for unit in UNITS {
            for &(key, _) in unit.table() {
                assert_eq!(temp_to_level(level_to_temp(key, unit), unit), key);
            }
        }
    }

    #[test]
    fn test_interpolation_between_keys() {
        // Level 3 sits halfway between 0 (27 °C) and 6 (28 °C)
        assert_eq!(level_to_temp(3, TemperatureUnit::Celsius), 27.5);
        // Level -79 sits halfway between -83 (62 °F) and -75 (64 °F)
        assert_eq!(level_to_temp(-79, TemperatureUnit::Fahrenheit), 63.0);
    }

    #[test]
    fn test_out_of_range_clamps_to_edges() {
        assert_eq!(level_to_temp(-150, TemperatureUnit::Celsius), 13.0);
        assert_eq!(level_to_temp(150, TemperatureUnit::Celsius), 45.0);
        assert_eq!(level_to_temp(150, TemperatureUnit::Fahrenheit), 113.0);
    }

    #[test]
    fn test_nearest_neighbor_tie_takes_first_key() {
        // 56 °F is equidistant from 55 (-100) and 57 (-97); the scan keeps
        // the first winner
        assert_eq!(temp_to_level(56.0, TemperatureUnit::Fahrenheit), -100);
    }

    #[test]
    fn test_to_temp_is_idempotent_through_quantization() {
        for unit in UNITS {
            for level in -100..=100 {
                let temp = level_to_temp(level, unit);
                let quantized = level_to_temp(temp_to_level(temp, unit), unit);
                assert_eq!(quantized, level_to_temp(temp_to_level(quantized, unit), unit));
            }
        }
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!(
            "c".parse::<TemperatureUnit>().unwrap(),
            TemperatureUnit::Celsius
        );
        assert_eq!(
            "Fahrenheit".parse::<TemperatureUnit>().unwrap(),
            TemperatureUnit::Fahrenheit
        );
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
    }
}
