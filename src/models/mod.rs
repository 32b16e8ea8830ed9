// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed models for the vendor API payloads.
//!
//! Every endpoint gets an explicit optional-field struct; "missing key means
//! null" lives here, at the deserialization boundary, not in the accessors.
//! The vendor occasionally sends the literal string `"None"` where null is
//! meant, and numbers sometimes arrive as strings — both quirks are absorbed
//! by the helpers below.

pub mod base;
pub mod device;
pub mod discovery;
pub mod routine;
pub mod speaker;
pub mod temperature;
pub mod trend;

pub use base::{BaseData, BaseSide};
pub use device::{DeviceSnapshot, SideKey, SideTelemetry};
pub use discovery::{DeviceAssignment, UserProfile};
pub use routine::{Alarm, OneOffAlarm, Routine};
pub use speaker::{AudioTrack, PlayerState};
pub use temperature::{SmartSchedule, TemperatureState};
pub use trend::{Session, TrendDay};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode an optional value, treating JSON null and the vendor's literal
/// `"None"` string as absent.
pub(crate) fn none_string<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s == "None" => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Decode an optional integer that may arrive as a number, a float, or a
/// numeric string. Anything undecodable is treated as absent.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) if s != "None" => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "super::none_string")]
        score: Option<i64>,
        #[serde(default, deserialize_with = "super::lenient_i64")]
        duration: Option<i64>,
    }

    #[test]
    fn test_none_string_is_null() {
        let probe: Probe = serde_json::from_str(r#"{"score": "None"}"#).unwrap();
        assert_eq!(probe.score, None);

        let probe: Probe = serde_json::from_str(r#"{"score": 87}"#).unwrap();
        assert_eq!(probe.score, Some(87));

        let probe: Probe = serde_json::from_str("{}").unwrap();
        assert_eq!(probe.score, None);
    }

    #[test]
    fn test_lenient_numbers() {
        let probe: Probe = serde_json::from_str(r#"{"duration": "3600"}"#).unwrap();
        assert_eq!(probe.duration, Some(3600));

        let probe: Probe = serde_json::from_str(r#"{"duration": 3600.9}"#).unwrap();
        assert_eq!(probe.duration, Some(3600));

        let probe: Probe = serde_json::from_str(r#"{"duration": "None"}"#).unwrap();
        assert_eq!(probe.duration, None);
    }
}
