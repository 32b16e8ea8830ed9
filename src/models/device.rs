// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Device telemetry snapshot.
//!
//! The device endpoint reports both bed halves in one flat payload with
//! `left*`/`right*` key prefixes; [`DeviceSnapshot::side`] projects out one
//! half so the per-occupant code never touches prefixed keys.

use serde::Deserialize;

use super::lenient_i64;

/// One reading from the device telemetry endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSnapshot {
    pub left_heating_level: Option<i32>,
    pub left_target_heating_level: Option<i32>,
    pub left_now_heating: Option<bool>,
    #[serde(deserialize_with = "lenient_i64")]
    pub left_heating_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub left_presence_end: Option<i64>,

    pub right_heating_level: Option<i32>,
    pub right_target_heating_level: Option<i32>,
    pub right_now_heating: Option<bool>,
    #[serde(deserialize_with = "lenient_i64")]
    pub right_heating_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub right_presence_end: Option<i64>,

    pub needs_priming: Option<bool>,
    pub priming: Option<bool>,
    pub has_water: Option<bool>,
    pub last_prime: Option<String>,

    pub model_string: Option<String>,
    pub firmware_version: Option<String>,
    pub sensor_info: Option<SensorInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorInfo {
    pub hw_revision: Option<String>,
}

/// Which half of the flat telemetry payload to read. Occupants with a
/// solo/unknown side resolve to [`SideKey::Left`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideKey {
    Left,
    Right,
}

/// One bed half's slice of a [`DeviceSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SideTelemetry {
    pub heating_level: Option<i32>,
    pub target_heating_level: Option<i32>,
    pub now_heating: Option<bool>,
    pub heating_duration: Option<i64>,
    pub presence_end: Option<i64>,
}

impl DeviceSnapshot {
    /// Project one bed half out of the snapshot.
    pub fn side(&self, key: SideKey) -> SideTelemetry {
        match key {
            SideKey::Left => SideTelemetry {
                heating_level: self.left_heating_level,
                target_heating_level: self.left_target_heating_level,
                now_heating: self.left_now_heating,
                heating_duration: self.left_heating_duration,
                presence_end: self.left_presence_end,
            },
            SideKey::Right => SideTelemetry {
                heating_level: self.right_heating_level,
                target_heating_level: self.right_target_heating_level,
                now_heating: self.right_now_heating,
                heating_duration: self.right_heating_duration,
                presence_end: self.right_presence_end,
            },
        }
    }
}

/// Envelope returned by the device endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceResponse {
    pub result: DeviceSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_projection() {
        let snapshot: DeviceSnapshot = serde_json::from_str(
            r#"{
                "leftHeatingLevel": 60,
                "leftTargetHeatingLevel": 0,
                "leftNowHeating": false,
                "rightHeatingLevel": -20,
                "rightNowHeating": true,
                "needsPriming": false
            }"#,
        )
        .unwrap();

        let left = snapshot.side(SideKey::Left);
        assert_eq!(left.heating_level, Some(60));
        assert_eq!(left.target_heating_level, Some(0));
        assert_eq!(left.now_heating, Some(false));

        let right = snapshot.side(SideKey::Right);
        assert_eq!(right.heating_level, Some(-20));
        assert_eq!(right.target_heating_level, None);
    }

    #[test]
    fn test_presence_end_accepts_string_epoch() {
        let snapshot: DeviceSnapshot =
            serde_json::from_str(r#"{"leftPresenceEnd": "1709272200"}"#).unwrap();
        assert_eq!(snapshot.side(SideKey::Left).presence_end, Some(1709272200));
    }
}
