// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user temperature endpoint: current levels, bed state, and the
//! smart-schedule ("autopilot") per-stage targets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::lenient_i64;

/// Response of the per-user temperature endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemperatureState {
    /// The user's requested level.
    #[serde(deserialize_with = "lenient_i64")]
    pub current_level: Option<i64>,
    /// The level the device is actually producing.
    #[serde(deserialize_with = "lenient_i64")]
    pub current_device_level: Option<i64>,
    pub current_state: Option<BedState>,
    /// Smart-schedule targets, absent when autopilot is off.
    pub smart: Option<SmartSchedule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BedState {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Per-sleep-stage target levels. Round-trips on smart-level writes, so
/// unknown stages the vendor adds later survive untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SmartSchedule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_time_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_sleep_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_sleep_level: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SmartSchedule {
    pub fn level(&self, stage: SmartStage) -> Option<i64> {
        match stage {
            SmartStage::BedTime => self.bed_time_level,
            SmartStage::InitialSleep => self.initial_sleep_level,
            SmartStage::FinalSleep => self.final_sleep_level,
        }
    }

    pub fn set_level(&mut self, stage: SmartStage, level: i64) {
        match stage {
            SmartStage::BedTime => self.bed_time_level = Some(level),
            SmartStage::InitialSleep => self.initial_sleep_level = Some(level),
            SmartStage::FinalSleep => self.final_sleep_level = Some(level),
        }
    }
}

/// The smart-schedule stages the platform understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartStage {
    BedTime,
    InitialSleep,
    FinalSleep,
}

impl SmartStage {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::BedTime => "bedTimeLevel",
            Self::InitialSleep => "initialSleepLevel",
            Self::FinalSleep => "finalSleepLevel",
        }
    }
}

impl std::str::FromStr for SmartStage {
    type Err = crate::error::PodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bedTimeLevel" => Ok(Self::BedTime),
            "initialSleepLevel" => Ok(Self::InitialSleep),
            "finalSleepLevel" => Ok(Self::FinalSleep),
            other => Err(crate::error::PodError::validation(format!(
                "Unknown sleep stage: {other} (expected bedTimeLevel, initialSleepLevel or finalSleepLevel)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_schedule_round_trip_keeps_unknown_stages() {
        let mut schedule: SmartSchedule = serde_json::from_str(
            r#"{"bedTimeLevel": -10, "initialSleepLevel": -30, "windDownLevel": 5}"#,
        )
        .unwrap();
        schedule.set_level(SmartStage::BedTime, -20);

        let serialized = serde_json::to_value(&schedule).unwrap();
        assert_eq!(serialized["bedTimeLevel"], -20);
        assert_eq!(serialized["windDownLevel"], 5);
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!(
            "bedTimeLevel".parse::<SmartStage>().unwrap(),
            SmartStage::BedTime
        );
        assert!("lunchLevel".parse::<SmartStage>().is_err());
    }
}
