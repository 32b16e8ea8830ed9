// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routines and alarms.
//!
//! Routines round-trip to the vendor API: reads come back through these
//! structs and writes PUT the (possibly mutated) routine back. Unknown
//! vendor fields are preserved through `#[serde(flatten)]` so a write never
//! drops settings this client does not model.
//!
//! An alarm's state is double-represented. Routine alarms use the inverse
//! `disabledIndividually` flag; the externally reported next alarm uses a
//! direct `enabled` flag. The two are independently round-tripped and must
//! not be unified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope returned by the routines endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutinesResponse {
    pub settings: RoutineSettings,
    pub state: RoutineState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutineSettings {
    pub routines: Vec<Routine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutineState {
    pub next_alarm: Option<NextAlarm>,
    pub upcoming_routine_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NextAlarm {
    pub next_timestamp: Option<String>,
    pub alarm_id: Option<String>,
}

/// A recurring schedule (days + bedtime + alarms).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    /// One-time exception that supersedes the base alarms when present.
    #[serde(rename = "override", default, skip_serializing_if = "Option::is_none")]
    pub override_: Option<RoutineOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedtime: Option<Bedtime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineOverride {
    #[serde(default)]
    pub routine_enabled: bool,
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bedtime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_offset: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Alarm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_id: Option<String>,
    pub enabled: bool,
    pub disabled_individually: bool,
    /// Opaque vibration/thermal settings blob, cloned verbatim into
    /// synthesized overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_until: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snooze_until: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_with_offset: Option<TimeWithOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_since: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeWithOffset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Routine {
    /// Find an alarm by id, override alarms taking precedence.
    pub fn find_alarm(&self, alarm_id: &str) -> Option<&Alarm> {
        if let Some(override_) = &self.override_ {
            if let Some(alarm) = override_
                .alarms
                .iter()
                .find(|a| a.alarm_id.as_deref() == Some(alarm_id))
            {
                return Some(alarm);
            }
        }
        self.alarms
            .iter()
            .find(|a| a.alarm_id.as_deref() == Some(alarm_id))
    }

    pub fn contains_alarm(&self, alarm_id: &str) -> bool {
        self.find_alarm(alarm_id).is_some()
    }

    /// Flip the enabled state of an alarm in place, override alarms first.
    /// Returns false when the id matches nothing.
    pub fn set_alarm_enabled(&mut self, alarm_id: &str, enabled: bool) -> bool {
        if let Some(override_) = &mut self.override_ {
            if let Some(alarm) = override_
                .alarms
                .iter_mut()
                .find(|a| a.alarm_id.as_deref() == Some(alarm_id))
            {
                alarm.enabled = enabled;
                alarm.disabled_individually = !enabled;
                return true;
            }
        }
        if let Some(alarm) = self
            .alarms
            .iter_mut()
            .find(|a| a.alarm_id.as_deref() == Some(alarm_id))
        {
            alarm.enabled = enabled;
            alarm.disabled_individually = !enabled;
            return true;
        }
        false
    }

    /// Create an override for a routine that has none, cloning the named
    /// base alarm's settings verbatim. Returns false when the id matches no
    /// base alarm.
    pub fn synthesize_override(&mut self, alarm_id: &str, enabled: bool) -> bool {
        let Some(base) = self
            .alarms
            .iter()
            .find(|a| a.alarm_id.as_deref() == Some(alarm_id))
        else {
            return false;
        };

        self.override_ = Some(RoutineOverride {
            routine_enabled: true,
            alarms: vec![Alarm {
                alarm_id: None,
                enabled,
                disabled_individually: !enabled,
                settings: base.settings.clone(),
                dismiss_until: base.dismiss_until.clone(),
                snooze_until: base.snooze_until.clone(),
                time_with_offset: None,
                time: base.time_with_offset.as_ref().and_then(|t| t.time.clone()),
                enabled_since: None,
                extra: Map::new(),
            }],
            extra: Map::new(),
        });
        true
    }
}

/// Parameters for a one-off alarm write. Defaults mirror the vendor app.
#[derive(Debug, Clone)]
pub struct OneOffAlarm {
    pub time: String,
    pub enabled: bool,
    pub vibration_enabled: bool,
    pub vibration_power_level: i64,
    pub vibration_pattern: String,
    pub thermal_enabled: bool,
    pub thermal_level: i64,
}

impl OneOffAlarm {
    pub fn at(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            enabled: true,
            vibration_enabled: true,
            vibration_power_level: 50,
            vibration_pattern: "RISE".to_string(),
            thermal_enabled: true,
            thermal_level: 0,
        }
    }

    pub(crate) fn to_payload(&self) -> Value {
        serde_json::json!({
            "oneOffAlarms": [{
                "time": self.time,
                "enabled": self.enabled,
                "settings": {
                    "vibration": {
                        "enabled": self.vibration_enabled,
                        "powerLevel": self.vibration_power_level,
                        "pattern": self.vibration_pattern,
                    },
                    "thermal": {
                        "enabled": self.thermal_enabled,
                        "level": self.thermal_level,
                    },
                },
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine_fixture() -> Routine {
        serde_json::from_str(
            r#"{
                "id": "routine-1",
                "days": ["monday", "tuesday"],
                "alarms": [{
                    "alarmId": "alarm-1",
                    "enabled": true,
                    "disabledIndividually": false,
                    "settings": {
                        "vibration": {"enabled": true, "powerLevel": 60, "pattern": "RISE"},
                        "thermal": {"enabled": false, "level": 10}
                    },
                    "timeWithOffset": {"time": "06:30:00", "offset": 0}
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_synthesized_override_clones_settings_verbatim() {
        let mut routine = routine_fixture();
        let original_settings = routine.alarms[0].settings.clone();

        assert!(routine.synthesize_override("alarm-1", false));

        let override_ = routine.override_.as_ref().unwrap();
        assert!(override_.routine_enabled);
        assert_eq!(override_.alarms.len(), 1);

        let alarm = &override_.alarms[0];
        assert!(!alarm.enabled);
        assert!(alarm.disabled_individually);
        assert_eq!(alarm.settings, original_settings);
        assert_eq!(alarm.time.as_deref(), Some("06:30:00"));
    }

    #[test]
    fn test_synthesize_override_unknown_alarm() {
        let mut routine = routine_fixture();
        assert!(!routine.synthesize_override("missing", false));
        assert!(routine.override_.is_none());
    }

    #[test]
    fn test_override_alarms_take_precedence() {
        let mut routine = routine_fixture();
        routine.override_ = Some(RoutineOverride {
            routine_enabled: true,
            alarms: vec![Alarm {
                alarm_id: Some("alarm-1".to_string()),
                enabled: false,
                disabled_individually: true,
                ..Alarm::default()
            }],
            extra: Map::new(),
        });

        let found = routine.find_alarm("alarm-1").unwrap();
        assert!(found.disabled_individually);

        assert!(routine.set_alarm_enabled("alarm-1", true));
        let override_alarm = &routine.override_.as_ref().unwrap().alarms[0];
        assert!(override_alarm.enabled);
        // The base alarm is untouched
        assert!(!routine.alarms[0].disabled_individually);
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let routine = routine_fixture();
        let serialized = serde_json::to_value(&routine).unwrap();
        assert_eq!(
            serialized["days"],
            serde_json::json!(["monday", "tuesday"])
        );
        assert_eq!(serialized["alarms"][0]["timeWithOffset"]["offset"], 0);
    }
}
