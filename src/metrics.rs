// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Enumerated metric table.
//!
//! Host platforms map sensors onto occupant data by identifier. Rather than
//! any name-based dynamic lookup, every exposed metric is enumerated here
//! and dispatched through one match, so an unknown identifier is a compile
//! error and the full set is introspectable via [`Metric::ALL`].

use chrono::DateTime;
use chrono_tz::Tz;

use crate::occupant::Occupant;

/// Every per-occupant metric exposed to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    SleepFitnessScore,
    SleepQualityScore,
    SleepRoutineScore,
    TimeSlept,
    HeartRate,
    Hrv,
    BreathRate,
    BedTemperature,
    TargetBedTemperature,
    RoomTemperature,
    SleepStage,
    NextAlarm,
    BedStateType,
    PresenceStart,
    PresenceEnd,
    TossesAndTurns,
}

/// A metric reading.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Tz>),
}

impl Metric {
    pub const ALL: [Metric; 16] = [
        Metric::SleepFitnessScore,
        Metric::SleepQualityScore,
        Metric::SleepRoutineScore,
        Metric::TimeSlept,
        Metric::HeartRate,
        Metric::Hrv,
        Metric::BreathRate,
        Metric::BedTemperature,
        Metric::TargetBedTemperature,
        Metric::RoomTemperature,
        Metric::SleepStage,
        Metric::NextAlarm,
        Metric::BedStateType,
        Metric::PresenceStart,
        Metric::PresenceEnd,
        Metric::TossesAndTurns,
    ];

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::SleepFitnessScore => "Sleep Fitness Score",
            Self::SleepQualityScore => "Sleep Quality Score",
            Self::SleepRoutineScore => "Sleep Routine Score",
            Self::TimeSlept => "Time Slept",
            Self::HeartRate => "Heart Rate",
            Self::Hrv => "HRV",
            Self::BreathRate => "Breath Rate",
            Self::BedTemperature => "Bed Temperature",
            Self::TargetBedTemperature => "Target Bed Temperature",
            Self::RoomTemperature => "Room Temperature",
            Self::SleepStage => "Sleep Stage",
            Self::NextAlarm => "Next Alarm",
            Self::BedStateType => "Bed State Type",
            Self::PresenceStart => "Previous Presence Start",
            Self::PresenceEnd => "Previous Presence End",
            Self::TossesAndTurns => "Tosses & Turns",
        }
    }

    /// Unit of measurement, where one applies.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::SleepQualityScore | Self::SleepRoutineScore => Some("%"),
            Self::SleepFitnessScore => Some("Score"),
            Self::TimeSlept => Some("s"),
            Self::HeartRate => Some("bpm"),
            Self::Hrv => Some("ms"),
            Self::BreathRate => Some("/min"),
            Self::BedTemperature | Self::TargetBedTemperature | Self::RoomTemperature => {
                Some("°C")
            }
            _ => None,
        }
    }
}

impl Occupant {
    /// Read one metric through the capability table.
    pub fn metric(&self, metric: Metric) -> Option<MetricValue> {
        use MetricValue::{Float, Integer, Text, Timestamp};
        match metric {
            Metric::SleepFitnessScore => self.current_sleep_fitness_score().map(Integer),
            Metric::SleepQualityScore => self.current_sleep_quality_score().map(Integer),
            Metric::SleepRoutineScore => self.current_sleep_routine_score().map(Integer),
            Metric::TimeSlept => self.time_slept().map(Integer),
            Metric::HeartRate => self.current_heart_rate().map(Float),
            Metric::Hrv => self.current_hrv().map(Float),
            Metric::BreathRate => self.current_breath_rate().map(Float),
            Metric::BedTemperature => self.current_bed_temp().map(Float),
            Metric::TargetBedTemperature => self.target_heating_temp().map(Float),
            Metric::RoomTemperature => self.current_room_temp().map(Float),
            Metric::SleepStage => self.current_sleep_stage().map(Text),
            Metric::NextAlarm => self.next_alarm().map(Timestamp),
            Metric::BedStateType => self.bed_state_type().map(Text),
            Metric::PresenceStart => self.presence_start().map(Timestamp),
            Metric::PresenceEnd => self.presence_end().map(Timestamp),
            Metric::TossesAndTurns => self.current_tnt().map(Integer),
        }
    }
}
