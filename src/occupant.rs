// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user session state and actions.
//!
//! Each discovered user gets one [`Occupant`], which owns a rolling window
//! of trend snapshots, the user's routines/alarms, base and speaker state,
//! and the presence estimator. Read accessors are synchronous against the
//! cached state; refresh and action methods are async and round-trip to the
//! vendor API.
//!
//! Action methods propagate request failures as "action not applied"; the
//! only swallowed failures are optional-capability reads (base data for a
//! user without a base is an expected miss).

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde_json::json;

use crate::client::Core;
use crate::error::{PodError, Result};
use crate::models::base::BaseData;
use crate::models::device::SideKey;
use crate::models::discovery::{CurrentDeviceResponse, UserProfile};
use crate::models::routine::{OneOffAlarm, Routine, RoutinesResponse};
use crate::models::speaker::{AudioTrack, AudioTracksResponse, PlayerState};
use crate::models::temperature::{SmartSchedule, SmartStage, TemperatureState};
use crate::models::trend::{Session, Timeseries, TrendDay};
use crate::presence::{PresenceEstimator, PresenceSample};
use crate::time_utils;
use crate::units::{level_to_temp, TemperatureUnit};

/// Which half of the bed an occupant is associated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    Left,
    Right,
    Solo,
    Away,
    #[default]
    Unknown,
}

impl Side {
    /// Parse the side string the API reports, tolerating absence.
    pub(crate) fn from_api(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("left") => Self::Left,
            Some("right") => Self::Right,
            Some("solo") => Self::Solo,
            Some("away") => Self::Away,
            _ => Self::Unknown,
        }
    }

    /// Key for the flat device telemetry payload. Solo beds report under
    /// the left keys; away/unknown sides also resolve to left.
    pub(crate) fn key(self) -> SideKey {
        match self {
            Self::Right => SideKey::Right,
            _ => SideKey::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Solo => "solo",
            Self::Away => "away",
            Self::Unknown => "unknown",
        }
    }
}

/// Away-mode transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwayAction {
    Start,
    End,
}

impl AwayAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

impl std::str::FromStr for AwayAction {
    type Err = PodError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "end" | "stop" => Ok(Self::End),
            other => Err(PodError::validation(format!(
                "Invalid away-mode action: {other}"
            ))),
        }
    }
}

/// Durations of each sleep stage within a session, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SleepBreakdown {
    pub light: Option<i64>,
    pub deep: Option<i64>,
    pub rem: Option<i64>,
    /// Presence minus sleep; absent when either input is missing.
    pub awake: Option<i64>,
}

/// Snapshot of the thermal state for one side.
#[derive(Debug, Clone)]
pub struct HeatingValues {
    pub level: Option<i32>,
    pub target: Option<i32>,
    pub active: Option<bool>,
    pub remaining_secs: Option<i64>,
    pub last_seen: Option<DateTime<Tz>>,
}

/// Summary of one sleep session's metrics.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub date: Option<DateTime<Tz>>,
    pub score: Option<i64>,
    pub stage: Option<String>,
    pub breakdown: Option<SleepBreakdown>,
    pub tnt: Option<i64>,
    pub bed_temp: Option<f64>,
    pub room_temp: Option<f64>,
    pub resp_rate: Option<f64>,
    pub heart_rate: Option<f64>,
    pub processing: Option<bool>,
}

/// Summary of one session's fitness sub-scores.
#[derive(Debug, Clone)]
pub struct FitnessSummary {
    pub date: Option<String>,
    pub score: Option<i64>,
    pub duration: Option<i64>,
    pub asleep: Option<i64>,
    pub out: Option<i64>,
    pub wakeup: Option<i64>,
}

/// Mean/deviation over a slice of the heating-level history.
#[derive(Debug, Clone, Copy)]
pub struct SeriesStats {
    pub mean: f64,
    pub stdev: f64,
    pub variance: f64,
}

/// Heating-level statistics over the telemetry ring.
#[derive(Debug, Clone, Copy)]
pub struct HeatingStats {
    pub five_sample: SeriesStats,
    pub ten_sample: SeriesStats,
}

#[derive(Default)]
struct OccupantState {
    side: Side,
    profile: Option<UserProfile>,
    /// Trend window, oldest → newest; replaced wholesale on refresh.
    trends: Vec<TrendDay>,
    routines: Vec<Routine>,
    next_alarm: Option<DateTime<Tz>>,
    next_alarm_id: Option<String>,
    bed_state_kind: Option<String>,
    current_side_temp: Option<f64>,
    smart_schedule: Option<SmartSchedule>,
    base: Option<BaseData>,
    player: Option<PlayerState>,
    audio_tracks: Vec<AudioTrack>,
    presence: PresenceEstimator,
}

/// One user's view of the session.
pub struct Occupant {
    core: Arc<Core>,
    user_id: String,
    state: RwLock<OccupantState>,
}

impl Occupant {
    pub(crate) fn new(core: Arc<Core>, user_id: String, side: Side, profile: UserProfile) -> Self {
        Self {
            core,
            user_id,
            state: RwLock::new(OccupantState {
                side,
                profile: Some(profile),
                ..OccupantState::default()
            }),
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, OccupantState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, OccupantState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn tz(&self) -> Tz {
        self.core.config.timezone
    }

    fn side_key(&self) -> SideKey {
        self.state().side.key()
    }

    // ─── Identity ────────────────────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn side(&self) -> Side {
        self.state().side
    }

    pub fn user_profile(&self) -> Option<UserProfile> {
        self.state().profile.clone()
    }

    pub fn first_name(&self) -> Option<String> {
        self.state()
            .profile
            .as_ref()
            .and_then(|p| p.first_name.clone())
    }

    // ─── Thermal state ───────────────────────────────────────────────────

    /// Heating level from the current snapshot, falling back through the
    /// telemetry ring when the current snapshot lacks the key.
    pub fn heating_level(&self) -> Option<i32> {
        self.core.heating_level(self.side_key())
    }

    /// Target heating/cooling level from the current snapshot.
    pub fn target_heating_level(&self) -> Option<i32> {
        self.core.side_now(self.side_key()).target_heating_level
    }

    /// Target level expressed in degrees Celsius.
    pub fn target_heating_temp(&self) -> Option<f64> {
        self.target_heating_level()
            .map(|level| level_to_temp(level, TemperatureUnit::Celsius))
    }

    /// Heating level `num` refreshes ago (0 when history is short).
    pub fn past_heating_level(&self, num: usize) -> i32 {
        self.core.past_heating_level(self.side_key(), num)
    }

    fn now_heating_or_cooling(&self, sign_matches: Option<bool>) -> Option<bool> {
        let active = self.core.side_now(self.side_key()).now_heating?;
        // Unknown target means unknown state, never false
        let sign_matches = sign_matches?;
        Some(active && sign_matches)
    }

    /// Whether the side is actively heating. None when the inputs are
    /// missing — consumers must not read that as "off".
    pub fn now_heating(&self) -> Option<bool> {
        let target = self.target_heating_level();
        self.now_heating_or_cooling(target.map(|t| t > 0))
    }

    /// Whether the side is actively cooling. None when the inputs are
    /// missing.
    pub fn now_cooling(&self) -> Option<bool> {
        let target = self.target_heating_level();
        self.now_heating_or_cooling(target.map(|t| t < 0))
    }

    /// Seconds of heating/cooling time remaining.
    pub fn heating_remaining(&self) -> Option<i64> {
        self.core.side_now(self.side_key()).heating_duration
    }

    /// Mattress last-seen time. The platform updates this erratically;
    /// treat it as approximate.
    pub fn last_seen(&self) -> Option<DateTime<Tz>> {
        let epoch = self.core.side_now(self.side_key()).presence_end?;
        time_utils::epoch_to_local(epoch, self.tz())
    }

    /// All current heating values in one read.
    pub fn heating_values(&self) -> HeatingValues {
        HeatingValues {
            level: self.heating_level(),
            target: self.target_heating_level(),
            active: self.now_heating(),
            remaining_secs: self.heating_remaining(),
            last_seen: self.last_seen(),
        }
    }

    /// Temperature autopilot is currently steering toward, if a smart
    /// schedule is active.
    pub fn autopilot_target_temp(&self, unit: TemperatureUnit) -> Option<f64> {
        let level = self.state().smart_schedule.as_ref()?.bed_time_level?;
        Some(level_to_temp(level as i32, unit))
    }

    /// Bed state reported by the temperature endpoint (`off`, `smart`,
    /// `timeBased`).
    pub fn bed_state_type(&self) -> Option<String> {
        self.state().bed_state_kind.clone()
    }

    /// Current bed surface temperature in Celsius.
    pub fn current_bed_temp(&self) -> Option<f64> {
        self.state().current_side_temp
    }

    // ─── Presence ────────────────────────────────────────────────────────

    /// Derived bed presence.
    pub fn bed_presence(&self) -> bool {
        self.state().presence.is_present()
    }

    /// Low-water mark used to recalibrate the heating-level baseline.
    pub fn observed_low(&self) -> i32 {
        self.state().presence.observed_low()
    }

    /// Fold the newest device telemetry into the presence estimator.
    /// Called by the client after every telemetry refresh.
    pub(crate) fn recompute_presence(&self) {
        let key = self.side_key();
        let Some(level) = self.core.heating_level(key) else {
            return;
        };
        let target = self.core.side_now(key).target_heating_level;
        let now_heating = self.now_heating().unwrap_or(false);
        let now_cooling = self.now_cooling().unwrap_or(false);
        let history: Vec<i32> = (0..4).map(|i| self.core.past_heating_level(key, i)).collect();
        let sample = PresenceSample {
            level,
            target,
            now_heating,
            now_cooling,
            history: &history,
            cooling_capable: self.core.features().cooling,
        };

        let mut state = self.state_mut();
        state.presence.update(&sample);
        tracing::debug!(
            user_id = %self.user_id,
            level,
            observed_low = state.presence.observed_low(),
            present = state.presence.is_present(),
            "Recomputed presence"
        );
    }

    /// Mean/deviation over the recent heating history. None until the ring
    /// holds ten non-zero samples.
    pub fn heating_stats(&self) -> Option<HeatingStats> {
        let key = self.side_key();
        let mut five = Vec::with_capacity(5);
        let mut ten = Vec::with_capacity(10);
        for i in 0..10 {
            let level = self.core.past_heating_level(key, i);
            if level == 0 {
                tracing::debug!(user_id = %self.user_id, "Not enough heating history for stats");
                return None;
            }
            if i < 5 {
                five.push(f64::from(level));
            }
            ten.push(f64::from(level));
        }
        Some(HeatingStats {
            five_sample: series_stats(&five)?,
            ten_sample: series_stats(&ten)?,
        })
    }

    // ─── Trend accessors: current session ────────────────────────────────

    pub fn current_session_date(&self) -> Option<DateTime<Tz>> {
        self.session_date(0)
    }

    pub fn current_session_processing(&self) -> Option<bool> {
        self.session_processing(0)
    }

    /// Sleep stage of the in-progress session. While the session is still
    /// processing the trailing synthetic awake marker is skipped.
    pub fn current_sleep_stage(&self) -> Option<String> {
        let state = self.state();
        let processing = trend(&state, 0)
            .and_then(|day| day.processing)
            .unwrap_or(false);
        latest_session(&state)?
            .effective_stage(processing)
            .map(str::to_string)
    }

    pub fn current_sleep_score(&self) -> Option<i64> {
        self.state().trends.last().and_then(|day| day.score)
    }

    pub fn current_sleep_fitness_score(&self) -> Option<i64> {
        self.current_sleep_score()
    }

    pub fn current_sleep_quality_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?.sleep_quality_score.as_ref()?.total
    }

    pub fn current_sleep_routine_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?.sleep_routine_score.as_ref()?.total
    }

    pub fn current_sleep_duration_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?
            .sleep_quality_score
            .as_ref()?
            .sleep_duration_seconds
            .as_ref()?
            .score
    }

    pub fn current_latency_asleep_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?
            .sleep_routine_score
            .as_ref()?
            .latency_asleep_seconds
            .as_ref()?
            .score
    }

    pub fn current_latency_out_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?
            .sleep_routine_score
            .as_ref()?
            .latency_out_seconds
            .as_ref()?
            .score
    }

    pub fn current_wakeup_consistency_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?
            .sleep_routine_score
            .as_ref()?
            .wakeup_consistency
            .as_ref()?
            .score
    }

    pub fn current_fitness_session_date(&self) -> Option<String> {
        let state = self.state();
        trend(&state, 0)?.day.clone()
    }

    pub fn current_sleep_breakdown(&self) -> Option<SleepBreakdown> {
        self.sleep_breakdown(0)
    }

    pub fn current_hrv(&self) -> Option<f64> {
        let state = self.state();
        trend(&state, 0)?.sleep_quality_score.as_ref()?.hrv.as_ref()?.current
    }

    /// Current respiratory rate, breaths per minute.
    pub fn current_breath_rate(&self) -> Option<f64> {
        let state = self.state();
        trend(&state, 0)?
            .sleep_quality_score
            .as_ref()?
            .respiratory_rate
            .as_ref()?
            .current
    }

    pub fn current_heart_rate(&self) -> Option<f64> {
        let state = self.state();
        let series = &latest_timeseries(&state)?.heart_rate;
        Timeseries::latest(series)
    }

    pub fn current_room_temp(&self) -> Option<f64> {
        let state = self.state();
        let series = &latest_timeseries(&state)?.temp_room_c;
        Timeseries::latest(series)
    }

    pub fn current_tnt(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?.tnt
    }

    /// Seconds slept in the current session.
    pub fn time_slept(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 0)?.sleep_duration
    }

    pub fn presence_start(&self) -> Option<DateTime<Tz>> {
        let state = self.state();
        let raw = trend(&state, 0)?.presence_start.clone()?;
        time_utils::parse_to_local(&raw, self.tz())
    }

    pub fn presence_end(&self) -> Option<DateTime<Tz>> {
        let state = self.state();
        let raw = trend(&state, 0)?.presence_end.clone()?;
        time_utils::parse_to_local(&raw, self.tz())
    }

    /// All current-session metrics in one read.
    pub fn current_values(&self) -> SessionSummary {
        SessionSummary {
            date: self.current_session_date(),
            score: self.current_sleep_score(),
            stage: self.current_sleep_stage(),
            breakdown: self.current_sleep_breakdown(),
            tnt: self.current_tnt(),
            bed_temp: self.current_bed_temp(),
            room_temp: self.current_room_temp(),
            resp_rate: self.current_breath_rate(),
            heart_rate: self.current_heart_rate(),
            processing: self.current_session_processing(),
        }
    }

    /// All current-session fitness sub-scores in one read.
    pub fn current_fitness_values(&self) -> FitnessSummary {
        FitnessSummary {
            date: self.current_fitness_session_date(),
            score: self.current_sleep_fitness_score(),
            duration: self.current_sleep_duration_score(),
            asleep: self.current_latency_asleep_score(),
            out: self.current_latency_out_score(),
            wakeup: self.current_wakeup_consistency_score(),
        }
    }

    // ─── Trend accessors: previous session ───────────────────────────────

    pub fn last_session_date(&self) -> Option<DateTime<Tz>> {
        self.session_date(1)
    }

    pub fn last_session_processing(&self) -> Option<bool> {
        self.session_processing(1)
    }

    pub fn last_sleep_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?.score
    }

    pub fn last_sleep_fitness_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?.sleep_fitness_score.as_ref()?.total
    }

    pub fn last_sleep_duration_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?
            .sleep_quality_score
            .as_ref()?
            .sleep_duration_seconds
            .as_ref()?
            .score
    }

    pub fn last_latency_asleep_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?
            .sleep_routine_score
            .as_ref()?
            .latency_asleep_seconds
            .as_ref()?
            .score
    }

    pub fn last_latency_out_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?
            .sleep_routine_score
            .as_ref()?
            .latency_out_seconds
            .as_ref()?
            .score
    }

    pub fn last_wakeup_consistency_score(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?
            .sleep_routine_score
            .as_ref()?
            .wakeup_consistency
            .as_ref()?
            .score
    }

    pub fn last_fitness_session_date(&self) -> Option<String> {
        let state = self.state();
        trend(&state, 1)?.day.clone()
    }

    pub fn last_sleep_breakdown(&self) -> Option<SleepBreakdown> {
        self.sleep_breakdown(1)
    }

    pub fn last_bed_temp(&self) -> Option<f64> {
        let state = self.state();
        trend(&state, 1)?.sleep_quality_score.as_ref()?.temp_bed_c.as_ref()?.average
    }

    pub fn last_room_temp(&self) -> Option<f64> {
        let state = self.state();
        trend(&state, 1)?.sleep_quality_score.as_ref()?.temp_room_c.as_ref()?.average
    }

    pub fn last_tnt(&self) -> Option<i64> {
        let state = self.state();
        trend(&state, 1)?.tnt
    }

    pub fn last_resp_rate(&self) -> Option<f64> {
        let state = self.state();
        trend(&state, 1)?
            .sleep_quality_score
            .as_ref()?
            .respiratory_rate
            .as_ref()?
            .average
    }

    pub fn last_heart_rate(&self) -> Option<f64> {
        let state = self.state();
        trend(&state, 1)?.sleep_quality_score.as_ref()?.heart_rate.as_ref()?.average
    }

    /// All previous-session metrics in one read.
    pub fn last_values(&self) -> SessionSummary {
        SessionSummary {
            date: self.last_session_date(),
            score: self.last_sleep_score(),
            stage: None,
            breakdown: self.last_sleep_breakdown(),
            tnt: self.last_tnt(),
            bed_temp: self.last_bed_temp(),
            room_temp: self.last_room_temp(),
            resp_rate: self.last_resp_rate(),
            heart_rate: self.last_heart_rate(),
            processing: self.last_session_processing(),
        }
    }

    /// All previous-session fitness sub-scores in one read.
    pub fn last_fitness_values(&self) -> FitnessSummary {
        FitnessSummary {
            date: self.last_fitness_session_date(),
            score: self.last_sleep_fitness_score(),
            duration: self.last_sleep_duration_score(),
            asleep: self.last_latency_asleep_score(),
            out: self.last_latency_out_score(),
            wakeup: self.last_wakeup_consistency_score(),
        }
    }

    // ─── Trend accessors: by date ────────────────────────────────────────

    /// Sleep score for a specific `YYYY-MM-DD` day in the trend window.
    pub fn trend_sleep_score(&self, date: &str) -> Option<i64> {
        let state = self.state();
        state
            .trends
            .iter()
            .find(|day| day.day.as_deref() == Some(date))
            .and_then(|day| day.score)
    }

    /// Fitness score total for a specific day in the trend window.
    pub fn sleep_fitness_score(&self, date: &str) -> Option<i64> {
        let state = self.state();
        state
            .trends
            .iter()
            .find(|day| day.day.as_deref() == Some(date))
            .and_then(|day| day.sleep_fitness_score.as_ref())
            .and_then(|score| score.total)
    }

    fn session_date(&self, num: usize) -> Option<DateTime<Tz>> {
        let state = self.state();
        let raw = trend(&state, num)?.presence_start.clone()?;
        time_utils::parse_to_local(&raw, self.tz())
    }

    fn session_processing(&self, num: usize) -> Option<bool> {
        let state = self.state();
        Some(trend(&state, num)?.processing.unwrap_or(false))
    }

    fn sleep_breakdown(&self, num: usize) -> Option<SleepBreakdown> {
        let state = self.state();
        let day = trend(&state, num)?;
        let awake = match (day.presence_duration, day.sleep_duration) {
            (Some(presence), Some(sleep)) => Some(presence - sleep),
            _ => None,
        };
        Some(SleepBreakdown {
            light: day.light_duration,
            deep: day.deep_duration,
            rem: day.rem_duration,
            awake,
        })
    }

    // ─── Alarms ──────────────────────────────────────────────────────────

    /// Resolved time of the next alarm.
    pub fn next_alarm(&self) -> Option<DateTime<Tz>> {
        self.state().next_alarm
    }

    pub fn next_alarm_id(&self) -> Option<String> {
        self.state().next_alarm_id.clone()
    }

    /// Routines as last fetched.
    pub fn routines(&self) -> Vec<Routine> {
        self.state().routines.clone()
    }

    /// Whether an alarm is enabled. With no id, the next alarm is checked
    /// (false when there is none).
    ///
    /// The next alarm reads the direct `enabled` flag; routine alarms read
    /// the inverse `disabledIndividually` flag. The two representations
    /// round-trip independently and are deliberately not unified.
    pub fn alarm_enabled(&self, alarm_id: Option<&str>) -> Result<bool> {
        let state = self.state();
        let check_next_alarm = alarm_id.is_none();
        let id = match alarm_id {
            Some(id) => id.to_string(),
            None => match &state.next_alarm_id {
                Some(id) => id.clone(),
                None => return Ok(false),
            },
        };

        for routine in &state.routines {
            if let Some(alarm) = routine.find_alarm(&id) {
                return Ok(if check_next_alarm {
                    alarm.enabled
                } else {
                    !alarm.disabled_individually
                });
            }
        }
        Err(PodError::validation(format!("Alarm with ID {id} not found")))
    }

    /// Enable or disable an alarm. With no ids, the next alarm is used
    /// (no-op when there is none). A routine without an override gets one
    /// synthesized, cloning the base alarm's settings verbatim.
    pub async fn set_alarm_enabled(
        &self,
        routine_id: Option<&str>,
        alarm_id: Option<&str>,
        enabled: bool,
    ) -> Result<()> {
        if let (Some(routine_id), Some(alarm_id)) = (routine_id, alarm_id) {
            return self.write_alarm_enabled(routine_id, alarm_id, enabled).await;
        }

        let Some(next_id) = self.next_alarm_id() else {
            return Ok(());
        };
        let routine_id = self
            .routine_id_for_alarm(&next_id)
            .ok_or_else(|| PodError::validation(format!("Alarm with ID {next_id} not found")))?;

        let has_override = self
            .get_routine(&routine_id)
            .is_some_and(|r| r.override_.is_some());
        if has_override {
            return self.write_alarm_enabled(&routine_id, &next_id, enabled).await;
        }

        let mut routine = self
            .get_routine(&routine_id)
            .ok_or_else(|| PodError::validation(format!("Routine with ID {routine_id} not found")))?;
        if !routine.synthesize_override(&next_id, enabled) {
            return Ok(());
        }
        self.put_routine(routine).await
    }

    async fn write_alarm_enabled(
        &self,
        routine_id: &str,
        alarm_id: &str,
        enabled: bool,
    ) -> Result<()> {
        let mut routine = self
            .get_routine(routine_id)
            .ok_or_else(|| PodError::validation(format!("Routine with ID {routine_id} not found")))?;
        if !routine.set_alarm_enabled(alarm_id, enabled) {
            return Err(PodError::validation(format!(
                "Alarm with ID {alarm_id} not found"
            )));
        }
        self.put_routine(routine).await
    }

    /// Snooze the next alarm.
    pub async fn alarm_snooze(&self, minutes: i64) -> Result<()> {
        if !(1..=1440).contains(&minutes) {
            return Err(PodError::validation(format!(
                "Snooze duration must be 1-1440 minutes, got {minutes}"
            )));
        }
        let alarm_id = self.require_next_alarm()?;
        let url = self
            .core
            .app_url(&format!("/v1/users/{}/routines", self.user_id));
        let body = json!({"alarm": {"alarmId": alarm_id, "snoozeForMinutes": minutes}});
        self.core.gateway.put(&url, &body).await
    }

    /// Stop the next alarm.
    pub async fn alarm_stop(&self) -> Result<()> {
        let alarm_id = self.require_next_alarm()?;
        let url = self
            .core
            .app_url(&format!("/v1/users/{}/routines", self.user_id));
        let body = json!({"alarm": {"alarmId": alarm_id, "stopped": true}});
        self.core.gateway.put(&url, &body).await
    }

    /// Dismiss the next alarm.
    pub async fn alarm_dismiss(&self) -> Result<()> {
        let alarm_id = self.require_next_alarm()?;
        let url = self
            .core
            .app_url(&format!("/v1/users/{}/routines", self.user_id));
        let body = json!({"alarm": {"alarmId": alarm_id, "dismissed": true}});
        self.core.gateway.put(&url, &body).await
    }

    /// Reschedule a routine alarm.
    pub async fn set_routine_alarm(
        &self,
        routine_id: &str,
        alarm_id: &str,
        alarm_time: &str,
    ) -> Result<()> {
        self.update_routines().await?;

        let mut routine = self
            .get_routine(routine_id)
            .ok_or_else(|| PodError::validation(format!("Routine with ID {routine_id} not found")))?;
        let alarm = routine
            .alarms
            .iter_mut()
            .find(|a| a.alarm_id.as_deref() == Some(alarm_id))
            .ok_or_else(|| PodError::validation(format!("Alarm with ID {alarm_id} not found")))?;

        alarm.enabled_since = Some(time_utils::format_utc_rfc3339(Utc::now()));
        alarm
            .time_with_offset
            .get_or_insert_with(Default::default)
            .time = Some(alarm_time.to_string());

        self.put_routine(routine).await
    }

    /// Change a routine's bedtime. Times from noon onward roll the day
    /// offset back by one so the routine still refers to "tonight".
    pub async fn set_routine_bedtime(&self, routine_id: &str, bedtime: &str) -> Result<()> {
        self.update_routines().await?;

        let mut routine = self
            .get_routine(routine_id)
            .ok_or_else(|| PodError::validation(format!("Routine with ID {routine_id} not found")))?;
        let slot = routine.bedtime.get_or_insert_with(Default::default);
        slot.time = Some(bedtime.to_string());
        slot.day_offset = Some(if bedtime >= "12:00:00" { "MinusOne" } else { "Zero" }.to_string());

        self.put_routine(routine).await
    }

    /// Create a one-off alarm.
    pub async fn set_one_off_alarm(&self, alarm: &OneOffAlarm) -> Result<()> {
        let url = self.core.app_url(&format!(
            "/v2/users/{}/routines?ignoreDeviceErrors=false",
            self.user_id
        ));
        self.core.gateway.put(&url, &alarm.to_payload()).await
    }

    fn require_next_alarm(&self) -> Result<String> {
        self.next_alarm_id()
            .ok_or_else(|| PodError::validation(format!("No next alarm set for {}", self.user_id)))
    }

    fn get_routine(&self, routine_id: &str) -> Option<Routine> {
        self.state()
            .routines
            .iter()
            .find(|r| r.id == routine_id)
            .cloned()
    }

    fn routine_id_for_alarm(&self, alarm_id: &str) -> Option<String> {
        self.state()
            .routines
            .iter()
            .find(|r| r.contains_alarm(alarm_id))
            .map(|r| r.id.clone())
    }

    /// PUT a routine back and, on success, fold it into local state.
    async fn put_routine(&self, routine: Routine) -> Result<()> {
        let url = self.core.app_url(&format!(
            "/v2/users/{}/routines/{}",
            self.user_id, routine.id
        ));
        self.core.gateway.put(&url, &routine).await?;

        let mut state = self.state_mut();
        if let Some(slot) = state.routines.iter_mut().find(|r| r.id == routine.id) {
            *slot = routine;
        }
        Ok(())
    }

    // ─── Thermal actions ─────────────────────────────────────────────────

    /// Set the heating level, optionally for a bounded duration in seconds.
    /// The side is switched on first so the write takes effect.
    pub async fn set_heating_level(&self, level: i32, duration_secs: i64) -> Result<()> {
        let level = level.clamp(-100, 100);
        let url = self.temperature_url();

        self.turn_on_side().await?;
        self.core
            .gateway
            .put(&url, &json!({"currentLevel": level}))
            .await?;
        self.core
            .gateway
            .put(
                &url,
                &json!({"timeBased": {"level": level, "durationSeconds": duration_secs}}),
            )
            .await
    }

    /// Set the smart-schedule level for one sleep stage.
    pub async fn set_smart_heating_level(&self, stage: SmartStage, level: i32) -> Result<()> {
        let level = i64::from(level.clamp(-100, 100));
        let url = self.temperature_url();

        let temperature: TemperatureState = self.core.gateway.get(&url).await?;
        let mut smart = temperature.smart.unwrap_or_default();
        smart.set_level(stage, level);

        self.core.gateway.put(&url, &json!({"smart": smart})).await
    }

    /// Nudge the heating level by an offset.
    pub async fn increment_heating_level(&self, offset: i32) -> Result<()> {
        let url = self.temperature_url();
        let temperature: TemperatureState = self.core.gateway.get(&url).await?;
        let current = temperature.current_level.ok_or_else(|| {
            PodError::request(None, "Temperature endpoint returned no currentLevel")
        })? as i32;

        let level = (current + offset).clamp(-100, 100);
        self.core
            .gateway
            .put(&url, &json!({"currentLevel": level}))
            .await
    }

    /// Turn this side on (smart state).
    pub async fn turn_on_side(&self) -> Result<()> {
        let url = self.temperature_url();
        self.core
            .gateway
            .put(&url, &json!({"currentState": {"type": "smart"}}))
            .await
    }

    /// Turn this side off.
    pub async fn turn_off_side(&self) -> Result<()> {
        let url = self.temperature_url();
        self.core
            .gateway
            .put(&url, &json!({"currentState": {"type": "off"}}))
            .await
    }

    /// Start a priming cycle.
    pub async fn prime_pod(&self) -> Result<()> {
        let device_id = self.require_device_id()?;
        let url = self
            .core
            .app_url(&format!("/v1/devices/{device_id}/priming/tasks"));
        let body = json!({"notifications": {"users": [self.user_id], "meta": "rePriming"}});
        self.core.gateway.post(&url, &body).await
    }

    /// Start or end away mode. The timestamp is backdated 24 h so the
    /// platform applies the transition immediately.
    pub async fn set_away_mode(&self, action: AwayAction) -> Result<()> {
        let url = self
            .core
            .app_url(&format!("/v1/users/{}/away-mode", self.user_id));
        let timestamp = time_utils::format_away_timestamp(Utc::now() - Duration::days(1));
        let body = json!({"awayPeriod": {action.as_str(): timestamp}});
        tracing::debug!(user_id = %self.user_id, action = action.as_str(), "Setting away mode");
        self.core.gateway.put(&url, &body).await
    }

    /// Re-assign this user to a bed side. Only `left`, `right` and `solo`
    /// are valid assignments.
    pub async fn set_bed_side(&self, side: Side) -> Result<()> {
        if !matches!(side, Side::Left | Side::Right | Side::Solo) {
            return Err(PodError::validation(format!(
                "Invalid side assignment: {}",
                side.as_str()
            )));
        }
        let device_id = self.require_device_id()?;
        let url = self
            .core
            .client_url(&format!("/users/{}/current-device", self.user_id));
        let body = json!({"id": device_id, "side": side.as_str()});
        self.core.gateway.put(&url, &body).await?;
        self.state_mut().side = side;
        Ok(())
    }

    // ─── Base articulation ───────────────────────────────────────────────

    /// Base payload for this user's side.
    pub fn base_side_data(&self) -> Option<crate::models::base::BaseSide> {
        let key = self.side_key();
        self.state().base.as_ref()?.side(key).cloned()
    }

    /// Feet-section angle (the vendor's "leg" axis).
    pub fn feet_angle(&self) -> i64 {
        self.base_side_data()
            .and_then(|side| side.leg.and_then(|axis| axis.current_angle))
            .unwrap_or(0)
    }

    /// Head-section angle (the vendor's "torso" axis).
    pub fn head_angle(&self) -> i64 {
        self.base_side_data()
            .and_then(|side| side.torso.and_then(|axis| axis.current_angle))
            .unwrap_or(0)
    }

    /// Active articulation preset, when one is set. The platform drops the
    /// preset from the payload when a custom angle is in use.
    pub fn base_preset(&self) -> Option<String> {
        self.base_side_data()?.preset?.name
    }

    pub fn in_snore_mitigation(&self) -> bool {
        self.base_side_data()
            .and_then(|side| side.in_snore_mitigation)
            .unwrap_or(false)
    }

    /// Raw base payload.
    pub fn base_data(&self) -> Option<BaseData> {
        self.state().base.clone()
    }

    /// Set the base angles; feet maps to the vendor's "leg" axis and head
    /// to "torso". The local cache is updated optimistically so reads
    /// reflect intent before the write lands.
    pub async fn set_base_angle(&self, feet_angle: i64, head_angle: i64) -> Result<()> {
        if !self.core.features().base {
            tracing::debug!(user_id = %self.user_id, "Ignoring base angle write; no base attached");
            return Ok(());
        }
        let device_id = self.require_device_id()?;

        {
            let key = self.side_key();
            let mut state = self.state_mut();
            let side = state.base.get_or_insert_with(Default::default).side_mut(key);
            side.leg.get_or_insert_with(Default::default).current_angle = Some(feet_angle);
            side.torso.get_or_insert_with(Default::default).current_angle = Some(head_angle);
        }

        let url = self.core.app_url(&format!(
            "/v1/users/{}/base/angle?ignoreDeviceErrors=false",
            self.user_id
        ));
        let body = json!({
            "deviceId": device_id,
            "deviceOnline": true,
            "legAngle": feet_angle,
            "torsoAngle": head_angle,
            "enableOfflineMode": false,
        });
        self.core.gateway.post(&url, &body).await
    }

    /// Apply a named articulation preset, optimistically cached like
    /// [`set_base_angle`](Self::set_base_angle).
    pub async fn set_base_preset(&self, preset: &str) -> Result<()> {
        if !self.core.features().base {
            tracing::debug!(user_id = %self.user_id, "Ignoring base preset write; no base attached");
            return Ok(());
        }
        let device_id = self.require_device_id()?;

        {
            let key = self.side_key();
            let mut state = self.state_mut();
            let side = state.base.get_or_insert_with(Default::default).side_mut(key);
            side.preset.get_or_insert_with(Default::default).name = Some(preset.to_string());
        }

        let url = self.core.app_url(&format!(
            "/v1/users/{}/base/angle?ignoreDeviceErrors=false",
            self.user_id
        ));
        let body = json!({
            "deviceId": device_id,
            "deviceOnline": true,
            "preset": preset,
            "enableOfflineMode": false,
        });
        self.core.gateway.post(&url, &body).await
    }

    // ─── Speaker ─────────────────────────────────────────────────────────

    pub fn player_state(&self) -> Option<PlayerState> {
        self.state().player.clone()
    }

    pub fn audio_tracks(&self) -> Vec<AudioTrack> {
        self.state().audio_tracks.clone()
    }

    pub async fn speaker_play(&self) -> Result<()> {
        self.set_player_state("playing").await
    }

    pub async fn speaker_pause(&self) -> Result<()> {
        self.set_player_state("paused").await
    }

    async fn set_player_state(&self, player_state: &str) -> Result<()> {
        let url = self.player_url();
        self.core
            .gateway
            .put(&url, &json!({"state": player_state}))
            .await?;
        if let Some(player) = self.state_mut().player.as_mut() {
            player.state = Some(player_state.to_string());
        }
        Ok(())
    }

    /// Set speaker volume (0..=100).
    pub async fn set_speaker_volume(&self, volume: i64) -> Result<()> {
        if !(0..=100).contains(&volume) {
            return Err(PodError::validation(format!(
                "Volume must be 0-100, got {volume}"
            )));
        }
        let url = self.player_url();
        self.core.gateway.put(&url, &json!({"volume": volume})).await?;
        if let Some(player) = self.state_mut().player.as_mut() {
            player.volume = Some(volume);
        }
        Ok(())
    }

    /// Select an ambient track by id.
    pub async fn set_speaker_track(&self, track_id: &str) -> Result<()> {
        let url = self.player_url();
        self.core
            .gateway
            .put(&url, &json!({"trackId": track_id}))
            .await
    }

    // ─── Refresh ─────────────────────────────────────────────────────────

    /// Refresh all per-user data: side assignment, trend window, routines
    /// and temperature state.
    pub async fn refresh(&self) -> Result<()> {
        if let Some(side) = self.fetch_side().await? {
            self.state_mut().side = side;
        }

        let now = Utc::now().with_timezone(&self.tz());
        let from = (now - Duration::days(1))
            .format(time_utils::DATE_FORMAT)
            .to_string();
        let to = (now + Duration::days(1))
            .format(time_utils::DATE_FORMAT)
            .to_string();
        self.update_trends(&from, &to).await?;
        self.update_routines().await?;
        self.update_temperature().await;
        Ok(())
    }

    async fn fetch_side(&self) -> Result<Option<Side>> {
        let url = self
            .core
            .client_url(&format!("/users/{}/current-device", self.user_id));
        let response: CurrentDeviceResponse = self.core.gateway.get(&url).await?;
        let side = Side::from_api(response.side.as_deref());
        if side == Side::Unknown {
            tracing::warn!(
                user_id = %self.user_id,
                reported = ?response.side,
                "Device assignment reports no usable side; keeping previous"
            );
            return Ok(None);
        }
        Ok(Some(side))
    }

    /// Fetch the trend window for a date range (inclusive, `YYYY-MM-DD`).
    /// The window replaces the previous one wholesale.
    pub async fn update_trends(&self, from: &str, to: &str) -> Result<()> {
        let url = self
            .core
            .client_url(&format!("/users/{}/trends", self.user_id));
        let query = [
            ("tz", self.tz().name().to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("include-main", "false".to_string()),
            ("include-all-sessions", "true".to_string()),
            ("model-version", "v2".to_string()),
        ];
        let response: crate::models::trend::TrendsResponse =
            self.core.gateway.get_with_query(&url, &query).await?;
        self.state_mut().trends = response.days;
        Ok(())
    }

    /// Fetch routines and resolve the next-alarm pointer.
    pub async fn update_routines(&self) -> Result<()> {
        let url = self
            .core
            .app_url(&format!("/v2/users/{}/routines", self.user_id));
        let response: RoutinesResponse = self.core.gateway.get(&url).await?;

        let next = response.state.next_alarm.as_ref();
        let next_timestamp = next.and_then(|n| n.next_timestamp.clone());

        let mut state = self.state_mut();
        state.routines = response.settings.routines;

        match next_timestamp {
            Some(timestamp) => {
                state.next_alarm = time_utils::parse_to_local(&timestamp, self.core.config.timezone);
                state.next_alarm_id = next.and_then(|n| n.alarm_id.clone());
            }
            None => {
                state.next_alarm = None;
                // An upcoming routine may still carry a (disabled) alarm
                let fallback_id = response.state.upcoming_routine_id.as_ref().and_then(|id| {
                    let routine = state.routines.iter().find(|r| &r.id == id)?;
                    match &routine.override_ {
                        Some(override_) => {
                            override_.alarms.first().and_then(|a| a.alarm_id.clone())
                        }
                        None => routine.alarms.first().and_then(|a| a.alarm_id.clone()),
                    }
                });
                state.next_alarm_id = fallback_id;
            }
        }
        Ok(())
    }

    /// Fetch temperature/autopilot state. Failures are logged, not
    /// propagated; the rest of the refresh is still useful without it.
    async fn update_temperature(&self) {
        let url = self.temperature_url();
        match self.core.gateway.get::<TemperatureState>(&url).await {
            Ok(temperature) => {
                let mut state = self.state_mut();
                state.current_side_temp = temperature
                    .current_device_level
                    .map(|level| level_to_temp(level as i32, TemperatureUnit::Celsius));
                state.bed_state_kind = temperature.current_state.and_then(|s| s.kind);
                state.smart_schedule = temperature.smart;
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "Error fetching temperature data");
            }
        }
    }

    /// Fetch bed-base state. A request failure is expected for users not
    /// paired to a base and is logged, not propagated.
    pub async fn refresh_base(&self) -> Result<()> {
        if !self.core.features().base {
            return Ok(());
        }
        let url = self.core.app_url(&format!("/v1/users/{}/base", self.user_id));
        match self.core.gateway.get::<BaseData>(&url).await {
            Ok(base) => {
                self.state_mut().base = Some(base);
                Ok(())
            }
            Err(PodError::Request { .. }) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    "Unable to fetch base data; this is normal if the user is not paired to a base"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch speaker player state and the track catalog.
    pub async fn refresh_speaker(&self) -> Result<()> {
        if !self.core.features().speaker {
            return Ok(());
        }
        let player: PlayerState = self.core.gateway.get(&self.player_url()).await?;
        let tracks_url = self
            .core
            .app_url(&format!("/v1/users/{}/audio/tracks", self.user_id));
        let tracks: AudioTracksResponse = self.core.gateway.get(&tracks_url).await?;

        let mut state = self.state_mut();
        state.player = Some(player);
        state.audio_tracks = tracks.tracks;
        Ok(())
    }

    fn temperature_url(&self) -> String {
        self.core
            .app_url(&format!("/v1/users/{}/temperature", self.user_id))
    }

    fn player_url(&self) -> String {
        self.core
            .app_url(&format!("/v1/users/{}/audio/player", self.user_id))
    }

    fn require_device_id(&self) -> Result<String> {
        self.core
            .device_id()
            .ok_or_else(|| PodError::validation("No device discovered yet"))
    }
}

/// Trend `num` sessions back from the newest (0 = current).
fn trend(state: &OccupantState, num: usize) -> Option<&TrendDay> {
    let len = state.trends.len();
    if len <= num {
        return None;
    }
    state.trends.get(len - 1 - num)
}

fn latest_session(state: &OccupantState) -> Option<&Session> {
    trend(state, 0)?.sessions.last()
}

fn latest_timeseries(state: &OccupantState) -> Option<&Timeseries> {
    latest_session(state)?.timeseries.as_ref()
}

fn series_stats(values: &[f64]) -> Option<SeriesStats> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(SeriesStats {
        mean,
        stdev: variance.sqrt(),
        variance,
    })
}
