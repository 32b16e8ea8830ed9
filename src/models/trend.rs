// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trend/session snapshots: one [`TrendDay`] per calendar day in the query
//! window, each carrying score breakdowns and the day's sleep sessions with
//! biometric timeseries.

use serde::Deserialize;

use super::{lenient_i64, none_string};

/// Envelope returned by the trends endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrendsResponse {
    pub days: Vec<TrendDay>,
}

/// One day's aggregated sleep record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrendDay {
    pub day: Option<String>,
    /// Overall sleep (fitness) score for the day.
    #[serde(deserialize_with = "none_string")]
    pub score: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub sleep_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub presence_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub light_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub deep_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub rem_duration: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub tnt: Option<i64>,
    pub processing: Option<bool>,
    #[serde(deserialize_with = "none_string")]
    pub presence_start: Option<String>,
    #[serde(deserialize_with = "none_string")]
    pub presence_end: Option<String>,
    pub sleep_quality_score: Option<QualityScore>,
    pub sleep_routine_score: Option<RoutineScore>,
    pub sleep_fitness_score: Option<FitnessScore>,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityScore {
    #[serde(deserialize_with = "none_string")]
    pub total: Option<i64>,
    pub hrv: Option<MetricSummary>,
    pub respiratory_rate: Option<MetricSummary>,
    pub heart_rate: Option<MetricSummary>,
    pub temp_bed_c: Option<MetricSummary>,
    pub temp_room_c: Option<MetricSummary>,
    pub sleep_duration_seconds: Option<ScoredComponent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutineScore {
    #[serde(deserialize_with = "none_string")]
    pub total: Option<i64>,
    pub latency_asleep_seconds: Option<ScoredComponent>,
    pub latency_out_seconds: Option<ScoredComponent>,
    pub wakeup_consistency: Option<ScoredComponent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FitnessScore {
    #[serde(deserialize_with = "none_string")]
    pub total: Option<i64>,
}

/// Current/average/score triple used for biometric sub-records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricSummary {
    #[serde(deserialize_with = "none_string")]
    pub current: Option<f64>,
    #[serde(deserialize_with = "none_string")]
    pub average: Option<f64>,
    #[serde(deserialize_with = "none_string")]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoredComponent {
    #[serde(deserialize_with = "none_string")]
    pub score: Option<i64>,
}

/// One sleep session within a day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub timeseries: Option<Timeseries>,
    pub stages: Vec<StageEntry>,
}

impl Session {
    /// The session's current sleep stage.
    ///
    /// While a session is still processing the platform appends a synthetic
    /// trailing "awake" marker, so the true current stage is the
    /// second-to-last entry; once processing finishes the last entry is
    /// authoritative.
    pub fn effective_stage(&self, processing: bool) -> Option<&str> {
        if processing {
            if self.stages.len() >= 2 {
                self.stages[self.stages.len() - 2].stage.as_deref()
            } else {
                None
            }
        } else {
            self.stages.last().and_then(|s| s.stage.as_deref())
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StageEntry {
    pub stage: Option<String>,
}

/// Per-metric `[timestamp, value]` series.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timeseries {
    pub heart_rate: Vec<TimePoint>,
    pub temp_room_c: Vec<TimePoint>,
    pub temp_bed_c: Vec<TimePoint>,
}

/// A `[timestamp, value]` pair as the vendor encodes it.
#[derive(Debug, Clone, Deserialize)]
pub struct TimePoint(pub String, pub f64);

impl Timeseries {
    /// Latest value of a series, if it has any points.
    pub fn latest(series: &[TimePoint]) -> Option<f64> {
        series.last().map(|point| point.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_with_stages(stages: &[&str]) -> Session {
        Session {
            timeseries: None,
            stages: stages
                .iter()
                .map(|s| StageEntry {
                    stage: Some((*s).to_string()),
                })
                .collect(),
        }
    }

    #[test]
    fn test_processing_session_uses_second_to_last_stage() {
        let session = day_with_stages(&["light", "deep", "awake"]);
        assert_eq!(session.effective_stage(true), Some("deep"));
        assert_eq!(session.effective_stage(false), Some("awake"));
    }

    #[test]
    fn test_single_stage_processing_session_has_no_stage() {
        let session = day_with_stages(&["awake"]);
        assert_eq!(session.effective_stage(true), None);
        assert_eq!(session.effective_stage(false), Some("awake"));
    }

    #[test]
    fn test_trend_day_tolerates_none_strings() {
        let day: TrendDay = serde_json::from_str(
            r#"{
                "day": "2024-03-01",
                "score": "None",
                "sleepDuration": 25200,
                "processing": true,
                "sleepQualityScore": {
                    "total": 82,
                    "hrv": {"current": "None", "average": 48.5}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(day.score, None);
        assert_eq!(day.sleep_duration, Some(25200));
        let quality = day.sleep_quality_score.unwrap();
        assert_eq!(quality.total, Some(82));
        let hrv = quality.hrv.unwrap();
        assert_eq!(hrv.current, None);
        assert_eq!(hrv.average, Some(48.5));
    }

    #[test]
    fn test_timeseries_latest() {
        let ts: Timeseries = serde_json::from_str(
            r#"{"heartRate": [["2024-03-01T06:00:00Z", 58], ["2024-03-01T06:05:00Z", 61.5]]}"#,
        )
        .unwrap();
        assert_eq!(Timeseries::latest(&ts.heart_rate), Some(61.5));
        assert_eq!(Timeseries::latest(&ts.temp_room_c), None);
    }
}
