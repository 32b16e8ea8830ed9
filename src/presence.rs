// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bed-presence estimation from heating-level telemetry.
//!
//! The platform has no ground-truth presence sensor, so presence is inferred
//! from the shape of the heating-level series: a body in bed holds the level
//! high without active climate control. Cooling-capable devices do not rest
//! at zero, so a per-occupant low-water mark (`observed_low`) shifts the
//! baseline before any threshold is applied.
//!
//! The thresholds are empirically tuned against real devices and are
//! contractual: do not adjust them without re-validating against hardware.

/// Working level above which presence is assumed outright.
const PRESENT_LEVEL: i32 = 50;
/// Working level above which a sustained rising edge implies presence.
const RISING_EDGE_LEVEL: i32 = 25;
/// Minimum per-sample rise for the rising-edge rule.
const RISING_EDGE_STEP: i32 = 2;
/// Residual heat beyond the control target that implies a body.
const TARGET_GAP: i32 = 8;
/// Working level at or below which absence is assumed outright.
const ABSENT_LEVEL: i32 = 15;
/// Upper bound of the falling-edge band for cooling-capable devices.
const ABSENT_CEILING_COOLING: i32 = 35;
/// Upper bound of the falling-edge band for heat-only devices.
const ABSENT_CEILING_HEAT_ONLY: i32 = 50;

/// One evaluation step's inputs.
#[derive(Debug, Clone, Copy)]
pub struct PresenceSample<'a> {
    /// Current heating level.
    pub level: i32,
    /// Target level, when the device reports one.
    pub target: Option<i32>,
    /// Whether the device is actively heating this side.
    pub now_heating: bool,
    /// Whether the device is actively cooling this side.
    pub now_cooling: bool,
    /// Recent heating levels, newest first; `history[0]` is `level`.
    /// The rising/falling rules need at least four samples.
    pub history: &'a [i32],
    /// Whether the device can cool (and therefore rests below zero).
    pub cooling_capable: bool,
}

/// Two-state presence machine, recomputed on every telemetry arrival.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceEstimator {
    present: bool,
    observed_low: i32,
}

impl PresenceEstimator {
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Lowest heating level ever observed; 0 on heat-only devices.
    pub fn observed_low(&self) -> i32 {
        self.observed_low
    }

    /// Fold one telemetry sample into the machine.
    pub fn update(&mut self, sample: &PresenceSample<'_>) {
        if sample.cooling_capable {
            if sample.level < self.observed_low {
                self.observed_low = sample.level;
            }
        } else {
            self.observed_low = 0;
        }

        let working = sample.level - self.observed_low;
        let climate_active = sample.now_heating || sample.now_cooling;
        // Residual heat: the level sits well beyond what the controller asked for
        let gap_exceeded = sample
            .target
            .is_some_and(|target| working - target >= TARGET_GAP);

        if !self.present {
            if working > PRESENT_LEVEL {
                if !climate_active || gap_exceeded {
                    self.present = true;
                }
            } else if working > RISING_EDGE_LEVEL
                && rising_run(sample.history)
                && (!climate_active || gap_exceeded)
            {
                self.present = true;
            }
        } else {
            let ceiling = if sample.cooling_capable {
                ABSENT_CEILING_COOLING
            } else {
                ABSENT_CEILING_HEAT_ONLY
            };
            if working <= ABSENT_LEVEL {
                // Failsafe, fires regardless of trend shape
                self.present = false;
            } else if working < ceiling && falling_run(sample.history) {
                self.present = false;
            }
        }
    }
}

/// True when the four most recent samples rise strictly with each step
/// at least [`RISING_EDGE_STEP`].
fn rising_run(history: &[i32]) -> bool {
    if history.len() < 4 {
        return false;
    }
    history
        .windows(2)
        .take(3)
        .all(|pair| pair[0] - pair[1] >= RISING_EDGE_STEP)
}

/// True when the four most recent samples fall strictly.
fn falling_run(history: &[i32]) -> bool {
    if history.len() < 4 {
        return false;
    }
    history.windows(2).take(3).all(|pair| pair[0] < pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample<'a>(level: i32, history: &'a [i32]) -> PresenceSample<'a> {
        PresenceSample {
            level,
            target: None,
            now_heating: false,
            now_cooling: false,
            history,
            cooling_capable: true,
        }
    }

    #[test]
    fn test_high_stable_level_means_present() {
        let mut estimator = PresenceEstimator::default();
        estimator.update(&sample(60, &[60, 58, 59, 57]));
        assert!(estimator.is_present());
    }

    #[test]
    fn test_boundary_at_present_level() {
        let mut estimator = PresenceEstimator::default();
        // Exactly 50 is not "> 50"
        estimator.update(&sample(50, &[50, 50, 50, 50]));
        assert!(!estimator.is_present());
        estimator.update(&sample(51, &[51, 50, 50, 50]));
        assert!(estimator.is_present());
    }

    #[test]
    fn test_active_heating_needs_target_gap() {
        let mut estimator = PresenceEstimator::default();
        let mut s = sample(60, &[60, 58, 59, 57]);
        s.now_heating = true;
        s.target = Some(55);
        // Gap of 5 < 8: the level is explained by the heater, not a body
        estimator.update(&s);
        assert!(!estimator.is_present());

        s.target = Some(52);
        estimator.update(&s);
        assert!(estimator.is_present());
    }

    #[test]
    fn test_rising_edge_triggers_presence() {
        // History oldest→newest was 10, 20, 30, 45
        let mut estimator = PresenceEstimator::default();
        estimator.update(&sample(45, &[45, 30, 20, 10]));
        assert!(estimator.is_present());
    }

    #[test]
    fn test_rising_edge_needs_minimum_step() {
        let mut estimator = PresenceEstimator::default();
        // Final step of 1 breaks the run
        estimator.update(&sample(31, &[31, 30, 26, 22]));
        assert!(!estimator.is_present());
    }

    #[test]
    fn test_rising_edge_below_threshold_is_ignored() {
        let mut estimator = PresenceEstimator::default();
        estimator.update(&sample(24, &[24, 20, 16, 10]));
        assert!(!estimator.is_present());
    }

    #[test]
    fn test_failsafe_absence_ignores_trend() {
        let mut estimator = PresenceEstimator::default();
        estimator.update(&sample(60, &[60, 58, 59, 57]));
        assert!(estimator.is_present());

        // Level collapses; history even looks "rising" but the failsafe wins
        estimator.update(&sample(10, &[10, 5, 2, 0]));
        assert!(!estimator.is_present());
    }

    #[test]
    fn test_falling_run_in_band_means_absent() {
        let mut estimator = PresenceEstimator::default();
        estimator.update(&sample(60, &[60, 58, 59, 57]));
        assert!(estimator.is_present());

        estimator.update(&sample(25, &[25, 28, 31, 35]));
        assert!(!estimator.is_present());
    }

    #[test]
    fn test_falling_run_above_band_keeps_presence() {
        let mut estimator = PresenceEstimator::default();
        estimator.update(&sample(80, &[80, 78, 79, 77]));
        assert!(estimator.is_present());

        // Falling but still at 40 ≥ the 35 ceiling for cooling devices
        estimator.update(&sample(40, &[40, 45, 50, 55]));
        assert!(estimator.is_present());
    }

    #[test]
    fn test_heat_only_devices_use_wider_band() {
        let mut estimator = PresenceEstimator::default();
        let mut s = sample(80, &[80, 78, 79, 77]);
        s.cooling_capable = false;
        estimator.update(&s);
        assert!(estimator.is_present());

        // 40 is inside the heat-only falling band (< 50)
        let mut s = sample(40, &[40, 45, 50, 55]);
        s.cooling_capable = false;
        estimator.update(&s);
        assert!(!estimator.is_present());
    }

    #[test]
    fn test_observed_low_shifts_baseline() {
        let mut estimator = PresenceEstimator::default();
        // A cooling device resting at -40 calibrates the baseline
        estimator.update(&sample(-40, &[-40, -40, -40, -40]));
        assert_eq!(estimator.observed_low(), -40);
        assert!(!estimator.is_present());

        // Raw level 20 is working level 60 after the shift
        estimator.update(&sample(20, &[20, 18, 19, 17]));
        assert!(estimator.is_present());
    }

    #[test]
    fn test_observed_low_pinned_for_heat_only() {
        let mut estimator = PresenceEstimator::default();
        let mut s = sample(-5, &[-5, -5, -5, -5]);
        s.cooling_capable = false;
        estimator.update(&s);
        assert_eq!(estimator.observed_low(), 0);
    }

    #[test]
    fn test_short_history_never_runs() {
        assert!(!rising_run(&[45, 30, 20]));
        assert!(!falling_run(&[20, 30, 40]));
    }
}
