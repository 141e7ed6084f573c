//! Fatigue wave generation
//!
//! Each goal maps to a [`WaveShape`] that yields a normalized fatigue level
//! and a phase for every week. The generator then lifts the normalized curve
//! onto a floor derived from the starting freshness and scales it by the
//! chosen aggressiveness.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

use crate::models::{Aggressiveness, CycleWeek, Goal, Phase};

/// Upper bound of the fatigue range the wave is mapped onto
pub const MAX_TARGET_FATIGUE: f64 = 0.95;

/// Share of residual fatigue that raises the wave floor
const FRESHNESS_FLOOR_FACTOR: f64 = 0.2;

/// PeakForm values for the last two weeks
const PEAK_WEEK_LEVEL: f64 = 0.95;
const FINAL_WEEK_LEVEL: f64 = 0.90;

/// Normalized output of a wave shape for one week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavePoint {
    pub normalized: f64,
    pub phase: Phase,
}

/// Loading/deload microcycle parameters for the repeating shapes
#[derive(Debug, Clone, Copy, PartialEq)]
struct Microcycle {
    length: u32,
    loading_weeks: u32,
    base: f64,
    base_range: f64,
    peak_offset: f64,
    deload_factor: f64,
    curve: LoadingCurve,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoadingCurve {
    Linear,
    Power(f64),
    Sine,
}

impl LoadingCurve {
    fn apply(&self, progress: f64) -> f64 {
        match self {
            LoadingCurve::Linear => progress,
            LoadingCurve::Power(exponent) => progress.powf(*exponent),
            LoadingCurve::Sine => (progress * FRAC_PI_2).sin(),
        }
    }
}

impl Microcycle {
    fn point(&self, week: u32, total_weeks: u32) -> WavePoint {
        let week_progress = f64::from(week) / f64::from(total_weeks);
        let base_level = self.base + week_progress * self.base_range;
        let position = (week - 1) % self.length;

        if position < self.loading_weeks {
            let progress = f64::from(position) / f64::from(self.loading_weeks);
            WavePoint {
                normalized: base_level + self.curve.apply(progress) * self.peak_offset,
                phase: Phase::Loading,
            }
        } else {
            // Deload weeks scale the previous peak instead of running the curve
            WavePoint {
                normalized: (base_level + self.peak_offset) * self.deload_factor,
                phase: Phase::Deload,
            }
        }
    }
}

/// Per-goal wave strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveShape {
    /// Slow linear build, 2 loading weeks then a gentle deload
    Strength,
    /// Steep early rise, 3 loading weeks then a deep deload
    Mass,
    /// Smooth sine build with small amplitude
    Endurance,
    /// Accelerating build into a peak week and a taper week
    PeakForm,
}

impl From<Goal> for WaveShape {
    fn from(goal: Goal) -> Self {
        match goal {
            Goal::Strength => WaveShape::Strength,
            Goal::Mass => WaveShape::Mass,
            Goal::Endurance => WaveShape::Endurance,
            Goal::PeakForm => WaveShape::PeakForm,
        }
    }
}

impl WaveShape {
    fn microcycle(&self) -> Option<Microcycle> {
        match self {
            WaveShape::Strength => Some(Microcycle {
                length: 3,
                loading_weeks: 2,
                base: 0.30,
                base_range: 0.40,
                peak_offset: 0.15,
                deload_factor: 0.75,
                curve: LoadingCurve::Linear,
            }),
            WaveShape::Mass => Some(Microcycle {
                length: 4,
                loading_weeks: 3,
                base: 0.35,
                base_range: 0.45,
                peak_offset: 0.25,
                deload_factor: 0.65,
                curve: LoadingCurve::Power(0.6),
            }),
            WaveShape::Endurance => Some(Microcycle {
                length: 3,
                loading_weeks: 2,
                base: 0.25,
                base_range: 0.35,
                peak_offset: 0.12,
                deload_factor: 0.80,
                curve: LoadingCurve::Sine,
            }),
            WaveShape::PeakForm => None,
        }
    }

    /// Normalized fatigue and phase for a 1-based `week` of `total_weeks`.
    pub fn point(&self, week: u32, total_weeks: u32) -> WavePoint {
        match self.microcycle() {
            Some(microcycle) => microcycle.point(week, total_weeks),
            None => Self::peak_form_point(week, total_weeks),
        }
    }

    fn peak_form_point(week: u32, total_weeks: u32) -> WavePoint {
        // Signed arithmetic keeps one- and two-week cycles well defined
        let build_weeks = i64::from(total_weeks) - 2;
        let week = i64::from(week);

        if week <= build_weeks {
            let progress = week as f64 / build_weeks as f64;
            WavePoint {
                normalized: 0.2 + progress.powf(1.8) * 0.6,
                phase: Phase::Loading,
            }
        } else if week == build_weeks + 1 {
            WavePoint {
                normalized: PEAK_WEEK_LEVEL,
                phase: Phase::Loading,
            }
        } else {
            WavePoint {
                normalized: FINAL_WEEK_LEVEL,
                phase: Phase::Deload,
            }
        }
    }
}

/// Floor of the wave for a given starting freshness
pub fn base_fatigue(initial_freshness: f64) -> f64 {
    (1.0 - initial_freshness) * FRESHNESS_FLOOR_FACTOR
}

/// Map a normalized wave point onto a clamped target fatigue
pub fn target_fatigue(normalized: f64, initial_freshness: f64, aggressiveness: Aggressiveness) -> f64 {
    let base = base_fatigue(initial_freshness);
    let amplitude = normalized * aggressiveness.risk_multiplier();
    (base + amplitude * (MAX_TARGET_FATIGUE - base)).clamp(0.0, 1.0)
}

/// Generate the initial plan for a cycle.
///
/// Returns `weeks` entries numbered `1..=weeks`. Inputs are expected to be
/// validated by the caller; see [`crate::planner::CycleBuilder`].
pub fn generate_wave(
    weeks: u32,
    initial_freshness: f64,
    aggressiveness: Aggressiveness,
    goal: Goal,
) -> Vec<CycleWeek> {
    let shape = WaveShape::from(goal);

    (1..=weeks)
        .map(|week| {
            let point = shape.point(week, weeks);
            let target = target_fatigue(point.normalized, initial_freshness, aggressiveness);
            debug!(
                week,
                normalized = point.normalized,
                target,
                phase = %point.phase,
                "wave point"
            );
            CycleWeek::new(week, target, point.phase)
        })
        .collect()
}
