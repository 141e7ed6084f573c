//! Weekly coaching feedback and plan adaptation
//!
//! Plan completion is carried as a percentage (0-100). Thresholds below are
//! expressed as fractions and compared against `completion / 100`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{PlannerError, Result};
use crate::models::{CycleWeek, Phase, TrainingCycle};

const LOW_COMPLETION: f64 = 0.8;
const POOR_COMPLETION: f64 = 0.7;
const HIGH_COMPLETION: f64 = 0.95;
const LOW_WELLBEING: u8 = 2;
const HIGH_WELLBEING: u8 = 4;

const REDUCE_FACTOR: f64 = 0.9;
const PROGRESS_FACTOR: f64 = 1.05;

/// Guidance for a week, rendered to text through [`fmt::Display`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    /// The cycle has no current week
    NotStarted,
    /// Completion or wellbeing not logged yet
    CompleteWeekFirst,
    WaveBreaking,
    MonitorRecovery,
    Excellent,
    PeakLoad { week_number: u32 },
    Deload { week_number: u32 },
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::NotStarted => f.write_str("Start your cycle to see recommendations"),
            Recommendation::CompleteWeekFirst => {
                f.write_str("Complete this week to get recommendations")
            }
            Recommendation::WaveBreaking => {
                f.write_str("Wave is close to breaking. Consider reducing load by 10%.")
            }
            Recommendation::MonitorRecovery => {
                f.write_str("Monitor recovery. Consider a lighter week next.")
            }
            Recommendation::Excellent => {
                f.write_str("Excellent progress. Maintain current intensity.")
            }
            Recommendation::PeakLoad { week_number } => write!(
                f,
                "Week {}: PEAK LOAD. Complete 95-100% of plan.",
                week_number
            ),
            Recommendation::Deload { week_number } => {
                write!(f, "Week {}: DELOAD. Focus on recovery.", week_number)
            }
        }
    }
}

/// Classify a week's outcome. First matching branch wins.
pub fn recommend(
    current: &CycleWeek,
    previous: Option<&CycleWeek>,
    plan_completion: Option<f64>,
    wellbeing: Option<u8>,
) -> Recommendation {
    let (Some(completion), Some(wellbeing)) = (plan_completion, wellbeing) else {
        return Recommendation::CompleteWeekFirst;
    };

    if let Some(previous) = previous {
        debug!(
            week = current.week_number,
            previous_week = previous.week_number,
            previous_actual = ?previous.actual_fatigue,
            "recommending with previous week context"
        );
    }

    let completion = completion / 100.0;
    let low_completion = completion < LOW_COMPLETION;
    let low_wellbeing = wellbeing <= LOW_WELLBEING;

    if low_completion && low_wellbeing {
        Recommendation::WaveBreaking
    } else if low_wellbeing {
        Recommendation::MonitorRecovery
    } else if completion >= HIGH_COMPLETION && wellbeing >= HIGH_WELLBEING {
        Recommendation::Excellent
    } else {
        match current.phase {
            Phase::Loading => Recommendation::PeakLoad {
                week_number: current.week_number,
            },
            Phase::Deload => Recommendation::Deload {
                week_number: current.week_number,
            },
        }
    }
}

/// Revise the next week's target from this week's outcome
pub fn adjust_next(plan_completion: Option<f64>, wellbeing: Option<u8>, original_target: f64) -> f64 {
    let (Some(completion), Some(wellbeing)) = (plan_completion, wellbeing) else {
        return original_target;
    };

    let completion = completion / 100.0;
    let factor = if completion < POOR_COMPLETION || wellbeing <= LOW_WELLBEING {
        REDUCE_FACTOR
    } else if completion >= HIGH_COMPLETION && wellbeing >= HIGH_WELLBEING {
        PROGRESS_FACTOR
    } else {
        1.0
    };

    (original_target * factor).clamp(0.0, 1.0)
}

/// Fatigue actually absorbed in a logged week. Not clamped to [0, 1].
pub fn actual_fatigue(target_fatigue: f64, plan_completion: f64, wellbeing: u8) -> f64 {
    target_fatigue * (plan_completion / 100.0) * (2.0 - f64::from(wellbeing) / 5.0)
}

/// Result of logging a week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekLogOutcome {
    pub actual_fatigue: f64,
    /// Revised target of the following week, if there is one
    pub next_target: Option<f64>,
}

fn validate_outcome(plan_completion: f64, wellbeing: u8) -> Result<()> {
    if !plan_completion.is_finite() || !(0.0..=100.0).contains(&plan_completion) {
        return Err(PlannerError::Validation(format!(
            "Plan completion must be between 0 and 100, got {}",
            plan_completion
        )));
    }
    if !(1..=5).contains(&wellbeing) {
        return Err(PlannerError::Validation(format!(
            "Wellbeing must be between 1 and 5, got {}",
            wellbeing
        )));
    }
    Ok(())
}

/// Record a week's outcome and revise the next week's target.
///
/// Logging the same week again overwrites its outcome, but the next week's
/// target is revised from its current value each time, so repeated logs
/// compound.
pub fn log_week(
    cycle: &mut TrainingCycle,
    week_index: usize,
    plan_completion: f64,
    wellbeing: u8,
) -> Result<WeekLogOutcome> {
    let len = cycle.weeks().len();
    if week_index >= len {
        warn!(week_index, len, "rejecting log for missing week");
        return Err(PlannerError::WeekOutOfRange { index: week_index, len });
    }
    validate_outcome(plan_completion, wellbeing)?;

    let week = cycle.week_mut(week_index)?;
    let fatigue = actual_fatigue(week.target_fatigue, plan_completion, wellbeing);
    week.plan_completion = Some(plan_completion);
    week.wellbeing = Some(wellbeing);
    week.actual_fatigue = Some(fatigue);
    let week_number = week.week_number;

    let next_target = if week_index + 1 < len {
        let next = cycle.week_mut(week_index + 1)?;
        let revised = adjust_next(Some(plan_completion), Some(wellbeing), next.target_fatigue);
        debug!(
            week = next.week_number,
            from = next.target_fatigue,
            to = revised,
            "revised next week target"
        );
        next.target_fatigue = revised;
        Some(revised)
    } else {
        None
    };

    info!(
        cycle = %cycle.id,
        week = week_number,
        plan_completion,
        wellbeing,
        actual_fatigue = fatigue,
        "week logged"
    );

    Ok(WeekLogOutcome {
        actual_fatigue: fatigue,
        next_target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggressiveness, CycleDuration, Goal};
    use chrono::Utc;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn strength_cycle() -> TrainingCycle {
        let mut cycle = TrainingCycle::new(
            Goal::Strength,
            CycleDuration::SIX,
            Utc::now(),
            Aggressiveness::Moderate,
            0.5,
            None,
        );
        cycle.populate_wave().unwrap();
        cycle
    }

    #[test]
    fn test_adjust_next_worked_examples() {
        assert_close(adjust_next(Some(60.0), Some(1), 0.5), 0.45);
        assert_close(adjust_next(Some(98.0), Some(5), 0.5), 0.525);
        assert_close(adjust_next(Some(85.0), Some(3), 0.5), 0.5);
    }

    #[test]
    fn test_adjust_next_edges() {
        assert_eq!(adjust_next(None, Some(5), 0.5), 0.5);
        assert_eq!(adjust_next(Some(100.0), None, 0.5), 0.5);
        // Low wellbeing alone reduces
        assert_close(adjust_next(Some(100.0), Some(2), 0.6), 0.54);
        // Poor completion alone reduces
        assert_close(adjust_next(Some(69.0), Some(5), 0.6), 0.54);
        // Growth is clamped
        assert_eq!(adjust_next(Some(100.0), Some(5), 0.99), 1.0);
    }

    #[test]
    fn test_recommend_branch_order() {
        let loading = CycleWeek::new(2, 0.6, Phase::Loading);
        let deload = CycleWeek::new(3, 0.4, Phase::Deload);

        assert_eq!(
            recommend(&loading, None, None, Some(3)),
            Recommendation::CompleteWeekFirst
        );
        assert_eq!(
            recommend(&loading, None, Some(70.0), Some(1)),
            Recommendation::WaveBreaking
        );
        assert_eq!(
            recommend(&loading, None, Some(100.0), Some(2)),
            Recommendation::MonitorRecovery
        );
        assert_eq!(
            recommend(&deload, None, Some(95.0), Some(4)),
            Recommendation::Excellent
        );
        assert_eq!(
            recommend(&loading, Some(&deload), Some(85.0), Some(3)),
            Recommendation::PeakLoad { week_number: 2 }
        );
        assert_eq!(
            recommend(&deload, Some(&loading), Some(50.0), Some(3)),
            Recommendation::Deload { week_number: 3 }
        );
    }

    #[test]
    fn test_recommendation_text() {
        assert!(Recommendation::WaveBreaking
            .to_string()
            .starts_with("Wave is close to breaking"));
        assert_eq!(
            Recommendation::PeakLoad { week_number: 4 }.to_string(),
            "Week 4: PEAK LOAD. Complete 95-100% of plan."
        );
        assert_eq!(
            Recommendation::Deload { week_number: 3 }.to_string(),
            "Week 3: DELOAD. Focus on recovery."
        );
    }

    #[test]
    fn test_log_week_sets_outcome_and_adjusts_next() {
        let mut cycle = strength_cycle();
        let target = cycle.weeks()[0].target_fatigue;
        let next_before = cycle.weeks()[1].target_fatigue;

        let outcome = log_week(&mut cycle, 0, 60.0, 1).unwrap();

        let week = &cycle.weeks()[0];
        assert!(week.is_completed());
        assert_eq!(week.plan_completion, Some(60.0));
        assert_eq!(week.wellbeing, Some(1));
        assert_close(outcome.actual_fatigue, target * 0.6 * 1.8);
        assert_close(cycle.weeks()[1].target_fatigue, next_before * 0.9);
        assert_eq!(outcome.next_target, Some(cycle.weeks()[1].target_fatigue));
    }

    #[test]
    fn test_log_last_week_has_no_next() {
        let mut cycle = strength_cycle();
        let outcome = log_week(&mut cycle, 5, 90.0, 3).unwrap();
        assert_eq!(outcome.next_target, None);
        assert_eq!(cycle.weeks().len(), 6);
    }

    #[test]
    fn test_relogging_compounds_next_week() {
        let mut once = strength_cycle();
        let mut twice = once.clone();

        let first = log_week(&mut once, 1, 100.0, 5).unwrap();
        log_week(&mut twice, 1, 100.0, 5).unwrap();
        let second = log_week(&mut twice, 1, 100.0, 5).unwrap();

        assert_eq!(first.actual_fatigue, second.actual_fatigue);
        assert_ne!(once.weeks()[2].target_fatigue, twice.weeks()[2].target_fatigue);
        assert_close(
            twice.weeks()[2].target_fatigue,
            once.weeks()[2].target_fatigue * 1.05,
        );
    }

    #[test]
    fn test_actual_fatigue_is_not_clamped() {
        // Full completion with the worst wellbeing exceeds 1.0
        assert_close(actual_fatigue(0.9, 100.0, 1), 1.62);
        assert!(actual_fatigue(0.9, 100.0, 1) > 1.0);
    }

    #[test]
    fn test_log_week_rejects_bad_input() {
        let mut cycle = strength_cycle();
        let before = cycle.clone();

        assert!(matches!(
            log_week(&mut cycle, 6, 80.0, 3),
            Err(PlannerError::WeekOutOfRange { index: 6, len: 6 })
        ));
        assert!(matches!(
            log_week(&mut cycle, 0, 120.0, 3),
            Err(PlannerError::Validation(_))
        ));
        assert!(matches!(
            log_week(&mut cycle, 0, 80.0, 0),
            Err(PlannerError::Validation(_))
        ));
        assert!(log_week(&mut cycle, 0, f64::NAN, 3).is_err());
        assert_eq!(cycle, before);
    }
}
