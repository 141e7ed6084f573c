//! Derived week and cycle metrics
//!
//! Week metrics are recomputed from logged session data whenever it
//! changes. Cycle status is never stored; it is evaluated against a caller
//! supplied `now`. Cycle summaries and cross-cycle insights are derived from
//! logged week outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{CycleStatus, DayPlan, Goal, Phase, TrainingCycle, TrainingSession};

/// Completed cycles needed before insights are drawn
pub const MIN_CYCLES_FOR_INSIGHTS: usize = 2;

/// Average plan completion (percent) that counts as consistent
const CONSISTENT_COMPLETION: f64 = 90.0;

/// Aggregated training metrics for a week
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekMetrics {
    /// Total volume in kg (reps x weight)
    pub total_volume: Option<f64>,
    /// Mean RPE (1-10)
    pub average_rpe: Option<f64>,
    /// Mean intensity, percent of one-rep max
    pub average_intensity: Option<f64>,
    /// Days with at least one completed set
    pub training_days: u32,
}

/// A session counts toward weekly aggregates once any of its sets is done
pub fn session_qualifies(session: &TrainingSession) -> bool {
    session.sets.iter().any(|set| set.completed)
}

pub fn session_volume(session: &TrainingSession) -> f64 {
    session.sets.iter().map(|set| set.volume()).sum()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

impl WeekMetrics {
    pub fn from_day_plans(day_plans: &[DayPlan]) -> Self {
        let training_days = day_plans
            .iter()
            .filter(|day| day.sessions.iter().any(session_qualifies))
            .count() as u32;

        let qualifying: Vec<&TrainingSession> = day_plans
            .iter()
            .flat_map(|day| day.sessions.iter())
            .filter(|session| session_qualifies(session))
            .collect();

        if qualifying.is_empty() {
            return Self {
                training_days,
                ..Self::default()
            };
        }

        let sets = || qualifying.iter().flat_map(|session| session.sets.iter());

        Self {
            total_volume: Some(qualifying.iter().map(|s| session_volume(s)).sum()),
            average_rpe: mean(sets().filter_map(|set| set.rpe).map(f64::from)),
            average_intensity: mean(sets().filter_map(|set| set.intensity)),
            training_days,
        }
    }
}

impl TrainingCycle {
    // An end past the calendar range means the cycle never finishes
    fn window_end(&self) -> DateTime<Utc> {
        self.end_date().unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date && now <= self.window_end()
    }

    pub fn is_completed_at(&self, now: DateTime<Utc>) -> bool {
        now > self.window_end()
    }

    pub fn is_upcoming_at(&self, now: DateTime<Utc>) -> bool {
        now < self.start_date
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> CycleStatus {
        if self.is_upcoming_at(now) {
            CycleStatus::Upcoming
        } else if self.is_completed_at(now) {
            CycleStatus::Completed
        } else {
            CycleStatus::Active
        }
    }

    /// 1-based week number in progress at `now`, if the cycle is active
    pub fn current_week_at(&self, now: DateTime<Utc>) -> Option<u32> {
        if !self.is_active_at(now) {
            return None;
        }
        let elapsed = (now - self.start_date).num_weeks().max(0) as u32;
        Some((elapsed + 1).min(self.duration().weeks()))
    }

    pub fn status(&self) -> CycleStatus {
        self.status_at(Utc::now())
    }

    pub fn current_week(&self) -> Option<u32> {
        self.current_week_at(Utc::now())
    }
}

/// Logged outcome averages for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub goal: Goal,
    pub weeks: u32,
    /// Weeks with completion, wellbeing and actual fatigue logged
    pub logged_weeks: u32,
    /// Mean plan completion (percent) over weeks that have one
    pub average_completion: Option<f64>,
    /// Mean wellbeing (1-5) over weeks that have one
    pub average_wellbeing: Option<f64>,
    pub mean_target_fatigue: f64,
    pub mean_actual_fatigue: Option<f64>,
}

impl CycleSummary {
    pub fn of(cycle: &TrainingCycle) -> Self {
        let weeks = cycle.weeks();
        Self {
            cycle_id: cycle.id,
            goal: cycle.goal,
            weeks: cycle.duration().weeks(),
            logged_weeks: weeks.iter().filter(|w| w.is_completed()).count() as u32,
            average_completion: mean(weeks.iter().filter_map(|w| w.plan_completion)),
            average_wellbeing: mean(weeks.iter().filter_map(|w| w.wellbeing).map(f64::from)),
            mean_target_fatigue: cycle.mean_target_fatigue(),
            mean_actual_fatigue: mean(weeks.iter().filter_map(|w| w.actual_fatigue)),
        }
    }
}

/// Observation drawn across completed cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Insight {
    /// Fewer than [`MIN_CYCLES_FOR_INSIGHTS`] cycles have finished
    NeedMoreCycles { completed: usize },
    /// Cycles that scheduled two deload weeks back to back
    ConsecutiveDeloads { cycles: usize },
    ConsistentCompletion { average_completion: f64 },
    /// Enough history, nothing notable yet
    KeepTraining,
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insight::NeedMoreCycles { completed } => write!(
                f,
                "Complete more cycles to get insights ({} of {} done)",
                completed, MIN_CYCLES_FOR_INSIGHTS
            ),
            Insight::ConsecutiveDeloads { cycles } => write!(
                f,
                "{} of your completed cycles had two deload weeks in a row. Compare how you peaked after them.",
                cycles
            ),
            Insight::ConsistentCompletion { average_completion } => write!(
                f,
                "You consistently complete {:.0}% of your planned training. Great consistency!",
                average_completion
            ),
            Insight::KeepTraining => f.write_str("Keep training to unlock more insights"),
        }
    }
}

pub fn has_consecutive_deloads(cycle: &TrainingCycle) -> bool {
    cycle
        .weeks()
        .windows(2)
        .any(|pair| pair.iter().all(|w| w.phase == Phase::Deload))
}

/// Insights over the cycles completed by `now`; never empty
pub fn insights(cycles: &[TrainingCycle], now: DateTime<Utc>) -> Vec<Insight> {
    let completed: Vec<&TrainingCycle> = cycles.iter().filter(|c| c.is_completed_at(now)).collect();
    if completed.len() < MIN_CYCLES_FOR_INSIGHTS {
        return vec![Insight::NeedMoreCycles {
            completed: completed.len(),
        }];
    }

    let mut found = Vec::new();

    let double_deloads = completed.iter().filter(|c| has_consecutive_deloads(c)).count();
    if double_deloads > 0 {
        found.push(Insight::ConsecutiveDeloads {
            cycles: double_deloads,
        });
    }

    let completions = completed
        .iter()
        .flat_map(|c| c.weeks())
        .filter_map(|w| w.plan_completion);
    if let Some(average_completion) = mean(completions) {
        if average_completion >= CONSISTENT_COMPLETION {
            found.push(Insight::ConsistentCompletion { average_completion });
        }
    }

    if found.is_empty() {
        found.push(Insight::KeepTraining);
    }
    found
}
