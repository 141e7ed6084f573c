//! Cycle construction and orchestration
//!
//! [`CycleBuilder`] is the validation boundary in front of the wave
//! generator. [`CyclePlanner`] owns the loaded cycles and an explicit store,
//! and routes every mutation through `log_week` before persisting.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::adaptation::{self, Recommendation, WeekLogOutcome};
use crate::error::{PlannerError, Result};
use crate::models::{Aggressiveness, CycleDuration, CycleWeek, DayPlan, Goal, TrainingCycle};
use crate::storage::{CycleStore, Snapshot};
use crate::wave;

/// Parameters for a new cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleBuilder {
    pub goal: Goal,
    pub weeks: u32,
    pub initial_freshness: f64,
    pub aggressiveness: Aggressiveness,
    pub start_date: DateTime<Utc>,
    pub peak_form_date: Option<DateTime<Utc>>,
}

impl Default for CycleBuilder {
    fn default() -> Self {
        Self {
            goal: Goal::Strength,
            weeks: CycleDuration::SIX.weeks(),
            initial_freshness: 0.5,
            aggressiveness: Aggressiveness::Moderate,
            start_date: Utc::now(),
            peak_form_date: None,
        }
    }
}

impl CycleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    pub fn duration(mut self, duration: CycleDuration) -> Self {
        self.weeks = duration.weeks();
        self
    }

    pub fn weeks(mut self, weeks: u32) -> Self {
        self.weeks = weeks;
        self
    }

    pub fn initial_freshness(mut self, freshness: f64) -> Self {
        self.initial_freshness = freshness;
        self
    }

    pub fn aggressiveness(mut self, aggressiveness: Aggressiveness) -> Self {
        self.aggressiveness = aggressiveness;
        self
    }

    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn peak_form_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.peak_form_date = date;
        self
    }

    /// Check every parameter the generator relies on
    pub fn validate(&self) -> Result<CycleDuration> {
        let duration = CycleDuration::new(self.weeks)?;

        if !self.initial_freshness.is_finite() || !(0.0..=1.0).contains(&self.initial_freshness) {
            return Err(PlannerError::Validation(format!(
                "Initial freshness must be between 0 and 1, got {}",
                self.initial_freshness
            )));
        }

        if let Some(peak) = self.peak_form_date {
            if peak < self.start_date {
                return Err(PlannerError::Validation(format!(
                    "Peak form date {} is before the cycle start {}",
                    peak.date_naive(),
                    self.start_date.date_naive()
                )));
            }
        }

        Ok(duration)
    }

    /// Generated weeks for the current parameters, without building a cycle
    pub fn preview(&self) -> Result<Vec<CycleWeek>> {
        let duration = self.validate()?;
        Ok(wave::generate_wave(
            duration.weeks(),
            self.initial_freshness,
            self.aggressiveness,
            self.goal,
        ))
    }

    /// Validate and build a cycle with its wave populated
    pub fn build(&self) -> Result<TrainingCycle> {
        let duration = self.validate().map_err(|e| {
            warn!(error = %e, "rejected cycle parameters");
            e
        })?;

        let mut cycle = TrainingCycle::new(
            self.goal,
            duration,
            self.start_date,
            self.aggressiveness,
            self.initial_freshness,
            self.peak_form_date,
        );
        cycle.populate_wave()?;

        info!(
            cycle = %cycle.id,
            goal = %cycle.goal,
            weeks = duration.weeks(),
            aggressiveness = %cycle.aggressiveness,
            freshness = cycle.initial_freshness,
            "cycle built"
        );
        Ok(cycle)
    }
}

/// Loaded cycles plus the store they persist to
pub struct CyclePlanner<S: CycleStore> {
    store: S,
    cycles: Vec<TrainingCycle>,
    seen: Snapshot,
}

impl<S: CycleStore> CyclePlanner<S> {
    /// Load all cycles from `store`
    pub fn load(store: S) -> Result<Self> {
        let cycles = store.load()?;
        let seen = Snapshot::of(&cycles);
        Ok(Self { store, cycles, seen })
    }

    pub fn cycles(&self) -> &[TrainingCycle] {
        &self.cycles
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Re-read cycles from the store, discarding unsaved state
    pub fn reload(&mut self) -> Result<()> {
        self.cycles = self.store.load()?;
        self.seen = Snapshot::of(&self.cycles);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&TrainingCycle> {
        self.cycles.iter().find(|c| c.id == id)
    }

    /// Find a cycle by full id or unique id prefix
    pub fn find(&self, id_or_prefix: &str) -> Result<&TrainingCycle> {
        let index = self.position(id_or_prefix)?;
        Ok(&self.cycles[index])
    }

    fn position(&self, id_or_prefix: &str) -> Result<usize> {
        let needle = id_or_prefix.trim().to_lowercase();
        let matches: Vec<usize> = self
            .cycles
            .iter()
            .enumerate()
            .filter(|(_, c)| !needle.is_empty() && c.id.to_string().starts_with(&needle))
            .map(|(i, _)| i)
            .collect();

        match matches.as_slice() {
            [index] => Ok(*index),
            [] => Err(PlannerError::CycleNotFound(id_or_prefix.to_string())),
            _ => Err(PlannerError::Validation(format!(
                "Cycle id prefix '{}' is ambiguous",
                id_or_prefix
            ))),
        }
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.cycles
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| PlannerError::CycleNotFound(id.to_string()))
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&self.cycles, &self.seen)?;
        self.seen = Snapshot::of(&self.cycles);
        Ok(())
    }

    pub fn add_cycle(&mut self, cycle: TrainingCycle) -> Result<Uuid> {
        let id = cycle.id;
        if self.get(id).is_some() {
            return Err(PlannerError::Validation(format!("Cycle {} already exists", id)));
        }
        self.cycles.push(cycle);
        if let Err(e) = self.persist() {
            self.cycles.pop();
            return Err(e);
        }
        info!(cycle = %id, "cycle added");
        Ok(id)
    }

    pub fn delete_cycle(&mut self, id: Uuid) -> Result<TrainingCycle> {
        let index = self.index_of(id)?;
        let removed = self.cycles.remove(index);
        if let Err(e) = self.persist() {
            self.cycles.insert(index, removed);
            return Err(e);
        }
        info!(cycle = %id, "cycle deleted");
        Ok(removed)
    }

    /// Apply `mutate` to one cycle, bump its revision and persist.
    ///
    /// The in-memory copy is rolled back if either step fails.
    fn mutate_cycle<T>(
        &mut self,
        id: Uuid,
        mutate: impl FnOnce(&mut TrainingCycle) -> Result<T>,
    ) -> Result<T> {
        let index = self.index_of(id)?;
        let previous = self.cycles[index].clone();

        let result = mutate(&mut self.cycles[index]).and_then(|value| {
            self.cycles[index].revision += 1;
            self.persist().map(|_| value)
        });
        if result.is_err() {
            self.cycles[index] = previous;
        }
        result
    }

    /// Log a week's outcome (0-based index) and persist the cycle
    pub fn log_week(
        &mut self,
        id: Uuid,
        week_index: usize,
        plan_completion: f64,
        wellbeing: u8,
    ) -> Result<WeekLogOutcome> {
        self.mutate_cycle(id, |cycle| {
            adaptation::log_week(cycle, week_index, plan_completion, wellbeing)
        })
    }

    /// Replace a week's day plans, re-deriving its metrics, and persist
    pub fn set_day_plans(&mut self, id: Uuid, week_index: usize, day_plans: Vec<DayPlan>) -> Result<()> {
        self.mutate_cycle(id, |cycle| cycle.set_day_plans(week_index, day_plans))
    }

    pub fn active_cycles(&self, now: DateTime<Utc>) -> Vec<&TrainingCycle> {
        self.cycles.iter().filter(|c| c.is_active_at(now)).collect()
    }

    pub fn completed_cycles(&self, now: DateTime<Utc>) -> Vec<&TrainingCycle> {
        self.cycles.iter().filter(|c| c.is_completed_at(now)).collect()
    }

    pub fn upcoming_cycles(&self, now: DateTime<Utc>) -> Vec<&TrainingCycle> {
        self.cycles.iter().filter(|c| c.is_upcoming_at(now)).collect()
    }

    /// First active cycle; several may overlap
    pub fn active_cycle(&self, now: DateTime<Utc>) -> Option<&TrainingCycle> {
        self.cycles.iter().find(|c| c.is_active_at(now))
    }
}

/// Guidance for whichever week of `cycle` is in progress at `now`
pub fn current_recommendation(cycle: &TrainingCycle, now: DateTime<Utc>) -> Recommendation {
    let Some(week_number) = cycle.current_week_at(now) else {
        return Recommendation::NotStarted;
    };
    let index = (week_number - 1) as usize;
    let Some(current) = cycle.week(index) else {
        return Recommendation::NotStarted;
    };
    let previous = index.checked_sub(1).and_then(|i| cycle.week(i));

    adaptation::recommend(current, previous, current.plan_completion, current.wellbeing)
}
