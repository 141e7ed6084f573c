//! Persistence for training cycles
//!
//! The planner only sees [`CycleStore`]: a whole-collection load/save pair.
//! Implementations preserve every field of a cycle and refuse writes made
//! from an out-of-date view of the store: stale revisions, cycles another
//! writer added, and cycles another writer removed.

pub mod json;
pub mod sqlite;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::StorageError;
use crate::models::TrainingCycle;

/// Revisions a writer last loaded or saved, keyed by cycle id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    revisions: HashMap<Uuid, u64>,
}

impl Snapshot {
    pub fn of(cycles: &[TrainingCycle]) -> Self {
        Self {
            revisions: cycles.iter().map(|c| (c.id, c.revision)).collect(),
        }
    }

    pub fn revision(&self, id: &Uuid) -> Option<u64> {
        self.revisions.get(id).copied()
    }
}

/// Durable collection of cycles
pub trait CycleStore {
    /// Load every stored cycle; an empty store yields an empty list
    fn load(&self) -> Result<Vec<TrainingCycle>, StorageError>;

    /// Replace the stored collection with `cycles`.
    ///
    /// `seen` is the writer's last view of the store. Stored cycles left
    /// out of `cycles` are removed only if the writer saw them at their
    /// current revision.
    fn save(&mut self, cycles: &[TrainingCycle], seen: &Snapshot) -> Result<(), StorageError>;
}

fn conflict(id: Uuid, stored: u64, attempted: u64) -> StorageError {
    tracing::warn!(cycle = %id, stored, attempted, "rejecting stale cycle write");
    StorageError::Conflict {
        id: id.to_string(),
        stored,
        attempted,
    }
}

fn concurrent_change(id: Uuid, change: &'static str) -> StorageError {
    tracing::warn!(cycle = %id, change, "rejecting write over another writer's change");
    StorageError::ConcurrentChange {
        id: id.to_string(),
        change,
    }
}

/// Reject writes that would clobber a newer or diverged copy of a cycle.
///
/// A cycle may be re-saved unchanged at the same revision; a changed cycle
/// must carry a higher revision than the stored one. A stored cycle missing
/// from `incoming` must be in `seen` at its stored revision or newer, and a
/// cycle in `seen` that is no longer stored must not be written back.
pub fn check_revisions(
    stored: &[TrainingCycle],
    incoming: &[TrainingCycle],
    seen: &Snapshot,
) -> Result<(), StorageError> {
    let stored_by_id: HashMap<_, _> = stored.iter().map(|c| (c.id, c)).collect();

    for cycle in incoming {
        let Some(existing) = stored_by_id.get(&cycle.id) else {
            if seen.revision(&cycle.id).is_some() {
                return Err(concurrent_change(cycle.id, "deleted"));
            }
            continue;
        };
        let stale = existing.revision > cycle.revision
            || (existing.revision == cycle.revision && *existing != cycle);
        if stale {
            return Err(conflict(cycle.id, existing.revision, cycle.revision));
        }
    }

    let kept: HashSet<Uuid> = incoming.iter().map(|c| c.id).collect();
    for existing in stored.iter().filter(|c| !kept.contains(&c.id)) {
        match seen.revision(&existing.id) {
            None => return Err(concurrent_change(existing.id, "added")),
            Some(revision) if revision < existing.revision => {
                return Err(conflict(existing.id, existing.revision, revision));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

impl<S: CycleStore + ?Sized> CycleStore for Box<S> {
    fn load(&self) -> Result<Vec<TrainingCycle>, StorageError> {
        (**self).load()
    }

    fn save(&mut self, cycles: &[TrainingCycle], seen: &Snapshot) -> Result<(), StorageError> {
        (**self).save(cycles, seen)
    }
}

/// Volatile store, used for previews and tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    cycles: Vec<TrainingCycle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CycleStore for MemoryStore {
    fn load(&self) -> Result<Vec<TrainingCycle>, StorageError> {
        Ok(self.cycles.clone())
    }

    fn save(&mut self, cycles: &[TrainingCycle], seen: &Snapshot) -> Result<(), StorageError> {
        check_revisions(&self.cycles, cycles, seen)?;
        self.cycles = cycles.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggressiveness, CycleDuration, Goal};
    use chrono::Utc;

    fn sample_cycle() -> TrainingCycle {
        let mut cycle = TrainingCycle::new(
            Goal::Endurance,
            CycleDuration::FOUR,
            Utc::now(),
            Aggressiveness::Conservative,
            0.8,
            None,
        );
        cycle.populate_wave().unwrap();
        cycle
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let cycle = sample_cycle();
        store.save(&[cycle.clone()], &Snapshot::default()).unwrap();
        assert_eq!(store.load().unwrap(), vec![cycle]);
    }

    #[test]
    fn test_stale_revision_is_rejected() {
        let mut store = MemoryStore::new();
        let mut cycle = sample_cycle();
        cycle.revision = 2;
        store.save(&[cycle.clone()], &Snapshot::default()).unwrap();

        let mut stale = cycle.clone();
        stale.revision = 1;
        assert!(matches!(
            store.save(&[stale], &Snapshot::default()),
            Err(StorageError::Conflict { stored: 2, attempted: 1, .. })
        ));

        // Same revision with different content has diverged
        let mut diverged = cycle.clone();
        diverged.initial_freshness = 0.1;
        assert!(store.save(&[diverged], &Snapshot::default()).is_err());

        // Unchanged re-save and a bumped revision are both fine
        store.save(&[cycle.clone()], &Snapshot::default()).unwrap();
        let mut newer = cycle;
        newer.revision = 3;
        newer.initial_freshness = 0.1;
        store.save(&[newer], &Snapshot::default()).unwrap();
    }

    #[test]
    fn test_unseen_cycles_are_not_dropped() {
        let mut store = MemoryStore::new();
        let ours = sample_cycle();
        let theirs = sample_cycle();

        // Another writer saved a cycle after we loaded an empty store
        store.save(&[theirs.clone()], &Snapshot::default()).unwrap();
        assert!(matches!(
            store.save(&[ours.clone()], &Snapshot::default()),
            Err(StorageError::ConcurrentChange { change: "added", .. })
        ));
        assert_eq!(store.load().unwrap(), vec![theirs.clone()]);

        // Once seen, leaving it out is a deliberate delete
        store.save(&[ours.clone()], &Snapshot::of(&[theirs])).unwrap();
        assert_eq!(store.load().unwrap(), vec![ours]);
    }

    #[test]
    fn test_removal_of_a_newer_revision_is_rejected() {
        let mut store = MemoryStore::new();
        let cycle = sample_cycle();
        store.save(&[cycle.clone()], &Snapshot::default()).unwrap();
        let seen = Snapshot::of(&[cycle.clone()]);

        let mut updated = cycle.clone();
        updated.revision += 1;
        updated.initial_freshness = 0.2;
        store.save(&[updated.clone()], &seen).unwrap();

        assert!(matches!(
            store.save(&[], &seen),
            Err(StorageError::Conflict { stored: 1, attempted: 0, .. })
        ));
        assert_eq!(store.load().unwrap(), vec![updated]);
    }

    #[test]
    fn test_deleted_cycle_is_not_written_back() {
        let mut store = MemoryStore::new();
        let cycle = sample_cycle();
        store.save(&[cycle.clone()], &Snapshot::default()).unwrap();
        let seen = Snapshot::of(&[cycle.clone()]);

        store.save(&[], &seen).unwrap();
        assert!(matches!(
            store.save(&[cycle], &seen),
            Err(StorageError::ConcurrentChange { change: "deleted", .. })
        ));
        assert!(store.load().unwrap().is_empty());
    }
}
