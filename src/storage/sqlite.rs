use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use super::{check_revisions, CycleStore, Snapshot};
use crate::error::StorageError;
use crate::models::TrainingCycle;

/// One row per cycle: indexed metadata plus the full JSON payload
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS cycles (
                id TEXT PRIMARY KEY,
                goal TEXT NOT NULL,
                start_date TEXT NOT NULL,
                duration_weeks INTEGER NOT NULL,
                revision INTEGER NOT NULL,
                payload TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cycles_start_date ON cycles (start_date)",
            [],
        )?;
        Ok(())
    }

    /// Number of stored cycles
    pub fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cycles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn read_cycles(conn: &Connection) -> Result<Vec<TrainingCycle>, StorageError> {
    let mut stmt = conn.prepare("SELECT payload FROM cycles ORDER BY start_date, id")?;
    let payloads = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut cycles = Vec::new();
    for payload in payloads {
        cycles.push(serde_json::from_str(&payload?)?);
    }
    Ok(cycles)
}

impl CycleStore for SqliteStore {
    fn load(&self) -> Result<Vec<TrainingCycle>, StorageError> {
        read_cycles(&self.conn)
    }

    fn save(&mut self, cycles: &[TrainingCycle], seen: &Snapshot) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        let stored = read_cycles(&tx)?;
        check_revisions(&stored, cycles, seen)?;

        for cycle in cycles {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO cycles (
                    id, goal, start_date, duration_weeks, revision, payload, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
                "#,
                params![
                    cycle.id.to_string(),
                    cycle.goal.to_string(),
                    cycle.start_date.to_rfc3339(),
                    cycle.duration().weeks(),
                    cycle.revision as i64,
                    serde_json::to_string(cycle)?,
                ],
            )?;
        }

        // Drop rows for cycles no longer in the collection
        let keep: HashSet<Uuid> = cycles.iter().map(|c| c.id).collect();
        for removed in stored.iter().filter(|c| !keep.contains(&c.id)) {
            tx.execute("DELETE FROM cycles WHERE id = ?1", params![removed.id.to_string()])?;
        }

        tx.commit()?;
        info!(count = cycles.len(), "saved cycles to sqlite");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptation::log_week;
    use crate::models::{Aggressiveness, CycleDuration, Goal};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn cycle(goal: Goal, day: u32) -> TrainingCycle {
        let mut cycle = TrainingCycle::new(
            goal,
            CycleDuration::EIGHT,
            Utc.with_ymd_and_hms(2026, 2, day, 6, 0, 0).unwrap(),
            Aggressiveness::Moderate,
            0.6,
            None,
        );
        cycle.populate_wave().unwrap();
        cycle
    }

    #[test]
    fn test_roundtrip_in_order() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let later = cycle(Goal::Mass, 20);
        let earlier = cycle(Goal::Strength, 2);

        store.save(&[later.clone(), earlier.clone()], &Snapshot::default()).unwrap();
        assert_eq!(store.load().unwrap(), vec![earlier, later]);
    }

    #[test]
    fn test_removed_cycles_are_deleted() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let a = cycle(Goal::Mass, 3);
        let b = cycle(Goal::Endurance, 4);
        store.save(&[a.clone(), b.clone()], &Snapshot::default()).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        store.save(&[a.clone()], &Snapshot::of(&[a, b])).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_stale_delete_keeps_the_newer_row() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let original = cycle(Goal::Mass, 5);
        store.save(&[original.clone()], &Snapshot::default()).unwrap();
        let seen = Snapshot::of(&[original.clone()]);

        let mut logged = original;
        log_week(&mut logged, 0, 95.0, 4).unwrap();
        logged.revision += 1;
        store.save(&[logged.clone()], &seen).unwrap();

        // A writer that never saw the logged week tries to delete the cycle
        assert!(matches!(
            store.save(&[], &seen),
            Err(StorageError::Conflict { stored: 1, attempted: 0, .. })
        ));
        assert_eq!(store.load().unwrap(), vec![logged]);
    }

    #[test]
    fn test_revision_conflict() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let original = cycle(Goal::Strength, 9);
        store.save(&[original.clone()], &Snapshot::default()).unwrap();

        let mut first = original.clone();
        log_week(&mut first, 0, 90.0, 4).unwrap();
        first.revision += 1;
        store.save(&[first], &Snapshot::default()).unwrap();

        // A second writer still holding revision 0 edits and saves
        let mut second = original;
        log_week(&mut second, 0, 40.0, 2).unwrap();
        assert!(matches!(
            store.save(&[second], &Snapshot::default()),
            Err(StorageError::Conflict { stored: 1, attempted: 0, .. })
        ));
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cycles.db");
        let saved = cycle(Goal::PeakForm, 16);

        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.save(&[saved.clone()], &Snapshot::default()).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), vec![saved]);
    }
}
