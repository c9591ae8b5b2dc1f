//! # redb-backed XP Storage
//!
//! A disk-backed XP store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! A focus-session completion and the XP it credits are written in the same
//! transaction, so a session can never be recorded without its award or
//! awarded twice.

use crate::focus::FocusCompletion;
use crate::store::{DailyXp, DatedCompletion, LedgerSnapshot, XpStore};
use crate::{LeaderboardEntry, QuestlogError, SessionId, UserId, Xp};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for lifetime totals: user id -> xp
const TOTALS: TableDefinition<&str, u64> = TableDefinition::new("totals");

/// Table for daily buckets: (day, user id) -> xp
/// Keyed day-first so a period is one contiguous range scan.
const DAILY: TableDefinition<(u64, &str), u64> = TableDefinition::new("daily");

/// Table for completed sessions: session id -> serialized DatedCompletion
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// A disk-backed XP store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create an XP database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuestlogError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| QuestlogError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TOTALS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(DAILY)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(SESSIONS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Load an exported snapshot into an empty database in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` if the snapshot is malformed
    /// or the database already holds XP records.
    pub fn import_snapshot(&mut self, snapshot: &LedgerSnapshot) -> Result<(), QuestlogError> {
        snapshot.validate()?;
        if self.user_count()? > 0 || self.completion_count()? > 0 {
            return Err(QuestlogError::InvalidArgument(
                "import target database is not empty".to_string(),
            ));
        }

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        {
            let mut totals = write_txn
                .open_table(TOTALS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            for entry in &snapshot.totals {
                totals
                    .insert(entry.user_id.as_str(), entry.xp.value())
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            }

            let mut daily = write_txn
                .open_table(DAILY)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            for bucket in &snapshot.daily {
                daily
                    .insert((bucket.day, bucket.user_id.as_str()), bucket.xp.value())
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            }

            let mut sessions = write_txn
                .open_table(SESSIONS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            for dated in &snapshot.completions {
                let bytes = postcard::to_allocvec(dated)
                    .map_err(|e| QuestlogError::SerializationError(e.to_string()))?;
                sessions
                    .insert(dated.completion.session_id.as_str(), bytes.as_slice())
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| QuestlogError::IoError(e.to_string()))
    }
}

/// Credit XP inside an open write transaction. Returns the new total.
fn credit(
    totals: &mut Table<'_, &'static str, u64>,
    daily: &mut Table<'_, (u64, &'static str), u64>,
    user: &UserId,
    amount: u64,
    day: u64,
) -> Result<Xp, QuestlogError> {
    let current = totals
        .get(user.as_str())
        .map_err(|e| QuestlogError::IoError(e.to_string()))?
        .map(|v| v.value())
        .unwrap_or(0);
    let new_total = current.saturating_add(amount);
    totals
        .insert(user.as_str(), new_total)
        .map_err(|e| QuestlogError::IoError(e.to_string()))?;

    let bucket = daily
        .get((day, user.as_str()))
        .map_err(|e| QuestlogError::IoError(e.to_string()))?
        .map(|v| v.value())
        .unwrap_or(0);
    daily
        .insert((day, user.as_str()), bucket.saturating_add(amount))
        .map_err(|e| QuestlogError::IoError(e.to_string()))?;

    Ok(Xp(new_total))
}

// =============================================================================
// XPSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl XpStore for RedbStore {
    fn total_xp(&self, user: &UserId) -> Result<Option<Xp>, QuestlogError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(TOTALS)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let result = table
            .get(user.as_str())
            .map_err(|e| QuestlogError::IoError(e.to_string()))?
            .map(|v| Xp(v.value()));
        Ok(result)
    }

    fn add_xp(&mut self, user: &UserId, amount: u64, day: u64) -> Result<Xp, QuestlogError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let total = {
            let mut totals = write_txn
                .open_table(TOTALS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            let mut daily = write_txn
                .open_table(DAILY)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            credit(&mut totals, &mut daily, user, amount, day)?
        };
        write_txn
            .commit()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        Ok(total)
    }

    fn snapshot(&self) -> Result<Vec<LeaderboardEntry>, QuestlogError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(TOTALS)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;

        let mut entries = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| QuestlogError::IoError(e.to_string()))?;
            entries.push(LeaderboardEntry::new(
                UserId::new(key.value()),
                Xp(value.value()),
            ));
        }
        Ok(entries)
    }

    fn period_snapshot(
        &self,
        from_day: u64,
        to_day: u64,
    ) -> Result<Vec<LeaderboardEntry>, QuestlogError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(DAILY)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;

        let mut sums: BTreeMap<UserId, Xp> = BTreeMap::new();
        for entry in table
            .range((from_day, "")..)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| QuestlogError::IoError(e.to_string()))?;
            let (day, user) = key.value();
            if day > to_day {
                break;
            }
            let sum = sums.entry(UserId::new(user)).or_default();
            *sum = sum.saturating_add(value.value());
        }
        Ok(sums
            .into_iter()
            .filter(|(_, xp)| xp.value() > 0)
            .map(|(user, xp)| LeaderboardEntry::new(user, xp))
            .collect())
    }

    fn record_completion(
        &mut self,
        completion: &FocusCompletion,
        day: u64,
    ) -> Result<Xp, QuestlogError> {
        let record = DatedCompletion {
            day,
            completion: completion.clone(),
        };
        let bytes = postcard::to_allocvec(&record)
            .map_err(|e| QuestlogError::SerializationError(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let outcome = {
            let mut sessions = write_txn
                .open_table(SESSIONS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            let already = sessions
                .get(completion.session_id.as_str())
                .map_err(|e| QuestlogError::IoError(e.to_string()))?
                .is_some();
            if already {
                None
            } else {
                sessions
                    .insert(completion.session_id.as_str(), bytes.as_slice())
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
                let mut totals = write_txn
                    .open_table(TOTALS)
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
                let mut daily = write_txn
                    .open_table(DAILY)
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
                Some(credit(
                    &mut totals,
                    &mut daily,
                    &completion.user_id,
                    completion.xp_earned,
                    day,
                )?)
            }
        };

        match outcome {
            Some(total) => {
                write_txn
                    .commit()
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
                Ok(total)
            }
            None => {
                write_txn
                    .abort()
                    .map_err(|e| QuestlogError::IoError(e.to_string()))?;
                Err(QuestlogError::SessionAlreadyRecorded(
                    completion.session_id.clone(),
                ))
            }
        }
    }

    fn completion(&self, session: &SessionId) -> Result<Option<FocusCompletion>, QuestlogError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(SESSIONS)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;

        match table
            .get(session.as_str())
            .map_err(|e| QuestlogError::IoError(e.to_string()))?
        {
            Some(data) => {
                let dated: DatedCompletion = postcard::from_bytes(data.value())
                    .map_err(|e| QuestlogError::SerializationError(e.to_string()))?;
                Ok(Some(dated.completion))
            }
            None => Ok(None),
        }
    }

    fn user_count(&self) -> Result<usize, QuestlogError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(TOTALS)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let len = table
            .len()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        Ok(len as usize)
    }

    fn completion_count(&self) -> Result<usize, QuestlogError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(SESSIONS)
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        let len = table
            .len()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;
        Ok(len as usize)
    }

    fn export_snapshot(&self) -> Result<LedgerSnapshot, QuestlogError> {
        let totals = self.snapshot()?;

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| QuestlogError::IoError(e.to_string()))?;

        let mut daily = Vec::new();
        {
            let table = read_txn
                .open_table(DAILY)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            for entry in table
                .iter()
                .map_err(|e| QuestlogError::IoError(e.to_string()))?
            {
                let (key, value) = entry.map_err(|e| QuestlogError::IoError(e.to_string()))?;
                let (day, user) = key.value();
                daily.push(DailyXp {
                    day,
                    user_id: UserId::new(user),
                    xp: Xp(value.value()),
                });
            }
        }

        let mut completions = Vec::new();
        {
            let table = read_txn
                .open_table(SESSIONS)
                .map_err(|e| QuestlogError::IoError(e.to_string()))?;
            for entry in table
                .iter()
                .map_err(|e| QuestlogError::IoError(e.to_string()))?
            {
                let (_, value) = entry.map_err(|e| QuestlogError::IoError(e.to_string()))?;
                let dated: DatedCompletion = postcard::from_bytes(value.value())
                    .map_err(|e| QuestlogError::SerializationError(e.to_string()))?;
                completions.push(dated);
            }
        }

        Ok(LedgerSnapshot {
            totals,
            daily,
            completions,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn completion(session: &str, user_id: &str, xp: u64) -> FocusCompletion {
        FocusCompletion {
            session_id: SessionId::new(session),
            user_id: user(user_id),
            elapsed_seconds: 900,
            streak_days: 2,
            xp_earned: xp,
        }
    }

    #[test]
    fn add_and_read_totals() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("xp.redb")).expect("open db");

        store.add_xp(&user("a"), 10, 1).expect("add");
        assert_eq!(store.add_xp(&user("a"), 4, 1).expect("add"), Xp(14));
        assert_eq!(store.total_xp(&user("a")).expect("get"), Some(Xp(14)));
        assert_eq!(store.total_xp(&user("zz")).expect("get"), None);
        assert_eq!(store.user_count().expect("count"), 1);
    }

    #[test]
    fn persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("xp.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.add_xp(&user("a"), 10, 1).expect("add");
            store
                .record_completion(&completion("s1", "b", 18), 2)
                .expect("record");
        }

        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            assert_eq!(store.total_xp(&user("a")).expect("get"), Some(Xp(10)));
            assert_eq!(store.total_xp(&user("b")).expect("get"), Some(Xp(18)));
            assert_eq!(
                store.completion(&SessionId::new("s1")).expect("get"),
                Some(completion("s1", "b", 18))
            );
        }
    }

    #[test]
    fn duplicate_completion_rolls_back() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("xp.redb")).expect("open db");

        store
            .record_completion(&completion("s1", "a", 10), 1)
            .expect("record");
        let second = store.record_completion(&completion("s1", "a", 10), 1);
        assert!(matches!(
            second,
            Err(QuestlogError::SessionAlreadyRecorded(_))
        ));
        assert_eq!(store.total_xp(&user("a")).expect("get"), Some(Xp(10)));
        assert_eq!(store.completion_count().expect("count"), 1);
    }

    #[test]
    fn period_snapshot_range_scan() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("xp.redb")).expect("open db");

        store.add_xp(&user("a"), 5, 10).expect("add");
        store.add_xp(&user("a"), 6, 12).expect("add");
        store.add_xp(&user("b"), 9, 12).expect("add");
        store.add_xp(&user("c"), 1, 13).expect("add");

        let window = store.period_snapshot(11, 12).expect("period");
        assert_eq!(
            window,
            vec![
                LeaderboardEntry::new(user("a"), Xp(6)),
                LeaderboardEntry::new(user("b"), Xp(9)),
            ]
        );
    }

    #[test]
    fn matches_memory_store() {
        let temp = tempdir().expect("temp dir");
        let mut redb = RedbStore::open(temp.path().join("xp.redb")).expect("open db");
        let mut memory = MemoryStore::new();

        for (id, amount, day) in [("a", 3, 1), ("b", 8, 1), ("a", 2, 2), ("c", 8, 3)] {
            redb.add_xp(&user(id), amount, day).expect("add");
            memory.add_xp(&user(id), amount, day).expect("add");
        }
        let c = completion("s9", "c", 7);
        redb.record_completion(&c, 3).expect("record");
        memory.record_completion(&c, 3).expect("record");

        assert_eq!(
            redb.export_snapshot().expect("export"),
            memory.export_snapshot().expect("export")
        );
        assert_eq!(
            redb.period_snapshot(1, 2).expect("period"),
            memory.period_snapshot(1, 2).expect("period")
        );
    }

    #[test]
    fn import_snapshot_into_empty_database() {
        let mut memory = MemoryStore::new();
        memory.add_xp(&user("a"), 40, 1).expect("add");
        memory
            .record_completion(&completion("s1", "b", 12), 2)
            .expect("record");
        let snapshot = memory.export_snapshot().expect("export");

        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("xp.redb")).expect("open db");
        store.import_snapshot(&snapshot).expect("import");
        assert_eq!(store.export_snapshot().expect("export"), snapshot);

        assert!(matches!(
            store.import_snapshot(&snapshot),
            Err(QuestlogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn import_rejects_inconsistent_snapshot() {
        let snapshot = LedgerSnapshot {
            totals: vec![LeaderboardEntry::new(user("a"), Xp(10))],
            daily: vec![DailyXp {
                day: 5,
                user_id: user("a"),
                xp: Xp(900),
            }],
            completions: Vec::new(),
        };

        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("xp.redb")).expect("open db");
        assert!(matches!(
            store.import_snapshot(&snapshot),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert_eq!(store.user_count().expect("count"), 0);
    }
}
