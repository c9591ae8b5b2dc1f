//! # Ledger
//!
//! High-level XP bookkeeping: manual awards, focus-session completions,
//! leaderboards and per-user standings.
//!
//! ## Storage Backends
//!
//! A ledger runs on one of two backends:
//! - `InMemory`: uses [`MemoryStore`] (fast, volatile unless exported)
//! - `Persistent`: uses [`RedbStore`] for disk-backed ACID storage
//!
//! Ranks are never stored. Every leaderboard or standing query takes a fresh
//! snapshot and runs it through [`RankingEngine`].

use crate::focus::{FocusCompletion, FocusSession};
use crate::primitives::{MAX_AWARD_AMOUNT, MAX_LEADERBOARD_SIZE, WEEKLY_WINDOW_DAYS};
use crate::ranking::RankingEngine;
use crate::storage::RedbStore;
use crate::store::{LedgerSnapshot, MemoryStore, XpStore};
use crate::xp::XpCalculator;
use crate::{QuestlogError, RankedEntry, SessionId, UserId, Xp};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// LEADERBOARD PERIOD
// =============================================================================

/// Time window a leaderboard covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    #[default]
    AllTime,
    /// The last seven days, today included.
    Weekly,
    /// Today only.
    Daily,
}

impl LeaderboardPeriod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardPeriod::AllTime => "all_time",
            LeaderboardPeriod::Weekly => "weekly",
            LeaderboardPeriod::Daily => "daily",
        }
    }

    /// Inclusive day window for `today`, `None` for all-time.
    #[must_use]
    pub fn window(&self, today: u64) -> Option<(u64, u64)> {
        match self {
            LeaderboardPeriod::AllTime => None,
            LeaderboardPeriod::Weekly => {
                Some((today.saturating_sub(WEEKLY_WINDOW_DAYS - 1), today))
            }
            LeaderboardPeriod::Daily => Some((today, today)),
        }
    }
}

impl std::str::FromStr for LeaderboardPeriod {
    type Err = QuestlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_time" | "all-time" | "alltime" => Ok(LeaderboardPeriod::AllTime),
            "weekly" | "week" => Ok(LeaderboardPeriod::Weekly),
            "daily" | "day" | "today" => Ok(LeaderboardPeriod::Daily),
            other => Err(QuestlogError::InvalidArgument(format!(
                "unknown leaderboard period '{}'. Use: all_time, weekly, daily",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// USER STANDING
// =============================================================================

/// A user's position on the all-time leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStanding {
    pub user_id: UserId,
    pub xp: Xp,
    pub level: u64,
    pub level_progress_percent: u8,
    pub rank: u32,
    pub ranked_users: usize,
}

/// Aggregate ledger counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub user_count: usize,
    pub completed_sessions: usize,
    pub total_xp: Xp,
}

// =============================================================================
// LEDGER
// =============================================================================

/// Storage backend for a Ledger.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// The XP ledger.
///
/// Single writer: callers that share a ledger across tasks wrap it in a
/// lock, which also serialises concurrent awards to the same user.
#[derive(Debug, Default)]
pub struct Ledger {
    backend: StorageBackend,
}

impl Ledger {
    /// Create an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger backed by a redb database at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, QuestlogError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Create an in-memory ledger from an exported snapshot.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` if the snapshot is malformed.
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Result<Self, QuestlogError> {
        Ok(Self {
            backend: StorageBackend::InMemory(MemoryStore::from_snapshot(snapshot)?),
        })
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn store(&self) -> &dyn XpStore {
        match &self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn XpStore {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    /// Grant `amount` XP to a user on `day`. Returns the new lifetime total.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` if the user id is malformed
    /// or `amount` is zero or above `MAX_AWARD_AMOUNT`.
    pub fn award(&mut self, user: &UserId, amount: u64, day: u64) -> Result<Xp, QuestlogError> {
        user.validate()?;
        if amount == 0 || amount > MAX_AWARD_AMOUNT {
            return Err(QuestlogError::InvalidArgument(format!(
                "award amount must be within 1..={}, got {}",
                MAX_AWARD_AMOUNT, amount
            )));
        }
        self.store_mut().add_xp(user, amount, day)
    }

    /// Complete an active focus session and credit its XP on `day`.
    ///
    /// The session transitions to `Completed` only if the ledger accepted
    /// the record.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the session or user id is malformed
    /// - `InvalidTransition` if the session is no longer active
    /// - `SessionAlreadyRecorded` if the session id was credited before
    pub fn complete_session(
        &mut self,
        session: &mut FocusSession,
        day: u64,
    ) -> Result<(FocusCompletion, Xp), QuestlogError> {
        session.session_id.validate()?;
        session.user_id.validate()?;
        if session.state().is_terminal() {
            return Err(QuestlogError::InvalidTransition {
                from: session.state().name(),
                to: "completed",
            });
        }
        if self.store().completion(&session.session_id)?.is_some() {
            return Err(QuestlogError::SessionAlreadyRecorded(
                session.session_id.clone(),
            ));
        }

        let mut finished = session.clone();
        finished.complete()?;
        let completion = finished.completion().ok_or(QuestlogError::InvalidTransition {
            from: finished.state().name(),
            to: "completed",
        })?;

        let total = self.store_mut().record_completion(&completion, day)?;
        *session = finished;
        Ok((completion, total))
    }

    /// Look up a recorded completion.
    pub fn completion(&self, session: &SessionId) -> Result<Option<FocusCompletion>, QuestlogError> {
        self.store().completion(session)
    }

    /// Lifetime XP of a user.
    pub fn total_xp(&self, user: &UserId) -> Result<Option<Xp>, QuestlogError> {
        self.store().total_xp(user)
    }

    /// Ranked leaderboard for `period`, truncated to `limit` rows.
    pub fn leaderboard(
        &self,
        period: LeaderboardPeriod,
        today: u64,
        limit: usize,
    ) -> Result<Vec<RankedEntry>, QuestlogError> {
        if limit > MAX_LEADERBOARD_SIZE {
            return Err(QuestlogError::InvalidArgument(format!(
                "limit {} exceeds maximum {}",
                limit, MAX_LEADERBOARD_SIZE
            )));
        }
        let snapshot = match period.window(today) {
            None => self.store().snapshot()?,
            Some((from, to)) => self.store().period_snapshot(from, to)?,
        };
        let ranked = RankingEngine::rank(&snapshot);
        Ok(RankingEngine::top(&ranked, limit))
    }

    /// A user's all-time standing.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::UserNotFound` if the user has no XP record.
    pub fn standing(&self, user: &UserId) -> Result<UserStanding, QuestlogError> {
        let snapshot = self.store().snapshot()?;
        let ranked = RankingEngine::rank(&snapshot);
        let row = ranked
            .iter()
            .find(|entry| &entry.user_id == user)
            .ok_or_else(|| QuestlogError::UserNotFound(user.clone()))?;

        Ok(UserStanding {
            user_id: row.user_id.clone(),
            xp: row.xp,
            level: XpCalculator::level_for(row.xp),
            level_progress_percent: XpCalculator::level_progress_percent(row.xp),
            rank: row.rank,
            ranked_users: ranked.len(),
        })
    }

    /// Aggregate counters.
    pub fn stats(&self) -> Result<LedgerStats, QuestlogError> {
        let store = self.store();
        let total_xp = store
            .snapshot()?
            .iter()
            .fold(Xp::ZERO, |acc, entry| acc.saturating_add(entry.xp.value()));
        Ok(LedgerStats {
            user_count: store.user_count()?,
            completed_sessions: store.completion_count()?,
            total_xp,
        })
    }

    /// Export the full ledger contents.
    pub fn export_snapshot(&self) -> Result<LedgerSnapshot, QuestlogError> {
        self.store().export_snapshot()
    }

    /// Load a snapshot into this ledger.
    ///
    /// In-memory ledgers are replaced wholesale; persistent ledgers must be
    /// empty. A malformed snapshot leaves the ledger untouched.
    pub fn import_snapshot(&mut self, snapshot: &LedgerSnapshot) -> Result<(), QuestlogError> {
        match &mut self.backend {
            StorageBackend::InMemory(store) => {
                *store = MemoryStore::from_snapshot(snapshot)?;
                Ok(())
            }
            StorageBackend::Persistent(store) => store.import_snapshot(snapshot),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn award_validates_amount() {
        let mut ledger = Ledger::new();
        assert!(matches!(
            ledger.award(&user("a"), 0, 1),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.award(&user("a"), MAX_AWARD_AMOUNT + 1, 1),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.award(&user(""), 5, 1),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert_eq!(ledger.award(&user("a"), 5, 1).expect("award"), Xp(5));
    }

    #[test]
    fn leaderboard_all_time() {
        let mut ledger = Ledger::new();
        ledger.award(&user("A"), 100, 1).expect("award");
        ledger.award(&user("B"), 100, 1).expect("award");
        ledger.award(&user("C"), 50, 1).expect("award");

        let board = ledger
            .leaderboard(LeaderboardPeriod::AllTime, 1, 10)
            .expect("board");
        let rows: Vec<(&str, u32)> = board
            .iter()
            .map(|e| (e.user_id.as_str(), e.rank))
            .collect();
        assert_eq!(rows, vec![("A", 1), ("B", 1), ("C", 3)]);
    }

    #[test]
    fn leaderboard_periods() {
        let mut ledger = Ledger::new();
        ledger.award(&user("old"), 500, 1).expect("award");
        ledger.award(&user("week"), 20, 15).expect("award");
        ledger.award(&user("today"), 10, 20).expect("award");

        let weekly = ledger
            .leaderboard(LeaderboardPeriod::Weekly, 20, 10)
            .expect("weekly");
        let ids: Vec<&str> = weekly.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["week", "today"]);

        let daily = ledger
            .leaderboard(LeaderboardPeriod::Daily, 20, 10)
            .expect("daily");
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].user_id.as_str(), "today");
    }

    #[test]
    fn leaderboard_limit() {
        let mut ledger = Ledger::new();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            ledger.award(&user(id), (i as u64 + 1) * 10, 0).expect("award");
        }
        let board = ledger
            .leaderboard(LeaderboardPeriod::AllTime, 0, 2)
            .expect("board");
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].user_id.as_str(), "d");
        assert!(
            ledger
                .leaderboard(LeaderboardPeriod::AllTime, 0, MAX_LEADERBOARD_SIZE + 1)
                .is_err()
        );
    }

    #[test]
    fn complete_session_credits_once() {
        let mut ledger = Ledger::new();
        let mut session = FocusSession::start(SessionId::new("s1"), user("a"), 10);
        session.advance(600).expect("advance");

        let (completion, total) = ledger.complete_session(&mut session, 3).expect("complete");
        assert_eq!(completion.xp_earned, 15);
        assert_eq!(total, Xp(15));
        assert!(session.state().is_terminal());

        let mut replay = FocusSession::with_elapsed(SessionId::new("s1"), user("a"), 10, 600);
        assert!(matches!(
            ledger.complete_session(&mut replay, 3),
            Err(QuestlogError::SessionAlreadyRecorded(_))
        ));
        assert!(!replay.state().is_terminal());
        assert_eq!(ledger.total_xp(&user("a")).expect("total"), Some(Xp(15)));
    }

    #[test]
    fn abandoned_session_cannot_complete() {
        let mut ledger = Ledger::new();
        let mut session = FocusSession::start(SessionId::new("s2"), user("a"), 0);
        session.abandon().expect("abandon");
        assert!(matches!(
            ledger.complete_session(&mut session, 1),
            Err(QuestlogError::InvalidTransition { .. })
        ));
        assert_eq!(ledger.stats().expect("stats").completed_sessions, 0);
    }

    #[test]
    fn standing_reports_rank_and_level() {
        let mut ledger = Ledger::new();
        ledger.award(&user("a"), 750, 1).expect("award");
        ledger.award(&user("b"), 900, 1).expect("award");

        let standing = ledger.standing(&user("a")).expect("standing");
        assert_eq!(standing.rank, 2);
        assert_eq!(standing.level, 2);
        assert_eq!(standing.level_progress_percent, 50);
        assert_eq!(standing.ranked_users, 2);

        assert!(matches!(
            ledger.standing(&user("nobody")),
            Err(QuestlogError::UserNotFound(_))
        ));
    }

    #[test]
    fn stats_and_snapshot() {
        let mut ledger = Ledger::new();
        ledger.award(&user("a"), 30, 1).expect("award");
        let mut session = FocusSession::with_elapsed(SessionId::new("s"), user("b"), 0, 600);
        ledger.complete_session(&mut session, 1).expect("complete");

        let stats = ledger.stats().expect("stats");
        assert_eq!(stats.user_count, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.total_xp, Xp(40));

        let snapshot = ledger.export_snapshot().expect("export");
        let restored = Ledger::from_snapshot(&snapshot).expect("restore");
        assert_eq!(restored.stats().expect("stats"), stats);
    }

    #[test]
    fn complete_session_rejects_empty_session_id() {
        let mut ledger = Ledger::new();
        let mut session = FocusSession::with_elapsed(SessionId::new(""), user("a"), 0, 600);
        assert!(matches!(
            ledger.complete_session(&mut session, 1),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert!(!session.state().is_terminal());
        assert_eq!(ledger.stats().expect("stats").completed_sessions, 0);
    }

    #[test]
    fn import_keeps_ledger_on_malformed_snapshot() {
        let mut ledger = Ledger::new();
        ledger.award(&user("a"), 30, 1).expect("award");

        let mut snapshot = ledger.export_snapshot().expect("export");
        snapshot.totals.push(snapshot.totals[0].clone());
        assert!(matches!(
            ledger.import_snapshot(&snapshot),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert_eq!(ledger.total_xp(&user("a")).expect("total"), Some(Xp(30)));
    }

    #[test]
    fn period_parsing() {
        assert_eq!(
            "weekly".parse::<LeaderboardPeriod>().expect("parse"),
            LeaderboardPeriod::Weekly
        );
        assert_eq!(
            "all_time".parse::<LeaderboardPeriod>().expect("parse"),
            LeaderboardPeriod::AllTime
        );
        assert!("monthly".parse::<LeaderboardPeriod>().is_err());
        assert_eq!(LeaderboardPeriod::Weekly.window(3), Some((0, 3)));
        assert_eq!(LeaderboardPeriod::Weekly.window(20), Some((14, 20)));
    }
}
