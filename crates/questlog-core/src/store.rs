//! # XP Store
//!
//! Deterministic XP bookkeeping for Questlog.
//!
//! This module defines the `XpStore` trait and its in-memory implementation.
//! All data structures use `BTreeMap` for deterministic ordering.
//!
//! XP is tracked twice: a lifetime total per user (the all-time leaderboard)
//! and a per-day bucket keyed by `(day, user)` (the period leaderboards).
//! Days are plain day numbers supplied by the caller, so the store never
//! reads a clock.

use crate::focus::FocusCompletion;
use crate::{LeaderboardEntry, QuestlogError, SessionId, UserId, Xp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// XPSTORE TRAIT
// =============================================================================

/// The XpStore trait defines the ledger operations.
///
/// All fallible operations return `Result<T, QuestlogError>` to support both
/// in-memory and persistent storage backends uniformly.
pub trait XpStore {
    /// Lifetime XP of a user, `None` if the user has never earned XP.
    fn total_xp(&self, user: &UserId) -> Result<Option<Xp>, QuestlogError>;

    /// Add XP to a user on the given day. Returns the new lifetime total.
    fn add_xp(&mut self, user: &UserId, amount: u64, day: u64) -> Result<Xp, QuestlogError>;

    /// Lifetime totals of every user, ordered by user id.
    fn snapshot(&self) -> Result<Vec<LeaderboardEntry>, QuestlogError>;

    /// XP earned per user within `from_day..=to_day`, ordered by user id.
    /// Users without XP in the window are omitted.
    fn period_snapshot(
        &self,
        from_day: u64,
        to_day: u64,
    ) -> Result<Vec<LeaderboardEntry>, QuestlogError>;

    /// Record a completed focus session and credit its XP atomically.
    ///
    /// Returns the user's new lifetime total, or
    /// `SessionAlreadyRecorded` if the session id was seen before.
    fn record_completion(
        &mut self,
        completion: &FocusCompletion,
        day: u64,
    ) -> Result<Xp, QuestlogError>;

    /// Look up a recorded completion.
    fn completion(&self, session: &SessionId) -> Result<Option<FocusCompletion>, QuestlogError>;

    /// Number of users with an XP record.
    fn user_count(&self) -> Result<usize, QuestlogError>;

    /// Number of recorded focus sessions.
    fn completion_count(&self) -> Result<usize, QuestlogError>;

    /// Full contents, for export.
    fn export_snapshot(&self) -> Result<LedgerSnapshot, QuestlogError>;
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// XP earned by one user on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyXp {
    pub day: u64,
    pub user_id: UserId,
    pub xp: Xp,
}

/// A completion together with the day it was credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedCompletion {
    pub day: u64,
    pub completion: FocusCompletion,
}

/// Complete, ordered contents of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub totals: Vec<LeaderboardEntry>,
    pub daily: Vec<DailyXp>,
    pub completions: Vec<DatedCompletion>,
}

impl LedgerSnapshot {
    /// Sum of all lifetime totals (saturating).
    #[must_use]
    pub fn total_xp(&self) -> Xp {
        self.totals
            .iter()
            .fold(Xp::ZERO, |acc, entry| acc.saturating_add(entry.xp.value()))
    }

    /// Check the snapshot is well formed before it is loaded.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` if an id is malformed, a
    /// user, day bucket or session appears twice, or a user's day buckets
    /// add up to more than their lifetime total.
    pub fn validate(&self) -> Result<(), QuestlogError> {
        let mut totals: BTreeMap<&UserId, Xp> = BTreeMap::new();
        for entry in &self.totals {
            entry.user_id.validate()?;
            if totals.insert(&entry.user_id, entry.xp).is_some() {
                return Err(QuestlogError::InvalidArgument(format!(
                    "duplicate total for user '{}'",
                    entry.user_id
                )));
            }
        }

        let mut buckets: BTreeSet<(u64, &UserId)> = BTreeSet::new();
        let mut earned: BTreeMap<&UserId, Xp> = BTreeMap::new();
        for bucket in &self.daily {
            bucket.user_id.validate()?;
            if !buckets.insert((bucket.day, &bucket.user_id)) {
                return Err(QuestlogError::InvalidArgument(format!(
                    "duplicate day {} bucket for user '{}'",
                    bucket.day, bucket.user_id
                )));
            }
            let sum = earned.entry(&bucket.user_id).or_default();
            *sum = sum.saturating_add(bucket.xp.value());
        }
        for (user, sum) in earned {
            let total = totals.get(user).copied().unwrap_or(Xp::ZERO);
            if sum > total {
                return Err(QuestlogError::InvalidArgument(format!(
                    "day buckets of user '{}' sum to {} XP, above the lifetime total {}",
                    user,
                    sum.value(),
                    total.value()
                )));
            }
        }

        let mut sessions: BTreeSet<&SessionId> = BTreeSet::new();
        for dated in &self.completions {
            let completion = &dated.completion;
            completion.session_id.validate()?;
            completion.user_id.validate()?;
            if !sessions.insert(&completion.session_id) {
                return Err(QuestlogError::InvalidArgument(format!(
                    "duplicate session '{}'",
                    completion.session_id
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory XP store.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    totals: BTreeMap<UserId, Xp>,
    daily: BTreeMap<(u64, UserId), Xp>,
    completions: BTreeMap<SessionId, DatedCompletion>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from an exported snapshot.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` if the snapshot fails
    /// [`LedgerSnapshot::validate`].
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Result<Self, QuestlogError> {
        snapshot.validate()?;
        let totals = snapshot
            .totals
            .iter()
            .map(|e| (e.user_id.clone(), e.xp))
            .collect();
        let daily = snapshot
            .daily
            .iter()
            .map(|d| ((d.day, d.user_id.clone()), d.xp))
            .collect();
        let completions = snapshot
            .completions
            .iter()
            .map(|c| (c.completion.session_id.clone(), c.clone()))
            .collect();
        Ok(Self {
            totals,
            daily,
            completions,
        })
    }

    fn credit(&mut self, user: &UserId, amount: u64, day: u64) -> Xp {
        let total = self.totals.entry(user.clone()).or_default();
        *total = total.saturating_add(amount);
        let new_total = *total;

        let bucket = self.daily.entry((day, user.clone())).or_default();
        *bucket = bucket.saturating_add(amount);

        new_total
    }
}

impl XpStore for MemoryStore {
    fn total_xp(&self, user: &UserId) -> Result<Option<Xp>, QuestlogError> {
        Ok(self.totals.get(user).copied())
    }

    fn add_xp(&mut self, user: &UserId, amount: u64, day: u64) -> Result<Xp, QuestlogError> {
        Ok(self.credit(user, amount, day))
    }

    fn snapshot(&self) -> Result<Vec<LeaderboardEntry>, QuestlogError> {
        Ok(self
            .totals
            .iter()
            .map(|(user, xp)| LeaderboardEntry::new(user.clone(), *xp))
            .collect())
    }

    fn period_snapshot(
        &self,
        from_day: u64,
        to_day: u64,
    ) -> Result<Vec<LeaderboardEntry>, QuestlogError> {
        let mut sums: BTreeMap<&UserId, Xp> = BTreeMap::new();
        for ((_, user), xp) in self
            .daily
            .range((from_day, UserId::new(String::new()))..)
            .take_while(|((day, _), _)| *day <= to_day)
        {
            let sum = sums.entry(user).or_default();
            *sum = sum.saturating_add(xp.value());
        }
        Ok(sums
            .into_iter()
            .filter(|(_, xp)| xp.value() > 0)
            .map(|(user, xp)| LeaderboardEntry::new(user.clone(), xp))
            .collect())
    }

    fn record_completion(
        &mut self,
        completion: &FocusCompletion,
        day: u64,
    ) -> Result<Xp, QuestlogError> {
        if self.completions.contains_key(&completion.session_id) {
            return Err(QuestlogError::SessionAlreadyRecorded(
                completion.session_id.clone(),
            ));
        }
        let total = self.credit(&completion.user_id, completion.xp_earned, day);
        self.completions.insert(
            completion.session_id.clone(),
            DatedCompletion {
                day,
                completion: completion.clone(),
            },
        );
        Ok(total)
    }

    fn completion(&self, session: &SessionId) -> Result<Option<FocusCompletion>, QuestlogError> {
        Ok(self
            .completions
            .get(session)
            .map(|dated| dated.completion.clone()))
    }

    fn user_count(&self) -> Result<usize, QuestlogError> {
        Ok(self.totals.len())
    }

    fn completion_count(&self) -> Result<usize, QuestlogError> {
        Ok(self.completions.len())
    }

    fn export_snapshot(&self) -> Result<LedgerSnapshot, QuestlogError> {
        Ok(LedgerSnapshot {
            totals: self.snapshot()?,
            daily: self
                .daily
                .iter()
                .map(|((day, user), xp)| DailyXp {
                    day: *day,
                    user_id: user.clone(),
                    xp: *xp,
                })
                .collect(),
            completions: self.completions.values().cloned().collect(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
