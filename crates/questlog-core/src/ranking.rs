//! # Ranking Engine
//!
//! Turns a snapshot of `(user, xp)` rows into a leaderboard.
//!
//! ## Competition Ranking
//!
//! Rows are ordered by descending XP. Tied rows share a rank and the next
//! distinct XP value takes its 1-based position, so ranks skip the values
//! consumed by a tie:
//!
//! ```text
//! A 100 -> 1
//! B 100 -> 1
//! C  50 -> 3
//! ```
//!
//! Ties keep their input order (stable sort), which makes results
//! reproducible for identical snapshots.

use crate::primitives::MAX_LEADERBOARD_SIZE;
use crate::{LeaderboardEntry, QuestlogError, RankedEntry, UserId};
use std::collections::BTreeSet;

/// The RankingEngine orders leaderboard snapshots.
///
/// It is stateless: every call reads an input snapshot and returns a new
/// ranked sequence without touching its input.
pub struct RankingEngine;

impl RankingEngine {
    /// Rank a snapshot using standard competition ranking.
    ///
    /// Duplicate user ids are treated as distinct rows. Use
    /// [`RankingEngine::rank_checked`] to reject them.
    #[must_use]
    pub fn rank(entries: &[LeaderboardEntry]) -> Vec<RankedEntry> {
        let mut sorted: Vec<&LeaderboardEntry> = entries.iter().collect();
        // sort_by is stable: equal XP keeps input order
        sorted.sort_by(|a, b| b.xp.cmp(&a.xp));

        let mut ranked: Vec<RankedEntry> = Vec::with_capacity(sorted.len());
        for (position, entry) in sorted.into_iter().enumerate() {
            let rank = match ranked.last() {
                Some(prev) if prev.xp == entry.xp => prev.rank,
                _ => u32::try_from(position.saturating_add(1)).unwrap_or(u32::MAX),
            };
            ranked.push(RankedEntry {
                user_id: entry.user_id.clone(),
                xp: entry.xp,
                rank,
            });
        }
        ranked
    }

    /// Validate a snapshot before ranking.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` if:
    /// - The snapshot exceeds `MAX_LEADERBOARD_SIZE` rows
    /// - Any user id is empty or oversized
    /// - A user id appears more than once
    ///
    /// One invalid row invalidates the whole snapshot.
    pub fn validate(entries: &[LeaderboardEntry]) -> Result<(), QuestlogError> {
        if entries.len() > MAX_LEADERBOARD_SIZE {
            return Err(QuestlogError::InvalidArgument(format!(
                "leaderboard size {} exceeds maximum {}",
                entries.len(),
                MAX_LEADERBOARD_SIZE
            )));
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for entry in entries {
            entry.user_id.validate()?;
            if !seen.insert(entry.user_id.as_str()) {
                return Err(QuestlogError::InvalidArgument(format!(
                    "duplicate user_id '{}'",
                    entry.user_id
                )));
            }
        }
        Ok(())
    }

    /// Validate then rank.
    pub fn rank_checked(entries: &[LeaderboardEntry]) -> Result<Vec<RankedEntry>, QuestlogError> {
        Self::validate(entries)?;
        Ok(Self::rank(entries))
    }

    /// Find a user's rank in an already-ranked sequence.
    #[must_use]
    pub fn rank_of(ranked: &[RankedEntry], user_id: &UserId) -> Option<u32> {
        ranked
            .iter()
            .find(|entry| &entry.user_id == user_id)
            .map(|entry| entry.rank)
    }

    /// Take the first `limit` rows of an already-ranked sequence.
    ///
    /// Ranks are not recomputed, so a tie straddling the cut keeps its
    /// shared rank.
    #[must_use]
    pub fn top(ranked: &[RankedEntry], limit: usize) -> Vec<RankedEntry> {
        ranked.iter().take(limit).cloned().collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
