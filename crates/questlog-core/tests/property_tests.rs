//! # Property-Based Tests
//!
//! Ranking and XP invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use questlog_core::{LeaderboardEntry, RankedEntry, RankingEngine, UserId, Xp, XpCalculator};

/// Snapshot with unique user ids `u0..uN` and arbitrary XP.
fn snapshot(xps: &[u64]) -> Vec<LeaderboardEntry> {
    xps.iter()
        .enumerate()
        .map(|(i, xp)| LeaderboardEntry::new(UserId::new(format!("u{}", i)), Xp(*xp)))
        .collect()
}

fn rank_of(ranked: &[RankedEntry], id: &str) -> u32 {
    ranked
        .iter()
        .find(|e| e.user_id.as_str() == id)
        .map(|e| e.rank)
        .unwrap_or(u32::MAX)
}

// =============================================================================
// RANKING PROPERTIES
// =============================================================================

proptest! {
    /// Output is sorted by XP descending and keeps every row.
    #[test]
    fn rank_sorted_descending(xps in vec(0u64..1_000, 0..60)) {
        let entries = snapshot(&xps);
        let ranked = RankingEngine::rank(&entries);

        prop_assert_eq!(ranked.len(), entries.len());
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].xp >= pair[1].xp);
        }
    }

    /// Ranks start at 1, never decrease, and are equal exactly for equal XP.
    #[test]
    fn ranks_follow_competition_rule(xps in vec(0u64..50, 1..60)) {
        let ranked = RankingEngine::rank(&snapshot(&xps));

        prop_assert_eq!(ranked[0].rank, 1);
        for (i, pair) in ranked.windows(2).enumerate() {
            prop_assert!(pair[0].rank <= pair[1].rank);
            if pair[0].xp == pair[1].xp {
                prop_assert_eq!(pair[0].rank, pair[1].rank);
            } else {
                prop_assert_eq!(pair[1].rank as usize, i + 2);
            }
        }
    }

    /// A row's rank is one plus the number of rows with strictly more XP.
    #[test]
    fn rank_counts_strictly_better_rows(xps in vec(0u64..30, 0..40)) {
        let ranked = RankingEngine::rank(&snapshot(&xps));
        for row in &ranked {
            let better = ranked.iter().filter(|other| other.xp > row.xp).count();
            prop_assert_eq!(row.rank as usize, better + 1);
        }
    }

    /// Re-ranking already-ranked data reproduces identical ranks.
    #[test]
    fn reranking_is_idempotent(xps in vec(0u64..100, 0..50)) {
        let first = RankingEngine::rank(&snapshot(&xps));
        let projected: Vec<LeaderboardEntry> = first.iter().map(RankedEntry::to_entry).collect();
        let second = RankingEngine::rank(&projected);
        prop_assert_eq!(first, second);
    }

    /// Gaining XP never worsens a user's rank.
    #[test]
    fn awarding_xp_never_worsens_rank(
        xps in vec(0u64..500, 1..40),
        pick in any::<prop::sample::Index>(),
        bonus in 0u64..500
    ) {
        let mut entries = snapshot(&xps);
        let idx = pick.index(entries.len());
        let id = entries[idx].user_id.as_str().to_string();

        let before = rank_of(&RankingEngine::rank(&entries), &id);
        entries[idx].xp = entries[idx].xp.saturating_add(bonus);
        let after = rank_of(&RankingEngine::rank(&entries), &id);

        prop_assert!(after <= before);
    }

    /// Ranking does not depend on input order, except for tie order.
    #[test]
    fn rank_values_independent_of_input_order(xps in vec(0u64..20, 0..30)) {
        let entries = snapshot(&xps);
        let mut reversed = entries.clone();
        reversed.reverse();

        let a = RankingEngine::rank(&entries);
        let b = RankingEngine::rank(&reversed);
        for row in &a {
            prop_assert_eq!(row.rank, rank_of(&b, row.user_id.as_str()));
        }
    }

    /// Unique snapshots always pass validation.
    #[test]
    fn unique_snapshots_validate(xps in vec(any::<u64>(), 0..50)) {
        prop_assert!(RankingEngine::rank_checked(&snapshot(&xps)).is_ok());
    }
}

// =============================================================================
// XP PROPERTIES
// =============================================================================

proptest! {
    /// Every session earns at least the minimum.
    #[test]
    fn session_xp_has_floor(elapsed in any::<u64>(), streak in any::<u64>()) {
        prop_assert!(XpCalculator::compute_session_xp(elapsed, streak) >= 5);
    }

    /// Longer sessions never earn less.
    #[test]
    fn session_xp_monotone_in_time(
        elapsed in 0u64..1_000_000,
        extra in 0u64..100_000,
        streak in 0u64..20
    ) {
        prop_assert!(
            XpCalculator::compute_session_xp(elapsed + extra, streak)
                >= XpCalculator::compute_session_xp(elapsed, streak)
        );
    }

    /// Longer streaks never earn less.
    #[test]
    fn session_xp_monotone_in_streak(
        elapsed in 0u64..1_000_000,
        streak in 0u64..50,
        extra in 0u64..50
    ) {
        prop_assert!(
            XpCalculator::compute_session_xp(elapsed, streak + extra)
                >= XpCalculator::compute_session_xp(elapsed, streak)
        );
    }

    /// The multiplier never exceeds 1.5x.
    #[test]
    fn session_xp_bounded_by_cap(elapsed in 0u64..10_000_000, streak in any::<u64>()) {
        let minutes = XpCalculator::credited_minutes(elapsed);
        let xp = XpCalculator::compute_session_xp(elapsed, streak);
        prop_assert!(xp <= (minutes * 15 / 10).max(5));
    }

    /// Level boundaries are consistent with `xp_for_level`.
    #[test]
    fn level_bounds(xp in 0u64..10_000_000) {
        let level = XpCalculator::level_for(Xp(xp));
        prop_assert!(XpCalculator::xp_for_level(level) <= Xp(xp));
        prop_assert!(XpCalculator::xp_for_level(level + 1) > Xp(xp));
    }
}
