//! # Scenario Tests
//!
//! End-to-end behaviour of the core, grouped by concern:
//! - Ranking examples
//! - Session XP examples
//! - Boundary validation
//! - Ledger flows across backends

use questlog_core::{
    DailyXp, FocusSession, LeaderboardEntry, LeaderboardPeriod, Ledger, LedgerSnapshot,
    QuestlogError, RankingEngine, SessionId, UserId, Xp, XpCalculator, snapshot_from_bytes,
    snapshot_to_bytes,
};

fn entry(id: &str, xp: u64) -> LeaderboardEntry {
    LeaderboardEntry::new(UserId::new(id), Xp(xp))
}

// =============================================================================
// RANKING
// =============================================================================

mod ranking_examples {
    use super::*;

    #[test]
    fn tie_at_the_top() {
        let ranked = RankingEngine::rank(&[entry("A", 100), entry("B", 100), entry("C", 50)]);
        let rows: Vec<(&str, u64, u32)> = ranked
            .iter()
            .map(|e| (e.user_id.as_str(), e.xp.value(), e.rank))
            .collect();
        assert_eq!(rows, vec![("A", 100, 1), ("B", 100, 1), ("C", 50, 3)]);
    }

    #[test]
    fn empty() {
        assert!(RankingEngine::rank(&[]).is_empty());
    }

    #[test]
    fn single_entry_ranks_first() {
        let ranked = RankingEngine::rank(&[entry("solo", 0)]);
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn all_zero_xp_share_first() {
        let ranked = RankingEngine::rank(&[entry("a", 0), entry("b", 0), entry("c", 0)]);
        assert!(ranked.iter().all(|e| e.rank == 1));
    }
}

// =============================================================================
// SESSION XP
// =============================================================================

mod session_xp_examples {
    use super::*;

    #[test]
    fn short_session_gets_floor() {
        assert_eq!(XpCalculator::compute_session_xp(299, 0), 5);
    }

    #[test]
    fn ten_minutes_with_long_streak() {
        assert_eq!(XpCalculator::compute_session_xp(600, 10), 15);
    }

    #[test]
    fn capped_multiplier_below_floor() {
        assert_eq!(XpCalculator::compute_session_xp(60, 100), 5);
    }

    #[test]
    fn one_hour_no_streak() {
        assert_eq!(XpCalculator::compute_session_xp(3600, 0), 60);
    }

    #[test]
    fn one_hour_each_streak_step() {
        let xs: Vec<u64> = (0..=6)
            .map(|streak| XpCalculator::compute_session_xp(3600, streak))
            .collect();
        assert_eq!(xs, vec![60, 66, 72, 78, 84, 90, 90]);
    }
}

// =============================================================================
// BOUNDARY VALIDATION
// =============================================================================

mod boundary_validation {
    use super::*;

    #[test]
    fn negative_inputs_rejected() {
        assert!(matches!(
            Xp::from_signed(-5),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert!(matches!(
            XpCalculator::compute_session_xp_checked(-60, 1),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert!(matches!(
            XpCalculator::compute_session_xp_checked(60, -1),
            Err(QuestlogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn duplicate_user_invalidates_whole_snapshot() {
        let result = RankingEngine::rank_checked(&[
            entry("a", 10),
            entry("b", 20),
            entry("a", 30),
        ]);
        assert!(matches!(result, Err(QuestlogError::InvalidArgument(_))));
    }

    #[test]
    fn malformed_ids_rejected() {
        assert!(UserId::parse("").is_err());
        assert!(SessionId::parse("").is_err());
        assert!(SessionId::parse("focus-1").is_ok());
    }
}

// =============================================================================
// LEDGER FLOWS
// =============================================================================

mod ledger_flows {
    use super::*;
    use tempfile::tempdir;

    fn exercise(ledger: &mut Ledger) {
        ledger.award(&UserId::new("ada"), 120, 100).expect("award");
        ledger.award(&UserId::new("bob"), 120, 101).expect("award");

        let mut session = FocusSession::start(SessionId::new("f-1"), UserId::new("cy"), 4);
        session.advance(1500).expect("advance");
        session.advance(300).expect("advance");
        let (completion, total) = ledger
            .complete_session(&mut session, 102)
            .expect("complete");
        // 30 minutes at 1.4x
        assert_eq!(completion.xp_earned, 42);
        assert_eq!(total, Xp(42));

        let board = ledger
            .leaderboard(LeaderboardPeriod::AllTime, 102, 10)
            .expect("board");
        let ranks: Vec<u32> = board.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3]);

        let daily = ledger
            .leaderboard(LeaderboardPeriod::Daily, 102, 10)
            .expect("daily");
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].user_id.as_str(), "cy");

        let standing = ledger.standing(&UserId::new("cy")).expect("standing");
        assert_eq!(standing.rank, 3);
        assert_eq!(standing.level, 1);
    }

    #[test]
    fn in_memory_ledger() {
        let mut ledger = Ledger::new();
        exercise(&mut ledger);
        assert!(!ledger.is_persistent());
    }

    #[test]
    fn redb_ledger_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("questlog.redb");
        {
            let mut ledger = Ledger::with_redb(&path).expect("open");
            exercise(&mut ledger);
        }
        let ledger = Ledger::with_redb(&path).expect("reopen");
        assert!(ledger.is_persistent());
        let stats = ledger.stats().expect("stats");
        assert_eq!(stats.user_count, 3);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.total_xp, Xp(282));
    }

    #[test]
    fn snapshot_moves_between_backends() {
        let mut memory = Ledger::new();
        exercise(&mut memory);
        let bytes = snapshot_to_bytes(&memory.export_snapshot().expect("export")).expect("bytes");

        let temp = tempdir().expect("temp dir");
        let mut persistent = Ledger::with_redb(temp.path().join("copy.redb")).expect("open");
        persistent
            .import_snapshot(&snapshot_from_bytes(&bytes).expect("decode"))
            .expect("import");

        assert_eq!(
            persistent.stats().expect("stats"),
            memory.stats().expect("stats")
        );
        assert_eq!(
            persistent
                .leaderboard(LeaderboardPeriod::Weekly, 102, 10)
                .expect("weekly"),
            memory
                .leaderboard(LeaderboardPeriod::Weekly, 102, 10)
                .expect("weekly")
        );
    }

    #[test]
    fn malformed_snapshot_is_rejected_on_load() {
        let snapshot = LedgerSnapshot {
            totals: vec![entry("", 10)],
            daily: vec![DailyXp {
                day: 5,
                user_id: UserId::new(""),
                xp: Xp(900),
            }],
            completions: Vec::new(),
        };
        let bytes = snapshot_to_bytes(&snapshot).expect("bytes");
        let decoded = snapshot_from_bytes(&bytes).expect("decode");

        assert!(matches!(
            Ledger::from_snapshot(&decoded),
            Err(QuestlogError::InvalidArgument(_))
        ));

        let temp = tempdir().expect("temp dir");
        let mut persistent = Ledger::with_redb(temp.path().join("bad.redb")).expect("open");
        assert!(matches!(
            persistent.import_snapshot(&decoded),
            Err(QuestlogError::InvalidArgument(_))
        ));
        assert_eq!(persistent.stats().expect("stats").user_count, 0);
    }

    #[test]
    fn day_buckets_above_lifetime_total_are_rejected() {
        let snapshot = LedgerSnapshot {
            totals: vec![entry("ada", 10)],
            daily: vec![DailyXp {
                day: 5,
                user_id: UserId::new("ada"),
                xp: Xp(900),
            }],
            completions: Vec::new(),
        };
        assert!(matches!(
            Ledger::from_snapshot(&snapshot),
            Err(QuestlogError::InvalidArgument(_))
        ));

        let mut ledger = Ledger::new();
        assert!(ledger.import_snapshot(&snapshot).is_err());
        assert!(
            ledger
                .leaderboard(LeaderboardPeriod::Daily, 5, 10)
                .expect("daily")
                .is_empty()
        );
    }
}
