//! # questlog-core
//!
//! The deterministic XP engine for Questlog - THE LOGIC.
//!
//! This crate turns learner activity into experience points and
//! leaderboards:
//! - `ranking`: competition ranking over `(user, xp)` snapshots
//! - `xp`: focus-session XP and level math
//! - `focus`: the focus-session lifecycle
//! - `ledger`: XP bookkeeping over in-memory or redb storage
//! - `formats`: binary snapshot export/import
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: NO async, NO network dependencies
//! - Integer arithmetic only; multipliers are fixed-point tenths
//! - `BTreeMap` everywhere ordering is observable
//! - Ranking and XP math are pure functions and safe to call concurrently

// =============================================================================
// MODULES
// =============================================================================

pub mod focus;
pub mod formats;
pub mod ledger;
pub mod primitives;
pub mod ranking;
pub mod storage;
pub mod store;
pub mod types;
pub mod xp;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{LeaderboardEntry, QuestlogError, RankedEntry, SessionId, UserId, Xp};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use focus::{FocusCompletion, FocusSession, FocusState};
pub use ledger::{LeaderboardPeriod, Ledger, LedgerStats, StorageBackend, UserStanding};
pub use ranking::RankingEngine;
pub use storage::RedbStore;
pub use store::{DailyXp, DatedCompletion, LedgerSnapshot, MemoryStore, XpStore};
pub use xp::XpCalculator;

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{snapshot_from_bytes, snapshot_to_bytes};
