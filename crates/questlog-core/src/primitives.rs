//! # Primitives
//!
//! Hardcoded runtime constants for the Questlog core.
//!
//! Multipliers are fixed-point in tenths so every XP computation stays in
//! integer arithmetic: a multiplier of `1.5x` is `15`.

/// Minimum XP awarded for any completed focus session.
pub const MIN_SESSION_XP: u64 = 5;

/// Fixed-point scale of XP multipliers (`10` = 1.0x).
pub const MULTIPLIER_SCALE: u64 = 10;

/// Multiplier bonus per streak day, in tenths (0.1x).
pub const STREAK_BONUS_PER_DAY: u64 = 1;

/// Maximum streak bonus, in tenths (0.5x, capping the multiplier at 1.5x).
pub const MAX_STREAK_BONUS: u64 = 5;

/// Seconds per credited focus minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// XP required per level.
pub const XP_PER_LEVEL: u64 = 500;

/// Days covered by the weekly leaderboard (today included).
pub const WEEKLY_WINDOW_DAYS: u64 = 7;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for user and session identifiers.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum number of rows accepted by a checked ranking call.
pub const MAX_LEADERBOARD_SIZE: usize = 10_000;

/// Maximum XP granted by a single manual award.
pub const MAX_AWARD_AMOUNT: u64 = 100_000;

/// Default number of rows returned by a leaderboard query.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the Questlog snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"QLOG";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_cap_is_one_and_a_half() {
        assert_eq!(MULTIPLIER_SCALE + MAX_STREAK_BONUS, 15);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"QLOG");
    }
}
