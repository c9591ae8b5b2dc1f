//! # XP Calculator
//!
//! Focus-session XP and level math.
//!
//! A session earns one XP per started minute, scaled by a streak multiplier:
//!
//! ```text
//! minutes    = ceil(elapsed_seconds / 60)
//! multiplier = 1 + min(streak_days * 0.1, 0.5)
//! xp         = max(floor(minutes * multiplier), 5)
//! ```
//!
//! The multiplier is held in tenths (`10..=15`) so the floor is an integer
//! division and no floating point is involved.

use crate::primitives::{
    MAX_STREAK_BONUS, MIN_SESSION_XP, MULTIPLIER_SCALE, SECONDS_PER_MINUTE, STREAK_BONUS_PER_DAY,
    XP_PER_LEVEL,
};
use crate::{QuestlogError, Xp};

/// Pure XP arithmetic for focus sessions and levels.
pub struct XpCalculator;

impl XpCalculator {
    /// Credited minutes for a session: every started minute counts.
    #[must_use]
    pub const fn credited_minutes(elapsed_seconds: u64) -> u64 {
        elapsed_seconds.div_ceil(SECONDS_PER_MINUTE)
    }

    /// Streak multiplier in tenths, capped at 15 (1.5x).
    #[must_use]
    pub fn multiplier_tenths(streak_days: u64) -> u64 {
        let bonus = streak_days
            .saturating_mul(STREAK_BONUS_PER_DAY)
            .min(MAX_STREAK_BONUS);
        MULTIPLIER_SCALE + bonus
    }

    /// XP earned by a focus session.
    ///
    /// Always at least `MIN_SESSION_XP`, and non-decreasing in both
    /// arguments. With no streak the multiplier is exactly 1.0x and the
    /// result is the credited minutes.
    #[must_use]
    pub fn compute_session_xp(elapsed_seconds: u64, streak_days: u64) -> u64 {
        let minutes = Self::credited_minutes(elapsed_seconds);
        let raw = if streak_days > 0 {
            minutes.saturating_mul(Self::multiplier_tenths(streak_days)) / MULTIPLIER_SCALE
        } else {
            minutes
        };
        raw.max(MIN_SESSION_XP)
    }

    /// Boundary variant of [`XpCalculator::compute_session_xp`] for signed
    /// inputs.
    ///
    /// # Errors
    ///
    /// Returns `QuestlogError::InvalidArgument` for negative durations or
    /// streaks.
    pub fn compute_session_xp_checked(
        elapsed_seconds: i64,
        streak_days: i64,
    ) -> Result<u64, QuestlogError> {
        let elapsed = non_negative("elapsed_seconds", elapsed_seconds)?;
        let streak = non_negative("streak_days", streak_days)?;
        Ok(Self::compute_session_xp(elapsed, streak))
    }

    /// Level reached with the given XP. Levels start at 1.
    #[must_use]
    pub const fn level_for(xp: Xp) -> u64 {
        xp.value() / XP_PER_LEVEL + 1
    }

    /// XP at which `level` begins.
    #[must_use]
    pub const fn xp_for_level(level: u64) -> Xp {
        Xp(level.saturating_sub(1).saturating_mul(XP_PER_LEVEL))
    }

    /// Progress within the current level as an integer percentage (0..=99).
    #[must_use]
    pub const fn level_progress_percent(xp: Xp) -> u8 {
        ((xp.value() % XP_PER_LEVEL) * 100 / XP_PER_LEVEL) as u8
    }
}

/// Convert a signed boundary value, naming `field` in the error.
///
/// # Errors
///
/// Returns `QuestlogError::InvalidArgument` if `value` is negative.
pub fn non_negative(field: &str, value: i64) -> Result<u64, QuestlogError> {
    u64::try_from(value).map_err(|_| {
        QuestlogError::InvalidArgument(format!("{} must be non-negative, got {}", field, value))
    })
}

// =============================================================================
// TESTS
// =============================================================================
