//! # Focus Sessions
//!
//! A focus session is a timed study block. It is created on activation,
//! accumulates elapsed time while active and ends exactly once:
//!
//! ```text
//!            advance(s)
//!           ┌────────┐
//!           ▼        │
//!  start ─► Active ──┴──► Completed { xp_earned }
//!              │
//!              └────────► Abandoned
//! ```
//!
//! Completion computes XP through [`XpCalculator`]; abandonment awards
//! nothing. Persisting the award is the ledger's job.

use crate::xp::XpCalculator;
use crate::{QuestlogError, SessionId, UserId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusState {
    Active,
    Completed { xp_earned: u64 },
    Abandoned,
}

impl FocusState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FocusState::Active => "active",
            FocusState::Completed { .. } => "completed",
            FocusState::Abandoned => "abandoned",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FocusState::Active)
    }
}

/// A timed focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// Externally supplied streak length at activation time.
    pub streak_days: u64,
    elapsed_seconds: u64,
    state: FocusState,
}

impl FocusSession {
    /// Activate a new session with zero elapsed time.
    #[must_use]
    pub fn start(session_id: SessionId, user_id: UserId, streak_days: u64) -> Self {
        Self {
            session_id,
            user_id,
            streak_days,
            elapsed_seconds: 0,
            state: FocusState::Active,
        }
    }

    /// Rebuild a session reported by a client with its final duration.
    #[must_use]
    pub fn with_elapsed(
        session_id: SessionId,
        user_id: UserId,
        streak_days: u64,
        elapsed_seconds: u64,
    ) -> Self {
        Self {
            elapsed_seconds,
            ..Self::start(session_id, user_id, streak_days)
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    #[must_use]
    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Accumulate elapsed time. Only active sessions keep counting.
    pub fn advance(&mut self, seconds: u64) -> Result<u64, QuestlogError> {
        self.ensure_active("active")?;
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(seconds);
        Ok(self.elapsed_seconds)
    }

    /// Current streak multiplier in tenths.
    #[must_use]
    pub fn xp_multiplier_tenths(&self) -> u64 {
        XpCalculator::multiplier_tenths(self.streak_days)
    }

    /// XP the session would earn if completed now.
    #[must_use]
    pub fn projected_xp(&self) -> u64 {
        XpCalculator::compute_session_xp(self.elapsed_seconds, self.streak_days)
    }

    /// Finish the session normally and return the XP earned.
    pub fn complete(&mut self) -> Result<u64, QuestlogError> {
        self.ensure_active("completed")?;
        let xp_earned = self.projected_xp();
        self.state = FocusState::Completed { xp_earned };
        Ok(xp_earned)
    }

    /// Give up on the session. No XP is awarded.
    pub fn abandon(&mut self) -> Result<(), QuestlogError> {
        self.ensure_active("abandoned")?;
        self.state = FocusState::Abandoned;
        Ok(())
    }

    /// The completion record of a finished session, if it completed.
    #[must_use]
    pub fn completion(&self) -> Option<FocusCompletion> {
        match self.state {
            FocusState::Completed { xp_earned } => Some(FocusCompletion {
                session_id: self.session_id.clone(),
                user_id: self.user_id.clone(),
                elapsed_seconds: self.elapsed_seconds,
                streak_days: self.streak_days,
                xp_earned,
            }),
            _ => None,
        }
    }

    fn ensure_active(&self, to: &'static str) -> Result<(), QuestlogError> {
        if self.state.is_terminal() {
            return Err(QuestlogError::InvalidTransition {
                from: self.state.name(),
                to,
            });
        }
        Ok(())
    }
}

/// Persisted record of a completed focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusCompletion {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub elapsed_seconds: u64,
    pub streak_days: u64,
    pub xp_earned: u64,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session(streak: u64) -> FocusSession {
        FocusSession::start(SessionId::new("s1"), UserId::new("u1"), streak)
    }

    #[test]
    fn starts_active_with_no_time() {
        let s = session(0);
        assert_eq!(s.state(), FocusState::Active);
        assert_eq!(s.elapsed_seconds(), 0);
        assert_eq!(s.projected_xp(), 5);
    }

    #[test]
    fn advance_accumulates() {
        let mut s = session(0);
        s.advance(300).expect("advance");
        assert_eq!(s.advance(300).expect("advance"), 600);
    }

    #[test]
    fn complete_awards_xp() {
        let mut s = session(10);
        s.advance(600).expect("advance");
        assert_eq!(s.xp_multiplier_tenths(), 15);
        assert_eq!(s.complete().expect("complete"), 15);
        assert_eq!(s.state(), FocusState::Completed { xp_earned: 15 });

        let record = s.completion().expect("completion");
        assert_eq!(record.xp_earned, 15);
        assert_eq!(record.elapsed_seconds, 600);
    }

    #[test]
    fn abandon_awards_nothing() {
        let mut s = session(3);
        s.advance(1200).expect("advance");
        s.abandon().expect("abandon");
        assert_eq!(s.state(), FocusState::Abandoned);
        assert!(s.completion().is_none());
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let mut s = session(0);
        s.complete().expect("complete");
        assert!(matches!(
            s.advance(10),
            Err(QuestlogError::InvalidTransition {
                from: "completed",
                ..
            })
        ));
        assert!(s.complete().is_err());
        assert!(s.abandon().is_err());

        let mut a = session(0);
        a.abandon().expect("abandon");
        assert!(matches!(
            a.complete(),
            Err(QuestlogError::InvalidTransition {
                from: "abandoned",
                to: "completed"
            })
        ));
    }
}
