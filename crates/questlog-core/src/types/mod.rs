//! # Core Type Definitions
//!
//! This module contains the core types for the Questlog engine:
//! - Identifiers (`UserId`, `SessionId`)
//! - XP amounts (`Xp`)
//! - Leaderboard rows (`LeaderboardEntry`, `RankedEntry`)
//! - Error types (`QuestlogError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for XP to prevent overflow

use crate::primitives::MAX_ID_LENGTH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque unique identifier of a learner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new user id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a user id, rejecting empty or oversized values.
    pub fn parse(s: impl Into<String>) -> Result<Self, QuestlogError> {
        let id = Self::new(s);
        id.validate()?;
        Ok(id)
    }

    /// Check the identifier is non-empty and within `MAX_ID_LENGTH` bytes.
    pub fn validate(&self) -> Result<(), QuestlogError> {
        validate_id("user_id", &self.0)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a focus session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create a session id, rejecting empty or oversized values.
    pub fn parse(s: impl Into<String>) -> Result<Self, QuestlogError> {
        let id = Self::new(s);
        id.validate()?;
        Ok(id)
    }

    /// Check the identifier is non-empty and within `MAX_ID_LENGTH` bytes.
    pub fn validate(&self) -> Result<(), QuestlogError> {
        validate_id("session_id", &self.0)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_id(field: &str, value: &str) -> Result<(), QuestlogError> {
    if value.trim().is_empty() {
        return Err(QuestlogError::InvalidArgument(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(QuestlogError::InvalidArgument(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            value.len(),
            MAX_ID_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// XP
// =============================================================================

/// Experience points. Non-negative by construction.
///
/// XP is only ever added, never reduced: the only mutation is
/// `saturating_add`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Xp(pub u64);

impl Xp {
    pub const ZERO: Xp = Xp(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Add XP using saturating arithmetic.
    #[must_use]
    pub const fn saturating_add(self, amount: u64) -> Self {
        Self(self.0.saturating_add(amount))
    }

    /// Get the raw XP value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Convert a signed boundary value, rejecting negatives.
    pub fn from_signed(value: i64) -> Result<Self, QuestlogError> {
        u64::try_from(value).map(Self).map_err(|_| {
            QuestlogError::InvalidArgument(format!("xp must be non-negative, got {}", value))
        })
    }
}

impl std::fmt::Display for Xp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} XP", self.0)
    }
}

// =============================================================================
// LEADERBOARD ROWS
// =============================================================================

/// One `(user, xp)` row of a leaderboard snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub xp: Xp,
}

impl LeaderboardEntry {
    #[must_use]
    pub fn new(user_id: UserId, xp: Xp) -> Self {
        Self { user_id, xp }
    }
}

/// A leaderboard row with its derived 1-based competition rank.
///
/// Rank is never stored; it is recomputed from XP on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub user_id: UserId,
    pub xp: Xp,
    pub rank: u32,
}

impl RankedEntry {
    /// Drop the derived rank, keeping the underlying row.
    #[must_use]
    pub fn to_entry(&self) -> LeaderboardEntry {
        LeaderboardEntry::new(self.user_id.clone(), self.xp)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Questlog engine.
///
/// - No silent failures
/// - Use `Result<T, QuestlogError>` for fallible operations
/// - The core never panics; invalid input is rejected at the boundary
#[derive(Debug, Error)]
pub enum QuestlogError {
    /// An input lies outside its stated domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The user has no XP record.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The focus session is unknown.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// The focus session has already been recorded and awarded.
    #[error("Session already recorded: {0}")]
    SessionAlreadyRecorded(SessionId),

    /// A focus session lifecycle transition is not allowed.
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred (disk operations).
    #[error("I/O error: {0}")]
    IoError(String),
}

impl QuestlogError {
    /// Whether the error was caused by caller input rather than storage.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::UserNotFound(_)
                | Self::SessionNotFound(_)
                | Self::SessionAlreadyRecorded(_)
                | Self::InvalidTransition { .. }
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
