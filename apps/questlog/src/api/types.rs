//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Numeric request fields are signed so that negative values reach the
//! boundary checks and are rejected with `InvalidArgument` instead of a
//! generic deserialization failure.

use questlog_core::{
    FocusCompletion, FocusSession, LeaderboardEntry, LedgerStats, QuestlogError, RankedEntry,
    SessionId, UserId, UserStanding, Xp, XpCalculator,
    primitives::{DEFAULT_LEADERBOARD_LIMIT, MAX_AWARD_AMOUNT},
    xp::non_negative,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Ledger status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: String,
    pub user_count: usize,
    pub completed_sessions: usize,
    pub total_xp: u64,
}

impl StatusResponse {
    pub fn from_stats(stats: &LedgerStats, persistent: bool) -> Self {
        Self {
            backend: if persistent { "redb" } else { "memory" }.to_string(),
            user_count: stats.user_count,
            completed_sessions: stats.completed_sessions,
            total_xp: stats.total_xp.value(),
        }
    }
}

// =============================================================================
// LEADERBOARD
// =============================================================================

/// Query string of `GET /leaderboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub period: Option<String>,
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    /// Requested row count, `DEFAULT_LEADERBOARD_LIMIT` when absent.
    pub fn to_limit(&self) -> Result<usize, QuestlogError> {
        match self.limit {
            None => Ok(DEFAULT_LEADERBOARD_LIMIT),
            Some(raw) => usize::try_from(non_negative("limit", raw)?).map_err(|_| {
                QuestlogError::InvalidArgument(format!("limit {} is out of range", raw))
            }),
        }
    }
}

/// One ranked leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntryJson {
    pub user_id: String,
    pub xp: u64,
    pub rank: u32,
}

impl From<&RankedEntry> for RankedEntryJson {
    fn from(entry: &RankedEntry) -> Self {
        Self {
            user_id: entry.user_id.as_str().to_string(),
            xp: entry.xp.value(),
            rank: entry.rank,
        }
    }
}

/// Leaderboard response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub period: Option<String>,
    pub entries: Vec<RankedEntryJson>,
    pub error: Option<String>,
}

impl LeaderboardResponse {
    pub fn success(period: Option<String>, ranked: &[RankedEntry]) -> Self {
        Self {
            success: true,
            period,
            entries: ranked.iter().map(RankedEntryJson::from).collect(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            period: None,
            entries: Vec::new(),
            error: Some(msg.into()),
        }
    }
}

/// One unranked row submitted for ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryJson {
    pub user_id: String,
    pub xp: i64,
}

/// Body of `POST /leaderboard/rank`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankRequest {
    pub entries: Vec<EntryJson>,
}

impl RankRequest {
    /// Convert to leaderboard rows, validating every field.
    ///
    /// One invalid row rejects the whole request.
    pub fn to_entries(&self) -> Result<Vec<LeaderboardEntry>, QuestlogError> {
        self.entries
            .iter()
            .map(|row| {
                let user_id = UserId::parse(row.user_id.as_str())?;
                let xp = Xp::from_signed(row.xp)?;
                Ok(LeaderboardEntry::new(user_id, xp))
            })
            .collect()
    }
}

// =============================================================================
// STANDING
// =============================================================================

/// A user's all-time standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingJson {
    pub user_id: String,
    pub xp: u64,
    pub level: u64,
    pub level_progress_percent: u8,
    pub rank: u32,
    pub ranked_users: usize,
}

impl From<&UserStanding> for StandingJson {
    fn from(standing: &UserStanding) -> Self {
        Self {
            user_id: standing.user_id.as_str().to_string(),
            xp: standing.xp.value(),
            level: standing.level,
            level_progress_percent: standing.level_progress_percent,
            rank: standing.rank,
            ranked_users: standing.ranked_users,
        }
    }
}

/// Standing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingResponse {
    pub success: bool,
    pub standing: Option<StandingJson>,
    pub error: Option<String>,
}

impl StandingResponse {
    pub fn success(standing: &UserStanding) -> Self {
        Self {
            success: true,
            standing: Some(StandingJson::from(standing)),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            standing: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// XP AWARD
// =============================================================================

/// Body of `POST /xp/award`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardRequest {
    pub user_id: String,
    pub amount: i64,
}

impl AwardRequest {
    /// Validate the award at the boundary.
    pub fn to_award(&self) -> Result<(UserId, u64), QuestlogError> {
        let user_id = UserId::parse(self.user_id.as_str())?;
        let amount = non_negative("amount", self.amount)?;
        if amount == 0 || amount > MAX_AWARD_AMOUNT {
            return Err(QuestlogError::InvalidArgument(format!(
                "amount must be within 1..={}, got {}",
                MAX_AWARD_AMOUNT, amount
            )));
        }
        Ok((user_id, amount))
    }
}

/// Award response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardResponse {
    pub success: bool,
    pub user_id: Option<String>,
    pub total_xp: Option<u64>,
    pub level: Option<u64>,
    pub error: Option<String>,
}

impl AwardResponse {
    pub fn success(user_id: &UserId, total: Xp) -> Self {
        Self {
            success: true,
            user_id: Some(user_id.as_str().to_string()),
            total_xp: Some(total.value()),
            level: Some(XpCalculator::level_for(total)),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            user_id: None,
            total_xp: None,
            level: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// FOCUS SESSIONS
// =============================================================================

/// Body of `POST /focus/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusCompleteRequest {
    pub session_id: String,
    pub user_id: String,
    pub elapsed_seconds: i64,
    #[serde(default)]
    pub streak_days: i64,
}

impl FocusCompleteRequest {
    /// Rebuild the finished session reported by the client.
    pub fn to_session(&self) -> Result<FocusSession, QuestlogError> {
        let session_id = SessionId::parse(self.session_id.as_str())?;
        let user_id = UserId::parse(self.user_id.as_str())?;
        let elapsed = non_negative("elapsed_seconds", self.elapsed_seconds)?;
        let streak = non_negative("streak_days", self.streak_days)?;
        Ok(FocusSession::with_elapsed(
            session_id, user_id, streak, elapsed,
        ))
    }
}

/// Focus completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusCompleteResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub xp_earned: Option<u64>,
    pub multiplier_tenths: Option<u64>,
    pub total_xp: Option<u64>,
    pub error: Option<String>,
}

impl FocusCompleteResponse {
    pub fn success(session: &FocusSession, xp_earned: u64, total: Xp) -> Self {
        Self {
            success: true,
            session_id: Some(session.session_id.as_str().to_string()),
            xp_earned: Some(xp_earned),
            multiplier_tenths: Some(session.xp_multiplier_tenths()),
            total_xp: Some(total.value()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: None,
            xp_earned: None,
            multiplier_tenths: None,
            total_xp: None,
            error: Some(msg.into()),
        }
    }
}

/// A recorded focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionJson {
    pub session_id: String,
    pub user_id: String,
    pub elapsed_seconds: u64,
    pub streak_days: u64,
    pub xp_earned: u64,
}

impl From<&FocusCompletion> for CompletionJson {
    fn from(completion: &FocusCompletion) -> Self {
        Self {
            session_id: completion.session_id.as_str().to_string(),
            user_id: completion.user_id.as_str().to_string(),
            elapsed_seconds: completion.elapsed_seconds,
            streak_days: completion.streak_days,
            xp_earned: completion.xp_earned,
        }
    }
}

/// Response of `GET /focus/sessions/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub success: bool,
    pub completion: Option<CompletionJson>,
    pub error: Option<String>,
}

impl CompletionResponse {
    pub fn success(completion: &FocusCompletion) -> Self {
        Self {
            success: true,
            completion: Some(CompletionJson::from(completion)),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            completion: None,
            error: Some(msg.into()),
        }
    }
}

/// Query string of `GET /focus/preview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusPreviewQuery {
    pub elapsed_seconds: i64,
    #[serde(default)]
    pub streak_days: i64,
}

/// Focus XP preview response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusPreviewResponse {
    pub success: bool,
    pub minutes: Option<u64>,
    pub multiplier_tenths: Option<u64>,
    pub xp: Option<u64>,
    pub error: Option<String>,
}

impl FocusPreviewResponse {
    pub fn from_query(query: &FocusPreviewQuery) -> Result<Self, QuestlogError> {
        let elapsed = non_negative("elapsed_seconds", query.elapsed_seconds)?;
        let streak = non_negative("streak_days", query.streak_days)?;
        Ok(Self {
            success: true,
            minutes: Some(XpCalculator::credited_minutes(elapsed)),
            multiplier_tenths: Some(XpCalculator::multiplier_tenths(streak)),
            xp: Some(XpCalculator::compute_session_xp(elapsed, streak)),
            error: None,
        })
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            minutes: None,
            multiplier_tenths: None,
            xp: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response with base64-encoded snapshot bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>,
    pub checksum: Option<String>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: &[u8], checksum: String) -> Self {
        use base64::Engine;
        Self {
            success: true,
            data: Some(base64::engine::general_purpose::STANDARD.encode(data)),
            checksum: Some(checksum),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            error: Some(msg.into()),
        }
    }
}
