//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        AwardRequest, AwardResponse, CompletionResponse, ExportResponse, FocusCompleteRequest,
        FocusCompleteResponse, FocusPreviewQuery, FocusPreviewResponse, HealthResponse,
        LeaderboardQuery, LeaderboardResponse, RankRequest, StandingResponse, StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use questlog_core::{
    LeaderboardPeriod, QuestlogError, RankingEngine, SessionId, UserId,
    formats::{snapshot_checksum, snapshot_to_bytes},
};

/// Map a ledger error to its HTTP status.
pub fn error_status(error: &QuestlogError) -> StatusCode {
    match error {
        QuestlogError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        QuestlogError::UserNotFound(_) | QuestlogError::SessionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        QuestlogError::SessionAlreadyRecorded(_) | QuestlogError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        QuestlogError::SerializationError(_) | QuestlogError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Log a failed ledger operation: caller mistakes at debug, storage faults
/// at error.
fn log_failure(operation: &str, error: &QuestlogError) {
    if error.is_client_error() {
        tracing::debug!("{} rejected: {}", operation, error);
    } else {
        tracing::error!("{} failed: {}", operation, error);
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get ledger status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match ledger.stats() {
        Ok(stats) => Ok((
            StatusCode::OK,
            Json(StatusResponse::from_stats(&stats, ledger.is_persistent())),
        )),
        Err(e) => {
            log_failure("Status", &e);
            Err((error_status(&e), e.to_string()))
        }
    }
}

// =============================================================================
// LEADERBOARD HANDLERS
// =============================================================================

/// Ranked leaderboard for a period.
pub async fn leaderboard_handler(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let period = match query.period.as_deref() {
        None => LeaderboardPeriod::default(),
        Some(raw) => match raw.parse::<LeaderboardPeriod>() {
            Ok(p) => p,
            Err(e) => {
                return (
                    error_status(&e),
                    Json(LeaderboardResponse::error(e.to_string())),
                );
            }
        },
    };
    let limit = match query.to_limit() {
        Ok(limit) => limit,
        Err(e) => {
            return (
                error_status(&e),
                Json(LeaderboardResponse::error(e.to_string())),
            );
        }
    };

    let ledger = state.ledger.read().await;
    match ledger.leaderboard(period, state.today(), limit) {
        Ok(ranked) => (
            StatusCode::OK,
            Json(LeaderboardResponse::success(
                Some(period.as_str().to_string()),
                &ranked,
            )),
        ),
        Err(e) => {
            log_failure("Leaderboard", &e);
            (
                error_status(&e),
                Json(LeaderboardResponse::error(format!("Leaderboard failed: {}", e))),
            )
        }
    }
}

/// Rank a caller-supplied snapshot.
///
/// Stateless: nothing is written to the ledger.
pub async fn rank_handler(Json(request): Json<RankRequest>) -> impl IntoResponse {
    let ranked = request
        .to_entries()
        .and_then(|entries| RankingEngine::rank_checked(&entries));

    match ranked {
        Ok(ranked) => (
            StatusCode::OK,
            Json(LeaderboardResponse::success(None, &ranked)),
        ),
        Err(e) => (
            error_status(&e),
            Json(LeaderboardResponse::error(format!("Invalid snapshot: {}", e))),
        ),
    }
}

// =============================================================================
// USER HANDLER
// =============================================================================

/// All-time standing of one user.
pub async fn standing_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let user = match UserId::parse(user_id) {
        Ok(u) => u,
        Err(e) => return (error_status(&e), Json(StandingResponse::error(e.to_string()))),
    };

    let ledger = state.ledger.read().await;
    match ledger.standing(&user) {
        Ok(standing) => (StatusCode::OK, Json(StandingResponse::success(&standing))),
        Err(e) => (error_status(&e), Json(StandingResponse::error(e.to_string()))),
    }
}

// =============================================================================
// XP HANDLERS
// =============================================================================

/// Grant XP to a user.
pub async fn award_handler(
    State(state): State<AppState>,
    Json(request): Json<AwardRequest>,
) -> impl IntoResponse {
    let (user, amount) = match request.to_award() {
        Ok(award) => award,
        Err(e) => {
            return (
                error_status(&e),
                Json(AwardResponse::error(format!("Invalid award: {}", e))),
            );
        }
    };

    let mut ledger = state.ledger.write().await;
    match ledger.award(&user, amount, state.today()) {
        Ok(total) => {
            tracing::info!(user = %user, amount, total = total.value(), "XP awarded");
            (StatusCode::OK, Json(AwardResponse::success(&user, total)))
        }
        Err(e) => {
            log_failure("Award", &e);
            (
                error_status(&e),
                Json(AwardResponse::error(format!("Award failed: {}", e))),
            )
        }
    }
}

// =============================================================================
// FOCUS HANDLERS
// =============================================================================

/// Record a finished focus session and credit its XP.
pub async fn focus_complete_handler(
    State(state): State<AppState>,
    Json(request): Json<FocusCompleteRequest>,
) -> impl IntoResponse {
    let mut session = match request.to_session() {
        Ok(s) => s,
        Err(e) => {
            return (
                error_status(&e),
                Json(FocusCompleteResponse::error(format!("Invalid session: {}", e))),
            );
        }
    };

    let mut ledger = state.ledger.write().await;
    match ledger.complete_session(&mut session, state.today()) {
        Ok((completion, total)) => {
            tracing::info!(
                session = %completion.session_id,
                user = %completion.user_id,
                xp = completion.xp_earned,
                "Focus session completed"
            );
            (
                StatusCode::OK,
                Json(FocusCompleteResponse::success(
                    &session,
                    completion.xp_earned,
                    total,
                )),
            )
        }
        Err(e) => {
            if matches!(e, QuestlogError::SessionAlreadyRecorded(_)) {
                tracing::warn!(session = %session.session_id, "Duplicate focus completion rejected");
            } else {
                log_failure("Focus completion", &e);
            }
            (
                error_status(&e),
                Json(FocusCompleteResponse::error(e.to_string())),
            )
        }
    }
}

/// Look up a recorded focus session.
pub async fn completion_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match SessionId::parse(session_id) {
        Ok(s) => s,
        Err(e) => return (error_status(&e), Json(CompletionResponse::error(e.to_string()))),
    };

    let ledger = state.ledger.read().await;
    let lookup = ledger
        .completion(&session)
        .and_then(|found| found.ok_or(QuestlogError::SessionNotFound(session)));

    match lookup {
        Ok(completion) => (StatusCode::OK, Json(CompletionResponse::success(&completion))),
        Err(e) => (error_status(&e), Json(CompletionResponse::error(e.to_string()))),
    }
}

/// Preview the XP a session would earn.
pub async fn focus_preview_handler(Query(query): Query<FocusPreviewQuery>) -> impl IntoResponse {
    match FocusPreviewResponse::from_query(&query) {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => (
            error_status(&e),
            Json(FocusPreviewResponse::error(e.to_string())),
        ),
    }
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the ledger as a base64 binary snapshot with its BLAKE3 checksum.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    let bytes = ledger
        .export_snapshot()
        .and_then(|snapshot| snapshot_to_bytes(&snapshot));

    match bytes {
        Ok(data) => {
            let checksum = snapshot_checksum(&data);
            (StatusCode::OK, Json(ExportResponse::success(&data, checksum)))
        }
        Err(e) => {
            log_failure("Export", &e);
            (
                error_status(&e),
                Json(ExportResponse::error(format!("Export failed: {}", e))),
            )
        }
    }
}
