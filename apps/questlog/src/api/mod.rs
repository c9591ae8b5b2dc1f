//! # Questlog HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Ledger counters
//! - `GET /leaderboard?period=&limit=` - Ranked leaderboard
//! - `POST /leaderboard/rank` - Rank a submitted snapshot
//! - `GET /users/{user_id}` - A user's standing
//! - `POST /xp/award` - Grant XP
//! - `POST /focus/complete` - Record a finished focus session
//! - `GET /focus/sessions/{session_id}` - A recorded focus session
//! - `GET /focus/preview?elapsed_seconds=&streak_days=` - Session XP preview
//! - `POST /export` - Binary snapshot export
//!
//! ## Security Configuration
//!
//! See [`crate::config::ApiConfig`]: CORS origins, rate limit and API key,
//! each settable from `questlog.toml` or `QUESTLOG_*` variables.

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod types;

pub use handlers::error_status;
pub use middleware::{create_rate_limiter, rate_limit_middleware};
pub use types::{
    AwardRequest, AwardResponse, CompletionJson, CompletionResponse, EntryJson, ExportResponse,
    FocusCompleteRequest, FocusCompleteResponse, FocusPreviewQuery, FocusPreviewResponse,
    HealthResponse, LeaderboardQuery, LeaderboardResponse, RankRequest, RankedEntryJson,
    StandingJson, StandingResponse, StatusResponse,
};

use crate::config::ApiConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use questlog_core::{Ledger, QuestlogError};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body (2 MB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

const SECONDS_PER_DAY: u64 = 86_400;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Source of the current day number used to bucket XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClock {
    /// Days since the Unix epoch, UTC.
    System,
    /// A pinned day.
    Fixed(u64),
}

impl DayClock {
    pub fn today(&self) -> u64 {
        match self {
            Self::System => current_day(),
            Self::Fixed(day) => *day,
        }
    }
}

/// Days since the Unix epoch, UTC.
pub fn current_day() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / SECONDS_PER_DAY)
        .unwrap_or(0)
}

/// Shared server state containing the XP ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub clock: DayClock,
}

impl AppState {
    /// Create new app state using the system clock.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self::with_clock(ledger, DayClock::System)
    }

    #[must_use]
    pub fn with_clock(ledger: Ledger, clock: DayClock) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            clock,
        }
    }

    pub fn today(&self) -> u64 {
        self.clock.today()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `*`: any origin (logged as a warning)
/// - unset: localhost only
/// - otherwise: the comma-separated origins that parse
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the router with security settings taken from the environment.
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &ApiConfig::from_env())
}

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if a key is configured)
pub fn create_router_with_config(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/leaderboard", get(handlers::leaderboard_handler))
        .route("/leaderboard/rank", post(handlers::rank_handler))
        .route("/users/{user_id}", get(handlers::standing_handler))
        .route("/xp/award", post(handlers::award_handler))
        .route("/focus/complete", post(handlers::focus_complete_handler))
        .route("/focus/sessions/{session_id}", get(handlers::completion_handler))
        .route("/focus/preview", get(handlers::focus_preview_handler))
        .route("/export", post(handlers::export_handler));

    match config.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let key: auth::ApiKey = Arc::from(key);
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set QUESTLOG_API_KEY to enable authentication."
        ),
    }

    if config.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(config.rate_limit),
            rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(config.cors_origins.as_deref()))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C (or SIGTERM on Unix).
pub async fn run_server(addr: &str, state: AppState, config: &ApiConfig) -> Result<(), QuestlogError> {
    let router = create_router_with_config(state, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| QuestlogError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Questlog HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| QuestlogError::IoError(format!("Server error: {}", e)))?;

    tracing::info!("Questlog HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        assert_eq!(DayClock::Fixed(19_000).today(), 19_000);
    }

    #[test]
    fn test_system_clock_is_past_2020() {
        // 2020-01-01 is day 18262.
        assert!(DayClock::System.today() > 18_262);
    }
}
