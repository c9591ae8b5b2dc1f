//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::Config;
use questlog_core::{
    FocusSession, LeaderboardPeriod, Ledger, LedgerSnapshot, QuestlogError, SessionId, UserId,
    XpCalculator,
    formats::{MAX_SNAPSHOT_SIZE, snapshot_checksum, snapshot_from_bytes, snapshot_to_bytes},
};
use std::path::{Path, PathBuf};

// =============================================================================
// STORAGE LOCATION
// =============================================================================

/// Ledger storage backend selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// ACID redb database.
    Redb,
    /// In-memory ledger saved to a binary snapshot file after each change.
    File,
}

impl Backend {
    pub fn parse(name: &str) -> Result<Self, QuestlogError> {
        match name {
            "redb" => Ok(Self::Redb),
            "file" => Ok(Self::File),
            other => Err(QuestlogError::InvalidArgument(format!(
                "Unknown backend: {}. Use: redb, file",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
        }
    }
}

/// Where and how the ledger is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub backend: Backend,
    pub path: PathBuf,
}

impl StoreLocation {
    pub fn from_config(config: &Config) -> Result<Self, QuestlogError> {
        Ok(Self {
            backend: Backend::parse(&config.storage.backend)?,
            path: config.storage.database.clone(),
        })
    }
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Reject files larger than `max_size` before reading them.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), QuestlogError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| QuestlogError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(QuestlogError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, QuestlogError> {
    let canonical = path.canonicalize().map_err(|e| {
        QuestlogError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(QuestlogError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path, keeping the file name.
fn validate_output_path(path: &Path) -> Result<PathBuf, QuestlogError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        QuestlogError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(QuestlogError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| QuestlogError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
///
/// With the `file` backend the ledger is written back on shutdown.
pub async fn cmd_server(store: &StoreLocation, config: &Config) -> Result<(), QuestlogError> {
    let ledger = open_ledger(store)?;

    println!("Questlog Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", config.server.host);
    println!("  Port:     {}", config.server.port);
    println!("  Backend:  {}", store.backend.as_str());
    println!("  Database: {:?}", store.path);
    println!();
    println!("Endpoints:");
    println!("  GET  /leaderboard      - Ranked leaderboard");
    println!("  POST /leaderboard/rank - Rank a snapshot");
    println!("  GET  /users/{{id}}       - User standing");
    println!("  POST /xp/award         - Grant XP");
    println!("  POST /focus/complete   - Record a focus session");
    println!("  GET  /focus/preview    - Preview session XP");
    println!("  GET  /status           - Ledger status");
    println!("  GET  /health           - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(ledger);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(&addr, state.clone(), &config.api).await?;

    let ledger = state.ledger.read().await;
    save_ledger(&ledger, store)
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show ledger counters.
pub fn cmd_status(store: &StoreLocation, json_mode: bool) -> Result<(), QuestlogError> {
    let ledger = open_ledger(store)?;
    let stats = ledger.stats()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": store.path.to_string_lossy(),
            "backend": store.backend.as_str(),
            "user_count": stats.user_count,
            "completed_sessions": stats.completed_sessions,
            "total_xp": stats.total_xp.value()
        }));
        return Ok(());
    }

    println!("Questlog Ledger Status");
    println!("======================");
    println!("Database: {:?}", store.path);
    println!("Backend:  {}", store.backend.as_str());
    println!();
    println!("Users:              {}", stats.user_count);
    println!("Completed Sessions: {}", stats.completed_sessions);
    println!("Total XP:           {}", stats.total_xp);

    Ok(())
}

// =============================================================================
// LEADERBOARD COMMAND
// =============================================================================

/// Print a ranked leaderboard.
pub fn cmd_leaderboard(
    store: &StoreLocation,
    json_mode: bool,
    period: &str,
    limit: usize,
) -> Result<(), QuestlogError> {
    let period: LeaderboardPeriod = period.parse()?;
    let ledger = open_ledger(store)?;
    let ranked = ledger.leaderboard(period, api::current_day(), limit)?;

    if json_mode {
        let rows: Vec<serde_json::Value> = ranked
            .iter()
            .map(|e| {
                serde_json::json!({
                    "rank": e.rank,
                    "user_id": e.user_id.as_str(),
                    "xp": e.xp.value()
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "period": period.as_str(),
            "entries": rows
        }));
        return Ok(());
    }

    println!("Leaderboard ({})", period);
    println!("==================");
    if ranked.is_empty() {
        println!("No XP recorded for this period.");
    }
    for entry in &ranked {
        println!("{:>5}  {:<32} {:>10} XP", entry.rank, entry.user_id, entry.xp);
    }

    Ok(())
}

// =============================================================================
// AWARD COMMAND
// =============================================================================

/// Grant XP to a user.
pub fn cmd_award(
    store: &StoreLocation,
    json_mode: bool,
    user: &str,
    amount: u64,
) -> Result<(), QuestlogError> {
    let user = UserId::parse(user)?;
    let mut ledger = open_ledger(store)?;
    let total = ledger.award(&user, amount, api::current_day())?;
    save_ledger(&ledger, store)?;

    tracing::debug!(user = %user, amount, "XP awarded");

    if json_mode {
        print_json(&serde_json::json!({
            "user_id": user.as_str(),
            "awarded": amount,
            "total_xp": total.value(),
            "level": XpCalculator::level_for(total)
        }));
        return Ok(());
    }

    println!(
        "Awarded {} XP to {} (total {}, level {})",
        amount,
        user,
        total,
        XpCalculator::level_for(total)
    );
    Ok(())
}

// =============================================================================
// FOCUS COMMANDS
// =============================================================================

/// Show the XP a session would earn.
pub fn cmd_focus_preview(json_mode: bool, elapsed: u64, streak: u64) -> Result<(), QuestlogError> {
    let minutes = XpCalculator::credited_minutes(elapsed);
    let multiplier = XpCalculator::multiplier_tenths(streak);
    let xp = XpCalculator::compute_session_xp(elapsed, streak);

    if json_mode {
        print_json(&serde_json::json!({
            "elapsed_seconds": elapsed,
            "streak_days": streak,
            "minutes": minutes,
            "multiplier_tenths": multiplier,
            "xp": xp
        }));
        return Ok(());
    }

    println!("Minutes:    {}", minutes);
    println!("Multiplier: {}.{}x", multiplier / 10, multiplier % 10);
    println!("XP:         {}", xp);
    Ok(())
}

/// Record a finished focus session.
pub fn cmd_focus_complete(
    store: &StoreLocation,
    json_mode: bool,
    session: &str,
    user: &str,
    elapsed: u64,
    streak: u64,
) -> Result<(), QuestlogError> {
    let mut focus = FocusSession::with_elapsed(
        SessionId::parse(session)?,
        UserId::parse(user)?,
        streak,
        elapsed,
    );

    let mut ledger = open_ledger(store)?;
    let (completion, total) = ledger.complete_session(&mut focus, api::current_day())?;
    save_ledger(&ledger, store)?;

    if json_mode {
        print_json(&serde_json::json!({
            "session_id": completion.session_id.as_str(),
            "user_id": completion.user_id.as_str(),
            "xp_earned": completion.xp_earned,
            "total_xp": total.value()
        }));
        return Ok(());
    }

    println!(
        "Session {} complete: {} earned {} XP (total {})",
        completion.session_id, completion.user_id, completion.xp_earned, total
    );
    Ok(())
}

// =============================================================================
// STANDING COMMAND
// =============================================================================

/// Show a user's all-time standing.
pub fn cmd_standing(store: &StoreLocation, json_mode: bool, user: &str) -> Result<(), QuestlogError> {
    let user = UserId::parse(user)?;
    let ledger = open_ledger(store)?;
    let standing = ledger.standing(&user)?;

    if json_mode {
        print_json(&serde_json::json!({
            "user_id": standing.user_id.as_str(),
            "xp": standing.xp.value(),
            "level": standing.level,
            "level_progress_percent": standing.level_progress_percent,
            "rank": standing.rank,
            "ranked_users": standing.ranked_users
        }));
        return Ok(());
    }

    println!("User:  {}", standing.user_id);
    println!("XP:    {}", standing.xp);
    println!(
        "Level: {} ({}% to next)",
        standing.level, standing.level_progress_percent
    );
    println!("Rank:  {} of {}", standing.rank, standing.ranked_users);
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the ledger as a binary snapshot or JSON.
pub fn cmd_export(store: &StoreLocation, output: &Path, format: &str) -> Result<(), QuestlogError> {
    let validated_output = validate_output_path(output)?;

    let ledger = open_ledger(store)?;
    let snapshot = ledger.export_snapshot()?;

    let data = match format {
        "snapshot" => {
            let data = snapshot_to_bytes(&snapshot)?;
            println!("Checksum: {}", snapshot_checksum(&data));
            data
        }
        "json" => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| QuestlogError::SerializationError(e.to_string()))?,
        _ => {
            return Err(QuestlogError::InvalidArgument(format!(
                "Unknown format: {}. Use: snapshot, json",
                format
            )));
        }
    };

    std::fs::write(&validated_output, &data)
        .map_err(|e| QuestlogError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import a ledger from a snapshot or JSON export.
pub fn cmd_import(store: &StoreLocation, input: &Path) -> Result<(), QuestlogError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_SIZE as u64)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| QuestlogError::IoError(format!("Read file: {}", e)))?;
    let snapshot = decode_snapshot(&data)?;
    snapshot.validate()?;

    let mut ledger = open_ledger(store)?;
    ledger.import_snapshot(&snapshot)?;
    save_ledger(&ledger, store)?;

    let stats = ledger.stats()?;
    println!(
        "Imported ledger: {} users, {} sessions, {} XP",
        stats.user_count, stats.completed_sessions, stats.total_xp
    );
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(store: &StoreLocation, force: bool) -> Result<(), QuestlogError> {
    if store.path.exists() {
        if !force {
            return Err(QuestlogError::InvalidArgument(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&store.path)
            .map_err(|e| QuestlogError::IoError(format!("Remove database: {}", e)))?;
    }

    match store.backend {
        Backend::Redb => {
            let _ledger = Ledger::with_redb(&store.path)?;
            println!("Initialized new redb database at {:?}", store.path);
        }
        Backend::File => {
            save_ledger(&Ledger::new(), store)?;
            println!("Initialized new snapshot file at {:?}", store.path);
        }
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Decode a binary snapshot, falling back to the JSON export format.
pub fn decode_snapshot(data: &[u8]) -> Result<LedgerSnapshot, QuestlogError> {
    match snapshot_from_bytes(data) {
        Ok(snapshot) => Ok(snapshot),
        Err(binary_err) => serde_json::from_slice::<LedgerSnapshot>(data).map_err(|_| {
            QuestlogError::SerializationError(format!(
                "Could not parse ledger file: {}",
                binary_err
            ))
        }),
    }
}

/// Open the ledger at `store`, creating an empty one if absent.
pub fn open_ledger(store: &StoreLocation) -> Result<Ledger, QuestlogError> {
    match store.backend {
        Backend::Redb => Ledger::with_redb(&store.path),
        Backend::File => {
            if !store.path.exists() {
                return Ok(Ledger::new());
            }
            validate_file_size(&store.path, MAX_SNAPSHOT_SIZE as u64)?;
            let data = std::fs::read(&store.path)
                .map_err(|e| QuestlogError::IoError(format!("Read db: {}", e)))?;
            Ledger::from_snapshot(&decode_snapshot(&data)?)
        }
    }
}

/// Persist the ledger. redb commits on every write, so only the file
/// backend has work to do.
pub fn save_ledger(ledger: &Ledger, store: &StoreLocation) -> Result<(), QuestlogError> {
    if ledger.is_persistent() || store.backend == Backend::Redb {
        return Ok(());
    }

    let data = snapshot_to_bytes(&ledger.export_snapshot()?)?;
    let tmp = store.path.with_extension("tmp");
    std::fs::write(&tmp, &data)
        .map_err(|e| QuestlogError::IoError(format!("Write db: {}", e)))?;
    std::fs::rename(&tmp, &store.path)
        .map_err(|e| QuestlogError::IoError(format!("Replace db: {}", e)))?;
    tracing::debug!("Saved {} bytes to {:?}", data.len(), store.path);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
