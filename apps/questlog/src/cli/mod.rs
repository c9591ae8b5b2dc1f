//! # Questlog CLI Module
//!
//! This module implements the CLI interface for Questlog.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show ledger counters
//! - `leaderboard` - Print a ranked leaderboard
//! - `award` - Grant XP to a user
//! - `focus preview` / `focus complete` - Focus session XP
//! - `standing` - Show one user's standing
//! - `export` - Export the ledger to a file
//! - `import` - Import a ledger snapshot
//! - `init` - Initialize a new database

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use questlog_core::QuestlogError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Questlog - XP, focus sessions and leaderboards for learners
#[derive(Parser, Debug)]
#[command(name = "questlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./questlog.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ledger database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "file" (snapshot file)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show ledger status
    Status,

    /// Print a ranked leaderboard
    Leaderboard {
        /// Period: all_time, weekly, daily
        #[arg(short = 't', long, default_value = "all_time")]
        period: String,

        /// Maximum rows to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Grant XP to a user
    Award {
        /// User id
        #[arg(short, long)]
        user: String,

        /// XP amount
        #[arg(short, long)]
        amount: u64,
    },

    /// Focus session XP
    Focus {
        #[command(subcommand)]
        action: FocusCommand,
    },

    /// Show a user's all-time standing
    Standing {
        /// User id
        #[arg(short, long)]
        user: String,
    },

    /// Export the ledger
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (snapshot, json)
        #[arg(short = 't', long, default_value = "snapshot")]
        format: String,
    },

    /// Import a ledger snapshot (redb target must be empty)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

/// Focus session subcommands.
#[derive(Subcommand, Debug)]
pub enum FocusCommand {
    /// Show the XP a session would earn
    Preview {
        /// Elapsed focus time in seconds
        #[arg(short, long)]
        elapsed: u64,

        /// Consecutive streak days
        #[arg(short, long, default_value = "0")]
        streak: u64,
    },

    /// Record a finished session and credit its XP
    Complete {
        /// Session id (credited at most once)
        #[arg(long)]
        session: String,

        /// User id
        #[arg(short, long)]
        user: String,

        /// Elapsed focus time in seconds
        #[arg(short, long)]
        elapsed: u64,

        /// Consecutive streak days
        #[arg(short, long, default_value = "0")]
        streak: u64,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration: file and environment, then command-line flags.
pub fn resolve_config(cli: &Cli) -> Result<Config, QuestlogError> {
    apply_flags(Config::load(cli.config.as_deref())?, cli)
}

/// Override `config` with the command-line flags and check the backend name.
pub fn apply_flags(mut config: Config, cli: &Cli) -> Result<Config, QuestlogError> {
    if let Some(database) = &cli.database {
        config.storage.database = database.clone();
    }
    if let Some(backend) = &cli.backend {
        config.storage.backend = backend.clone();
    }
    if let Some(Commands::Server { host, port }) = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    Backend::parse(&config.storage.backend)?;
    Ok(config)
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), QuestlogError> {
    let config = resolve_config(&cli)?;
    let store = StoreLocation::from_config(&config)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&store, &config).await,
        Some(Commands::Status) => cmd_status(&store, json_mode),
        Some(Commands::Leaderboard { period, limit }) => {
            cmd_leaderboard(&store, json_mode, &period, limit)
        }
        Some(Commands::Award { user, amount }) => cmd_award(&store, json_mode, &user, amount),
        Some(Commands::Focus {
            action: FocusCommand::Preview { elapsed, streak },
        }) => cmd_focus_preview(json_mode, elapsed, streak),
        Some(Commands::Focus {
            action:
                FocusCommand::Complete {
                    session,
                    user,
                    elapsed,
                    streak,
                },
        }) => cmd_focus_complete(&store, json_mode, &session, &user, elapsed, streak),
        Some(Commands::Standing { user }) => cmd_standing(&store, json_mode, &user),
        Some(Commands::Export { output, format }) => cmd_export(&store, &output, &format),
        Some(Commands::Import { input }) => cmd_import(&store, &input),
        Some(Commands::Init { force }) => cmd_init(&store, force),
        None => cmd_status(&store, json_mode),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    fn base_config() -> Config {
        let mut config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [storage]
            database = "from-file.redb"
            backend = "redb"
            "#,
        )
        .unwrap();
        config.apply_env(|_| None);
        config
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "questlog",
            "--backend",
            "file",
            "--database",
            "ledger.qlog",
            "server",
            "--port",
            "9999",
        ])
        .unwrap();
        let config = apply_flags(base_config(), &cli).unwrap();
        assert_eq!(config.storage.backend, "file");
        assert_eq!(config.storage.database, PathBuf::from("ledger.qlog"));
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_config_kept_without_flags() {
        let cli = Cli::try_parse_from(["questlog", "status"]).unwrap();
        let config = apply_flags(base_config(), &cli).unwrap();
        assert_eq!(config.storage.database, PathBuf::from("from-file.redb"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let cli = Cli::try_parse_from(["questlog", "--backend", "sqlite", "status"]).unwrap();
        assert!(matches!(
            apply_flags(base_config(), &cli),
            Err(QuestlogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_focus_complete_parses() {
        let cli = Cli::try_parse_from([
            "questlog", "focus", "complete", "--session", "s1", "-u", "ada", "-e", "600", "-s",
            "3",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Focus {
                action: FocusCommand::Complete { elapsed: 600, streak: 3, .. }
            })
        ));
    }
}
