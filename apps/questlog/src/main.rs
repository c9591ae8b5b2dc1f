//! # Questlog - Gamified Learning Server
//!
//! The main binary for the Questlog XP engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for ledger operations
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              apps/questlog (THE BINARY)          │
//! │                                                  │
//! │   ┌─────────────┐   ┌─────────────┐   ┌────────┐ │
//! │   │    CLI      │   │  HTTP API   │   │ Config │ │
//! │   │   (clap)    │   │   (axum)    │   │ (toml) │ │
//! │   └──────┬──────┘   └──────┬──────┘   └───┬────┘ │
//! │          └─────────────────┼──────────────┘      │
//! │                            ▼                     │
//! │                   ┌────────────────┐             │
//! │                   │ questlog-core  │             │
//! │                   │  (THE LOGIC)   │             │
//! │                   └────────────────┘             │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! questlog server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! questlog award -u ada -a 50
//! questlog focus complete --session s-1 -u ada -e 1500 -s 3
//! questlog leaderboard -t weekly
//! ```

use clap::Parser;
use questlog::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // QUESTLOG_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("QUESTLOG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "questlog=debug,questlog_core=debug,tower_http=debug"
    } else {
        "questlog=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Questlog startup banner.
fn print_banner() {
    println!(
        r#"
   ___                  _   _
  / _ \ _   _  ___  ___| |_| | ___   __ _
 | | | | | | |/ _ \/ __| __| |/ _ \ / _` |
 | |_| | |_| |  __/\__ \ |_| | (_) | (_| |
  \__\_\\__,_|\___||___/\__|_|\___/ \__, |
                                    |___/
  Questlog v{}

  Focus • Earn • Rank
"#,
        env!("CARGO_PKG_VERSION")
    );
}
