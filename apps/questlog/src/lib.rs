//! # Questlog
//!
//! HTTP API, CLI and configuration around `questlog-core`.

pub mod api;
pub mod cli;
pub mod config;
