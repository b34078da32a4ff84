//! Command-line interface for release-matcher.
//!
//! This module provides CLI commands for grouping and identifying the tracks
//! of a session file, and for managing the configuration.

mod commands;

pub use commands::{Cli, Commands, run_command};
