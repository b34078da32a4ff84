//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `identify`: Group a session's tracks and match each cluster to a release
//! - `group`: Show how a session's tracks would be grouped
//! - `config`: Show or initialize the configuration file

mod config;
mod group;
mod identify;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

pub use config::cmd_config;
pub use group::cmd_group;
pub use identify::cmd_identify;

/// Release Matcher CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Identify the releases in a session file
    Identify {
        /// Path to the session JSON file
        session: PathBuf,
        /// Restrict the search to this artist (foreign artist ID)
        #[arg(long)]
        artist: Option<String>,
        /// Restrict the search to this album (foreign album ID)
        #[arg(long)]
        album: Option<String>,
        /// Restrict the search to this release (foreign release ID)
        #[arg(long)]
        release: Option<String>,
        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
        /// Config file to use instead of the default location
        #[arg(long, env = "RELEASE_MATCHER_CONFIG")]
        config: Option<PathBuf>,
        /// Identify clusters one at a time
        #[arg(long)]
        sequential: bool,
    },
    /// Group the tracks of a session file without matching them
    Group {
        /// Path to the session JSON file
        session: PathBuf,
        /// Config file to use instead of the default location
        #[arg(long, env = "RELEASE_MATCHER_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Show the active configuration
    Config {
        /// Write the default configuration if no config file exists
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was specified
/// (meaning usage should be printed).
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    match &cli.command {
        Some(Commands::Identify {
            session,
            artist,
            album,
            release,
            format,
            config,
            sequential,
        }) => {
            let hints = identify::HintIds {
                artist: artist.as_deref(),
                album: album.as_deref(),
                release: release.as_deref(),
            };
            cmd_identify(session, &hints, format, config.as_deref(), *sequential)?;
            Ok(true)
        }
        Some(Commands::Group { session, config }) => {
            cmd_group(session, config.as_deref())?;
            Ok(true)
        }
        Some(Commands::Config { init }) => {
            cmd_config(*init)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Load the config from an explicit path, or the default location.
pub(crate) fn load_config(path: Option<&Path>) -> anyhow::Result<crate::config::Config> {
    match path {
        Some(path) => Ok(crate::config::load_from(path)?),
        None => Ok(crate::config::load()),
    }
}

/// Common parent directory of a cluster's files, for display.
pub(crate) fn cluster_location(tracks: &[crate::model::LocalTrackItem]) -> String {
    let mut dirs: Vec<PathBuf> = tracks.iter().map(|t| t.parent_dir()).collect();
    dirs.sort();
    dirs.dedup();
    match dirs.as_slice() {
        [] => "?".to_string(),
        [only] => only.display().to_string(),
        [first, ..] => format!("{} (+{} more folders)", first.display(), dirs.len() - 1),
    }
}
