//! Track grouping command.

use std::path::Path;

use anyhow::Context;

use crate::catalog;
use crate::grouping::TrackGrouper;

use super::{cluster_location, load_config};

/// Show how a session's tracks would be split into clusters
pub fn cmd_group(session_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let session = catalog::load_session(session_path)
        .with_context(|| format!("Failed to load session {}", session_path.display()))?;

    let total = session.tracks.len();
    let clusters = TrackGrouper::new(config.grouping).group(session.tracks);

    println!("{} tracks in {} clusters", total, clusters.len());
    println!();
    for (i, cluster) in clusters.iter().enumerate() {
        println!(
            "Cluster {} ({} tracks, {})",
            i + 1,
            cluster.track_count(),
            cluster_location(&cluster.tracks)
        );
        for track in &cluster.tracks {
            let title = track.file_info.title.as_deref().unwrap_or("?");
            println!("  {} - {}", track.path.display(), title);
        }
    }

    Ok(())
}
