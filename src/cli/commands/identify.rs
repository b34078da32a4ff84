//! Release identification command.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;

use crate::catalog::{self, InMemoryCatalog};
use crate::identification::{
    ClusterOutcome, IdentificationHints, IdentificationService, OutcomeSummary,
};

use super::{cluster_location, load_config};

/// Foreign IDs given on the command line, resolved against the session catalog
#[derive(Debug, Default)]
pub struct HintIds<'a> {
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub release: Option<&'a str>,
}

/// Identify every cluster in a session file
pub fn cmd_identify(
    session_path: &Path,
    hint_ids: &HintIds<'_>,
    format: &str,
    config_path: Option<&Path>,
    sequential: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if sequential {
        config.matching.parallel = false;
    }

    let session = catalog::load_session(session_path)
        .with_context(|| format!("Failed to load session {}", session_path.display()))?;
    let hints = resolve_hints(&session.catalog, hint_ids)?;

    let service = IdentificationService::from_config(&session.catalog, &session.fingerprinter, &config);
    let outcomes = service.identify(session.tracks, &hints);

    match format {
        "json" => {
            let summaries: Vec<OutcomeSummary> = outcomes.iter().map(OutcomeSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        "text" => print!("{}", render_text(&outcomes)),
        other => anyhow::bail!("Unknown output format: {} (expected text or json)", other),
    }

    Ok(())
}

/// Look up hinted IDs in the catalog. Unknown IDs are an error.
pub(crate) fn resolve_hints(
    catalog: &InMemoryCatalog,
    ids: &HintIds<'_>,
) -> anyhow::Result<IdentificationHints> {
    let artist = ids
        .artist
        .map(|id| catalog.artist(id).cloned().context(format!("Unknown artist: {}", id)))
        .transpose()?;
    let album = ids
        .album
        .map(|id| catalog.album(id).cloned().context(format!("Unknown album: {}", id)))
        .transpose()?;
    let release = ids
        .release
        .map(|id| catalog.release(id).cloned().context(format!("Unknown release: {}", id)))
        .transpose()?;

    Ok(IdentificationHints {
        artist,
        album,
        release,
    })
}

/// Human-readable report of all outcomes
pub(crate) fn render_text(outcomes: &[ClusterOutcome]) -> String {
    let mut out = String::new();

    for (i, outcome) in outcomes.iter().enumerate() {
        let cluster = &outcome.release;
        let _ = writeln!(
            out,
            "Cluster {} ({} tracks, {})",
            i + 1,
            cluster.track_count(),
            cluster_location(&cluster.tracks)
        );

        match (&outcome.error, cluster.best()) {
            (Some(err), _) => {
                let _ = writeln!(out, "  ✗ {}", err);
            }
            (None, None) => {
                let _ = writeln!(out, "  ? No candidate releases found");
            }
            (None, Some(best)) => {
                let release = &best.release;
                let _ = writeln!(
                    out,
                    "  ✓ {} - {} [{}]",
                    release.album.artist.name,
                    release.display_title(),
                    release.foreign_release_id
                );
                let _ = writeln!(out, "    Distance:  {}", best.distance);
                let _ = writeln!(
                    out,
                    "    Unmatched: {}  Missing: {}",
                    best.mapping.unmatched.len(),
                    best.mapping.missing.len()
                );
            }
        }
        out.push('\n');
    }

    let matched = outcomes.iter().filter(|o| o.is_matched()).count();
    let _ = writeln!(out, "Matched {} of {} clusters", matched, outcomes.len());
    out
}
