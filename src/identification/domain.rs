//! Identification inputs, outputs and errors.
//!
//! These are the types that cross the engine boundary: hints in, one
//! [`ClusterOutcome`] per cluster out, and the error enums the collaborator
//! traits speak.

use serde::Serialize;

use crate::assignment::AssignmentError;
use crate::model::{AlbumRef, ArtistRef, CandidateRelease, LocalReleaseCluster};

/// Caller-supplied restrictions on the candidate search.
///
/// An album or release hint is authoritative: it disables the fingerprint
/// retry.
#[derive(Debug, Clone, Default)]
pub struct IdentificationHints {
    pub artist: Option<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub release: Option<CandidateRelease>,
}

impl IdentificationHints {
    /// True when an album or release has been pinned by the caller.
    pub fn is_authoritative(&self) -> bool {
        self.album.is_some() || self.release.is_some()
    }
}

/// Result of identifying one cluster.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// The cluster, with its best match (if any) populated onto its items
    pub release: LocalReleaseCluster,
    /// Why identification failed for this cluster, if it did
    pub error: Option<IdentificationError>,
}

impl ClusterOutcome {
    pub fn is_matched(&self) -> bool {
        self.error.is_none() && self.release.best().is_some()
    }

    /// The identified cluster, or its error as a crate-level error.
    pub fn into_result(self) -> crate::error::Result<LocalReleaseCluster> {
        match self.error {
            Some(err) => Err(err.into()),
            None => Ok(self.release),
        }
    }
}

/// Catalog lookup failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog lookup failed: {0}")]
    Lookup(String),

    #[error("Not found in catalog: {0}")]
    NotFound(String),
}

/// Fingerprint lookup failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FingerprintError {
    #[error("Fingerprint lookup failed: {0}")]
    Lookup(String),

    #[error("Fingerprinting unavailable: {0}")]
    Unavailable(String),
}

/// Per-cluster identification failures. None of these abort a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdentificationError {
    #[error("Various artists releases are not supported")]
    VariousArtistsUnsupported,

    #[error("Track assignment failed: {0}")]
    Assignment(#[from] AssignmentError),
}

/// Serializable summary of an outcome, for reports.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub tracks: Vec<String>,
    pub release_id: Option<String>,
    pub release_title: Option<String>,
    pub artist: Option<String>,
    pub distance: Option<f64>,
    pub components: Vec<(String, f64)>,
    pub unmatched: usize,
    pub missing: usize,
    pub error: Option<String>,
}

impl From<&ClusterOutcome> for OutcomeSummary {
    fn from(outcome: &ClusterOutcome) -> Self {
        let best = outcome.release.best();
        Self {
            tracks: outcome
                .release
                .tracks
                .iter()
                .map(|t| t.path.display().to_string())
                .collect(),
            release_id: best.map(|m| m.release.foreign_release_id.clone()),
            release_title: best.map(|m| m.release.display_title().to_string()),
            artist: best.map(|m| m.release.album.artist.name.clone()),
            distance: best.map(|m| m.distance.normalized()),
            components: best
                .map(|m| {
                    m.distance
                        .breakdown()
                        .into_iter()
                        .map(|(key, value)| (key.to_string(), value))
                        .collect()
                })
                .unwrap_or_default(),
            unmatched: best.map(|m| m.mapping.unmatched.len()).unwrap_or(0),
            missing: best.map(|m| m.mapping.missing.len()).unwrap_or(0),
            error: outcome.error.as_ref().map(|e| e.to_string()),
        }
    }
}
