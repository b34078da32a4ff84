//! Core data model for release identification.
//!
//! Defines the local side ([`LocalTrackItem`], [`LocalReleaseCluster`]) and the
//! catalog side ([`CandidateRelease`], [`CatalogTrack`] and their artist/album
//! references) plus the [`TrackAssignment`] that links the two.
//!
//! Catalog types are read-only from the engine's point of view; local items are
//! filled in progressively as fingerprinting and matching proceed.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::distance::Distance;

/// Metadata extracted from a file's tags or its folder name.
///
/// Every field is optional: the parser fills in what it finds and the engine
/// skips sub-distances whose inputs are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedTrackInfo {
    pub title: Option<String>,
    pub artist_title: Option<String>,
    pub album_title: Option<String>,
    /// Track numbers as tagged; the first one is the primary number
    pub track_numbers: Vec<u32>,
    pub disc_number: Option<u32>,
    pub disc_count: Option<u32>,
    pub year: Option<u32>,
    pub country: Option<String>,
    pub label: Option<String>,
    pub disambiguation: Option<String>,
    #[serde(with = "duration_secs")]
    pub duration: Option<Duration>,
    /// Catalog artist ID from tags
    pub artist_catalog_id: Option<String>,
    /// Catalog album (release group) ID from tags
    pub album_catalog_id: Option<String>,
    /// Catalog release ID from tags
    pub release_catalog_id: Option<String>,
    /// Catalog recording ID from tags
    pub recording_id: Option<String>,
}

impl ParsedTrackInfo {
    /// Primary track number, or 0 when untagged.
    pub fn primary_track_number(&self) -> u32 {
        self.track_numbers.first().copied().unwrap_or(0)
    }
}

/// One physical audio file taking part in an identification run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTrackItem {
    /// Absolute file path (unique within a run)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Metadata parsed from the file's own tags
    pub file_info: ParsedTrackInfo,
    /// Metadata parsed from the containing folder (lower trust)
    pub folder_info: ParsedTrackInfo,
    /// Recording IDs reported by the fingerprint service, once looked up
    pub acoustic_ids: Option<Vec<String>>,
    pub artist: Option<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub release: Option<CandidateRelease>,
    pub tracks: Vec<CatalogTrack>,
    pub quality: Option<String>,
    pub language: Option<String>,
}

impl LocalTrackItem {
    /// Directory holding this file.
    pub fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }
}

impl fmt::Display for LocalTrackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// A catalog artist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub foreign_artist_id: String,
    pub name: String,
}

/// A catalog album (release group) with its artist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub foreign_album_id: String,
    pub title: String,
    pub artist: ArtistRef,
    pub release_date: Option<NaiveDate>,
}

impl AlbumRef {
    /// Year of the album's release date, if known.
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

/// A catalog release being evaluated as a match for a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRelease {
    /// Stable foreign identifier
    pub foreign_release_id: String,
    /// Release title (may be empty, see [`CandidateRelease::display_title`])
    pub title: String,
    pub countries: Vec<String>,
    pub labels: Vec<String>,
    pub disambiguation: String,
    /// Number of media (discs)
    pub medium_count: u32,
    pub track_count: usize,
    /// Parent album, carrying artist and release date
    pub album: AlbumRef,
}

impl CandidateRelease {
    /// Release title, falling back to the parent album title.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.album.title
        } else {
            &self.title
        }
    }
}

impl fmt::Display for CandidateRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.display_title(), self.foreign_release_id)
    }
}

/// A track on a catalog release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub foreign_track_id: String,
    pub foreign_recording_id: String,
    pub title: String,
    /// Per-track artist credit (compilations)
    pub artist_name: Option<String>,
    /// Track number counted across all media
    pub absolute_track_number: u32,
    pub medium_number: u32,
    #[serde(default, with = "duration_secs")]
    pub duration: Option<Duration>,
}

impl fmt::Display for CatalogTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.absolute_track_number, self.title)
    }
}

/// One-to-one partial mapping between a cluster's items and a release's tracks.
///
/// Local items are referenced by their index in [`LocalReleaseCluster::tracks`].
#[derive(Debug, Clone, Default)]
pub struct TrackAssignment {
    /// Matched (local index, catalog track) pairs
    pub mapping: Vec<(usize, CatalogTrack)>,
    /// Local items with no catalog track
    pub unmatched: Vec<usize>,
    /// Catalog tracks with no local item
    pub missing: Vec<CatalogTrack>,
}

impl TrackAssignment {
    /// Catalog track mapped to the local item at `index`, if any.
    pub fn track_for(&self, index: usize) -> Option<&CatalogTrack> {
        self.mapping
            .iter()
            .find(|(local, _)| *local == index)
            .map(|(_, track)| track)
    }
}

/// The best candidate found so far for a cluster.
#[derive(Debug, Clone)]
pub struct ReleaseMatch {
    pub release: CandidateRelease,
    pub distance: Distance,
    pub mapping: TrackAssignment,
}

/// A group of local items believed to be one release, plus its match state.
#[derive(Debug, Clone, Default)]
pub struct LocalReleaseCluster {
    pub tracks: Vec<LocalTrackItem>,
    best: Option<ReleaseMatch>,
    fingerprint_tried: bool,
}

impl LocalReleaseCluster {
    pub fn new(tracks: Vec<LocalTrackItem>) -> Self {
        Self {
            tracks,
            best: None,
            fingerprint_tried: false,
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Current best match, if any candidate has been scored.
    pub fn best(&self) -> Option<&ReleaseMatch> {
        self.best.as_ref()
    }

    /// Normalized distance of the current best match; infinite when unset.
    pub fn best_distance(&self) -> f64 {
        self.best
            .as_ref()
            .map(|m| m.distance.normalized())
            .unwrap_or(f64::INFINITY)
    }

    pub fn release(&self) -> Option<&CandidateRelease> {
        self.best.as_ref().map(|m| &m.release)
    }

    /// Replace the current best if `candidate` is strictly closer.
    ///
    /// Returns true when the candidate was taken.
    pub fn offer(&mut self, candidate: ReleaseMatch) -> bool {
        if candidate.distance.normalized() < self.best_distance() {
            self.best = Some(candidate);
            true
        } else {
            false
        }
    }

    /// True once any item carries fingerprint results.
    pub fn has_fingerprints(&self) -> bool {
        self.tracks.iter().any(|t| t.acoustic_ids.is_some())
    }

    /// Record that the fingerprint service was asked, whatever it answered.
    pub fn mark_fingerprint_tried(&mut self) {
        self.fingerprint_tried = true;
    }

    /// True when a fingerprint lookup was attempted or results are present.
    pub fn fingerprint_tried(&self) -> bool {
        self.fingerprint_tried || self.has_fingerprints()
    }

    /// Copy the best match's references onto the local items.
    ///
    /// Mapped items get artist, album, release and catalog track; unmapped
    /// items are cleared.
    pub fn populate_match(&mut self) {
        let Some(best) = self.best.as_ref() else {
            return;
        };

        for (index, item) in self.tracks.iter_mut().enumerate() {
            match best.mapping.track_for(index) {
                Some(track) => {
                    item.artist = Some(best.release.album.artist.clone());
                    item.album = Some(best.release.album.clone());
                    item.release = Some(best.release.clone());
                    item.tracks = vec![track.clone()];
                }
                None => {
                    item.artist = None;
                    item.album = None;
                    item.release = None;
                    item.tracks.clear();
                }
            }
        }
    }
}

/// Serialize `Option<Duration>` as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        // Negative, non-finite and out-of-range values read as unknown
        Ok(secs.and_then(|s| Duration::try_from_secs_f64(s).ok()))
    }
}
