//! Scoring of candidate releases against a local cluster.
//!
//! [`ReleaseScorer`] holds the pure distance functions (track pair, release,
//! track mapping). [`ReleaseMatcher`] drives candidate generation and scoring
//! for one cluster, with a single fingerprint retry when the best match is
//! poor.

use chrono::{Datelike, Local};
use tracing::{debug, trace, warn};

use super::candidates::CandidateGenerator;
use super::domain::{IdentificationError, IdentificationHints};
use super::service::MatchingConfig;
use super::traits::CatalogService;
use crate::assignment::{self, AssignmentError, CostMatrix};
use crate::distance::{Distance, DistanceKey, DistanceWeights};
use crate::model::{
    CandidateRelease, CatalogTrack, LocalReleaseCluster, LocalTrackItem, ReleaseMatch,
    TrackAssignment,
};

/// Artist tags that never name a real per-track artist.
const VARIOUS_ARTIST_NAMES: &[&str] = &["various artists", "various", "va", "unknown"];

/// Catalog artist IDs standing for "Various Artists".
const VARIOUS_ARTIST_IDS: &[&str] = &["89ad4ac3-39f7-470e-963a-56509c546377"];

/// Free seconds of length difference before a track starts being penalized.
const TRACK_LENGTH_GRACE: f64 = 10.0;

/// Length difference (after grace) giving a full penalty.
const TRACK_LENGTH_MAX: f64 = 30.0;

/// Most frequent present value, ties going to the first seen.
pub(crate) fn most_common<T, I>(values: I) -> Option<T>
where
    T: PartialEq,
    I: IntoIterator<Item = Option<T>>,
{
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values.into_iter().flatten() {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Distances
// ============================================================================

/// Computes track-pair and release distances.
#[derive(Debug, Clone)]
pub struct ReleaseScorer<'a> {
    config: &'a MatchingConfig,
    weights: DistanceWeights,
    current_year: i32,
}

impl<'a> ReleaseScorer<'a> {
    pub fn new(config: &'a MatchingConfig, weights: DistanceWeights) -> Self {
        Self {
            config,
            weights,
            current_year: Local::now().year(),
        }
    }

    /// Pin the calendar year used for the year distance.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Distance between one local item and one catalog track.
    pub fn track_distance(&self, local: &LocalTrackItem, track: &CatalogTrack) -> Distance {
        let mut dist = Distance::with_weights(self.weights);
        let info = &local.file_info;

        if let (Some(local_len), Some(catalog_len)) = (info.duration, track.duration)
            && !catalog_len.is_zero()
        {
            let diff = (local_len.as_secs_f64() - catalog_len.as_secs_f64()).abs() - TRACK_LENGTH_GRACE;
            dist.add_ratio(DistanceKey::TrackLength, diff, TRACK_LENGTH_MAX);
        }

        dist.add_string(
            DistanceKey::TrackTitle,
            info.title.as_deref().unwrap_or(""),
            &track.title,
        );

        if self.config.compare_track_artists
            && let Some(artist) = non_blank(info.artist_title.as_deref())
            && !VARIOUS_ARTIST_NAMES
                .iter()
                .any(|va| va.eq_ignore_ascii_case(artist.trim()))
            && let Some(ref catalog_artist) = track.artist_name
        {
            dist.add_string(DistanceKey::TrackArtist, artist, catalog_artist);
        }

        let number = info.primary_track_number();
        if number > 0 && track.absolute_track_number > 0 {
            dist.add_bool(DistanceKey::TrackIndex, number != track.absolute_track_number);
        }

        if let Some(recording_id) = non_blank(info.recording_id.as_deref()) {
            dist.add_bool(
                DistanceKey::RecordingId,
                recording_id != track.foreign_recording_id,
            );
        }

        if let Some(ref acoustic_ids) = local.acoustic_ids {
            dist.add_bool(
                DistanceKey::RecordingId,
                !acoustic_ids.contains(&track.foreign_recording_id),
            );
            trace!(
                local = %local,
                recording = %track.foreign_recording_id,
                candidates = acoustic_ids.len(),
                "Fingerprint comparison"
            );
        }

        dist
    }

    /// Minimum-cost mapping of local items to catalog tracks.
    pub fn map_tracks(
        &self,
        local: &[LocalTrackItem],
        tracks: Vec<CatalogTrack>,
    ) -> Result<TrackAssignment, AssignmentError> {
        let costs = CostMatrix::from_fn(local.len(), tracks.len(), |row, col| {
            self.track_distance(&local[row], &tracks[col]).normalized()
        })?;

        let pairs = assignment::solve(&costs);

        let mut mapped_local = vec![false; local.len()];
        let mut mapped_catalog = vec![false; tracks.len()];
        for &(row, col) in &pairs {
            mapped_local[row] = true;
            mapped_catalog[col] = true;
            trace!(
                local = %local[row],
                track = %tracks[col],
                distance = costs.get(row, col),
                "Mapped track"
            );
        }

        let mapping = pairs
            .iter()
            .map(|&(row, col)| (row, tracks[col].clone()))
            .collect();
        let unmatched = (0..local.len()).filter(|&i| !mapped_local[i]).collect();
        let missing = tracks
            .into_iter()
            .zip(mapped_catalog)
            .filter(|(_, mapped)| !mapped)
            .map(|(track, _)| track)
            .collect();

        Ok(TrackAssignment {
            mapping,
            unmatched,
            missing,
        })
    }

    /// Aggregate distance between a cluster and a candidate release.
    pub fn release_distance(
        &self,
        local: &[LocalTrackItem],
        release: &CandidateRelease,
        mapping: &TrackAssignment,
    ) -> Distance {
        let mut dist = Distance::with_weights(self.weights);
        let infos = || local.iter().map(|t| &t.file_info);
        let album_artist = &release.album.artist;

        if !VARIOUS_ARTIST_IDS.contains(&album_artist.foreign_artist_id.as_str()) {
            let artist = most_common(infos().map(|i| i.artist_title.as_deref()));
            dist.add_string(DistanceKey::Artist, artist.unwrap_or(""), &album_artist.name);
        }

        let album = most_common(infos().map(|i| i.album_title.as_deref()));
        dist.add_string(DistanceKey::Album, album.unwrap_or(""), release.display_title());

        // Discs as tagged, or else the highest disc number seen
        let discs = most_common(infos().map(|i| i.disc_count))
            .filter(|&n| n > 0)
            .or_else(|| infos().filter_map(|i| i.disc_number).max())
            .unwrap_or(0);
        if discs > 0 {
            let diff = discs.abs_diff(release.medium_count);
            let max = discs.max(release.medium_count);
            dist.add_ratio(DistanceKey::Mediums, diff as f64, max as f64);
        }

        // Tagged years beyond i32 are as good as untagged
        let local_year = most_common(infos().map(|i| i.year)).and_then(|y| i32::try_from(y).ok());
        match (local_year, release.album.release_year()) {
            (Some(local_year), Some(year)) if local_year == year => {
                dist.add(DistanceKey::Year, 0.0);
            }
            (Some(local_year), Some(year)) => {
                let diff = (i64::from(local_year) - i64::from(year)).abs();
                let max = (i64::from(self.current_year) - i64::from(year)).abs();
                dist.add_ratio(DistanceKey::Year, diff as f64, max as f64);
            }
            // No usable local year, or no release date on the album
            _ => dist.add(DistanceKey::Year, 1.0),
        }

        if !release.countries.is_empty() {
            if !self.config.preferred_countries.is_empty() {
                dist.add_priority(
                    DistanceKey::Country,
                    &release.countries,
                    &self.config.preferred_countries,
                );
            } else if let Some(country) =
                non_blank(most_common(infos().map(|i| i.country.as_deref())))
            {
                dist.add_equality(DistanceKey::Country, country, &release.countries);
            }
        }

        if let Some(label) = non_blank(most_common(infos().map(|i| i.label.as_deref()))) {
            dist.add_equality(DistanceKey::Label, label, &release.labels);
        }

        if let Some(disambig) =
            non_blank(most_common(infos().map(|i| i.disambiguation.as_deref())))
        {
            dist.add_string(DistanceKey::AlbumDisambig, disambig, &release.disambiguation);
        }

        if let Some(release_id) =
            non_blank(most_common(infos().map(|i| i.release_catalog_id.as_deref())))
        {
            dist.add_equality(
                DistanceKey::AlbumId,
                release_id,
                &[release.foreign_release_id.as_str()],
            );
        }

        for (index, track) in &mapping.mapping {
            let pair = self.track_distance(&local[*index], track);
            dist.add(DistanceKey::Tracks, pair.normalized());
        }

        for _ in &mapping.missing {
            dist.add(DistanceKey::MissingTracks, 1.0);
        }

        for _ in &mapping.unmatched {
            dist.add(DistanceKey::UnmatchedTracks, 1.0);
        }

        trace!(release = %release, distance = %dist, "Release distance");
        dist
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Which pass of the identify loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// Tag and hint based candidate search
    Normal,
    /// Candidates from fingerprint results only
    Fingerprint,
}

/// Finds the best candidate release for one cluster.
pub struct ReleaseMatcher<'a> {
    catalog: &'a dyn CatalogService,
    candidates: CandidateGenerator<'a>,
    scorer: ReleaseScorer<'a>,
    config: &'a MatchingConfig,
}

impl<'a> ReleaseMatcher<'a> {
    pub fn new(
        catalog: &'a dyn CatalogService,
        candidates: CandidateGenerator<'a>,
        scorer: ReleaseScorer<'a>,
        config: &'a MatchingConfig,
    ) -> Self {
        Self {
            catalog,
            candidates,
            scorer,
            config,
        }
    }

    /// Identify a cluster, leaving its best match populated onto its items.
    ///
    /// A poor result (above the retry threshold) triggers one more pass with
    /// fingerprinting forced, unless an album or release was pinned or the
    /// fingerprint service was already asked, even if it failed. The
    /// fingerprint pass competes with the first pass's best; it never runs
    /// twice.
    pub fn identify(
        &self,
        cluster: &mut LocalReleaseCluster,
        hints: &IdentificationHints,
    ) -> Result<(), IdentificationError> {
        let mut attempt = Attempt::Normal;

        loop {
            let force_fingerprint = attempt == Attempt::Fingerprint;
            let candidates = self.candidates.candidates(cluster, hints, force_fingerprint)?;
            self.best_release(cluster, candidates)?;

            let retry = attempt == Attempt::Normal
                && cluster.best_distance() > self.config.retry_threshold
                && !hints.is_authoritative()
                && !cluster.fingerprint_tried();
            if !retry {
                break;
            }

            debug!(
                distance = cluster.best_distance(),
                threshold = self.config.retry_threshold,
                "Best match is poor, retrying with fingerprints"
            );
            attempt = Attempt::Fingerprint;
        }

        cluster.populate_match();
        Ok(())
    }

    /// Score candidates in order, keeping the best. Stops at a perfect match.
    fn best_release(
        &self,
        cluster: &mut LocalReleaseCluster,
        candidates: Vec<CandidateRelease>,
    ) -> Result<(), IdentificationError> {
        debug!(
            tracks = cluster.track_count(),
            candidates = candidates.len(),
            "Matching track files against candidates"
        );

        for release in candidates {
            debug!(release = %release, tracks = release.track_count, "Trying release");

            let tracks = match self.catalog.tracks_by_release(&release.foreign_release_id) {
                Ok(tracks) => tracks,
                Err(e) => {
                    warn!(release = %release, error = %e, "Failed to load release tracks, skipping");
                    continue;
                }
            };

            let mapping = self.scorer.map_tracks(&cluster.tracks, tracks)?;
            let distance = self.scorer.release_distance(&cluster.tracks, &release, &mapping);
            debug!(
                release = %release,
                distance = distance.normalized(),
                best = cluster.best_distance(),
                "Scored release"
            );

            let taken = cluster.offer(ReleaseMatch {
                release,
                distance,
                mapping,
            });
            if taken && cluster.best_distance() == 0.0 {
                break;
            }
        }

        if let Some(best) = cluster.best() {
            debug!(release = %best.release, distance = %best.distance, "Best release");
        }
        Ok(())
    }
}
