//! Candidate release search, from narrowest to broadest.
//!
//! 1. A consensus release ID on every track is taken as ground truth.
//! 2. Otherwise the caller's hints narrow the search: release, album, artist,
//!    or nothing (search by the artist tag).
//! 3. If that finds nothing, or fingerprinting is forced, the tracks are
//!    fingerprinted and releases sharing enough recordings become candidates.

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use super::domain::{CatalogError, IdentificationError, IdentificationHints};
use super::matcher::most_common;
use super::service::MatchingConfig;
use super::traits::{CatalogService, FingerprintService};
use crate::grouping;
use crate::model::{AlbumRef, ArtistRef, CandidateRelease, LocalReleaseCluster, LocalTrackItem};

/// Produces candidate releases for a cluster.
pub struct CandidateGenerator<'a> {
    catalog: &'a dyn CatalogService,
    fingerprinter: &'a dyn FingerprintService,
    config: &'a MatchingConfig,
    is_various_artists: fn(&[LocalTrackItem]) -> bool,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(
        catalog: &'a dyn CatalogService,
        fingerprinter: &'a dyn FingerprintService,
        config: &'a MatchingConfig,
    ) -> Self {
        Self {
            catalog,
            fingerprinter,
            config,
            is_various_artists: grouping::is_various_artists,
        }
    }

    /// Candidates for `cluster`, best guesses first.
    ///
    /// Fingerprinting writes recording IDs onto the cluster's tracks. Fails
    /// only when the cluster needs the unsupported various-artists search.
    pub fn candidates(
        &self,
        cluster: &mut LocalReleaseCluster,
        hints: &IdentificationHints,
        force_fingerprint: bool,
    ) -> Result<Vec<CandidateRelease>, IdentificationError> {
        if let Some(release_id) = consensus_release_id(&cluster.tracks) {
            debug!(release_id, "Selecting release from consensus release id");
            let ids = [release_id.to_string()];
            return Ok(self.or_empty(
                "releases by id",
                self.catalog.releases_by_foreign_ids(&ids),
            ));
        }

        let mut candidates = Vec::new();

        if !force_fingerprint {
            candidates = if let Some(ref release) = hints.release {
                debug!(release = %release, tracks = release.track_count, "Release was forced");
                vec![release.clone()]
            } else if let Some(ref album) = hints.album {
                self.by_album(cluster, album)
            } else if let Some(ref artist) = hints.artist {
                self.by_artist(cluster, artist)
            } else {
                self.by_tags(cluster)?
            };
        }

        if candidates.is_empty() {
            debug!("No candidates found, fingerprinting");
            cluster.mark_fingerprint_tried();
            if let Err(e) = self
                .fingerprinter
                .lookup(&mut cluster.tracks, self.config.fingerprint_similarity)
            {
                warn!(error = %e, "Fingerprint lookup failed");
            }
            candidates = self.by_fingerprint(cluster);
        }

        Ok(candidates)
    }

    /// Releases of `album` with a track count close to the cluster's, closest first.
    fn by_album(&self, cluster: &LocalReleaseCluster, album: &AlbumRef) -> Vec<CandidateRelease> {
        let count = cluster.track_count();
        let window = self.config.album_track_count_window;

        let mut releases: Vec<CandidateRelease> = self
            .or_empty("releases by album", self.catalog.releases_by_album(album))
            .into_iter()
            .filter(|r| r.track_count.abs_diff(count) <= window)
            .collect();
        releases.sort_by_key(|r| r.track_count.abs_diff(count));
        releases
    }

    /// Releases of albums by `artist` matching the cluster's album tag.
    fn by_artist(&self, cluster: &LocalReleaseCluster, artist: &ArtistRef) -> Vec<CandidateRelease> {
        trace!(artist = %artist.name, "Getting candidates for artist");

        let album_tag = most_common(cluster.tracks.iter().map(|t| t.file_info.album_title.as_deref()))
            .filter(|tag| !tag.trim().is_empty());
        let Some(album_tag) = album_tag else {
            return Vec::new();
        };

        self.or_empty(
            "candidate albums",
            self.catalog.candidate_albums(artist, album_tag),
        )
        .iter()
        .flat_map(|album| self.by_album(cluster, album))
        .collect()
    }

    /// Most general search: artists matching the cluster's artist tag.
    fn by_tags(&self, cluster: &LocalReleaseCluster) -> Result<Vec<CandidateRelease>, IdentificationError> {
        if (self.is_various_artists)(&cluster.tracks) {
            return Err(IdentificationError::VariousArtistsUnsupported);
        }

        let artist_tag = most_common(cluster.tracks.iter().map(|t| t.file_info.artist_title.as_deref()))
            .filter(|tag| !tag.trim().is_empty());
        let Some(artist_tag) = artist_tag else {
            return Ok(Vec::new());
        };

        Ok(self
            .or_empty("candidate artists", self.catalog.candidate_artists(artist_tag))
            .iter()
            .flat_map(|artist| self.by_artist(cluster, artist))
            .collect())
    }

    /// Releases sharing enough fingerprinted recordings with the cluster.
    fn by_fingerprint(&self, cluster: &LocalReleaseCluster) -> Vec<CandidateRelease> {
        let recording_ids: Vec<String> = cluster
            .tracks
            .iter()
            .filter_map(|t| t.acoustic_ids.as_ref())
            .flatten()
            .cloned()
            .collect();
        if recording_ids.is_empty() {
            trace!("No fingerprint results to search by");
            return Vec::new();
        }

        let wanted: HashSet<&str> = recording_ids.iter().map(String::as_str).collect();
        let count = cluster.track_count();

        let mut scored: Vec<(CandidateRelease, f64)> = Vec::new();
        for release in self.or_empty(
            "releases by recording",
            self.catalog.releases_by_recording_ids(&recording_ids),
        ) {
            let tracks = match self.catalog.tracks_by_release(&release.foreign_release_id) {
                Ok(tracks) => tracks,
                Err(e) => {
                    warn!(release = %release, error = %e, "Failed to load release tracks, skipping");
                    continue;
                }
            };

            let common: HashSet<&str> = tracks
                .iter()
                .map(|t| t.foreign_recording_id.as_str())
                .filter(|id| wanted.contains(id))
                .collect();
            let proportion = common.len() as f64 / count as f64;
            trace!(release = %release, proportion, "Fingerprint overlap");

            if proportion > self.config.fingerprint_min_common_proportion {
                scored.push((release, proportion));
            }
        }

        scored.sort_by(|(a, pa), (b, pb)| {
            a.track_count
                .abs_diff(count)
                .cmp(&b.track_count.abs_diff(count))
                .then(pb.total_cmp(pa))
        });

        scored
            .into_iter()
            .take(self.config.fingerprint_max_candidates)
            .map(|(release, _)| release)
            .collect()
    }

    /// Downgrade a failed lookup to "no candidates from this path".
    fn or_empty<T>(&self, what: &str, result: Result<Vec<T>, CatalogError>) -> Vec<T> {
        result.unwrap_or_else(|e| {
            warn!(lookup = what, error = %e, "Catalog lookup failed, continuing without candidates");
            Vec::new()
        })
    }
}

/// The release ID every track agrees on, if all carry the same non-blank one.
fn consensus_release_id(tracks: &[LocalTrackItem]) -> Option<&str> {
    let mut ids = tracks.iter().map(|t| t.file_info.release_catalog_id.as_deref());
    let first = ids.next()??;
    if first.trim().is_empty() {
        return None;
    }
    ids.all(|id| id == Some(first)).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identification::traits::mocks::{MockCatalog, MockFingerprinter};
    use crate::model::CatalogTrack;
    use crate::test_utils::{candidate_release, catalog_track, local_track};

    fn cluster(count: u32) -> LocalReleaseCluster {
        LocalReleaseCluster::new(
            (1..=count)
                .map(|n| local_track(&format!("/music/Abbey Road/{:02}.flac", n), "The Beatles", "Abbey Road", &format!("Track {}", n), n))
                .collect(),
        )
    }

    fn release_with_tracks(id: &str, recordings: &[&str]) -> (CandidateRelease, Vec<CatalogTrack>) {
        let tracks = recordings
            .iter()
            .enumerate()
            .map(|(i, rec)| catalog_track(i as u32 + 1, &format!("Track {}", i + 1), rec, 180))
            .collect::<Vec<_>>();
        (candidate_release(id, "Abbey Road", "The Beatles", tracks.len()), tracks)
    }

    fn ids(releases: &[CandidateRelease]) -> Vec<&str> {
        releases.iter().map(|r| r.foreign_release_id.as_str()).collect()
    }

    #[test]
    fn test_consensus_release_id() {
        let mut tracks = cluster(3).tracks;
        assert_eq!(consensus_release_id(&tracks), None);

        for track in &mut tracks {
            track.file_info.release_catalog_id = Some("r-123".to_string());
        }
        assert_eq!(consensus_release_id(&tracks), Some("r-123"));

        tracks[1].file_info.release_catalog_id = None;
        assert_eq!(consensus_release_id(&tracks), None);

        for track in &mut tracks {
            track.file_info.release_catalog_id = Some(" ".to_string());
        }
        assert_eq!(consensus_release_id(&tracks), None);
    }

    #[test]
    fn test_consensus_id_skips_other_searches() {
        let catalog = MockCatalog::with_releases(vec![release_with_tracks("r-123", &["a", "b", "c"])]);
        let fingerprinter = MockFingerprinter::no_matches();
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let mut cluster = cluster(3);
        for track in &mut cluster.tracks {
            track.file_info.release_catalog_id = Some("r-123".to_string());
        }

        // Even a forced fingerprint pass trusts the consensus id
        for force in [false, true] {
            let candidates = generator.candidates(&mut cluster, &Default::default(), force).unwrap();
            assert_eq!(ids(&candidates), vec!["r-123"]);
        }
        assert_eq!(catalog.calls("releases_by_foreign_ids"), 2);
        assert_eq!(catalog.calls("candidate_artists"), 0);
        assert_eq!(catalog.calls("candidate_albums"), 0);
        assert_eq!(catalog.calls("releases_by_album"), 0);
        assert_eq!(fingerprinter.lookups(), 0);
    }

    #[test]
    fn test_release_hint_is_the_only_candidate() {
        let catalog = MockCatalog::with_releases(vec![release_with_tracks("r-1", &["a", "b", "c"])]);
        let fingerprinter = MockFingerprinter::no_matches();
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let hints = IdentificationHints {
            release: Some(candidate_release("r-pinned", "Pinned", "Someone", 3)),
            ..Default::default()
        };
        let candidates = generator.candidates(&mut cluster(3), &hints, false).unwrap();
        assert_eq!(ids(&candidates), vec!["r-pinned"]);
        assert_eq!(catalog.calls("candidate_artists"), 0);
    }

    #[test]
    fn test_album_hint_filters_and_orders_by_track_count() {
        let (base, _) = release_with_tracks("r-10", &[]);
        let album = base.album.clone();
        let release = |id: &str, count: usize| {
            let mut r = base.clone();
            r.foreign_release_id = id.to_string();
            r.track_count = count;
            (r, vec![])
        };
        let catalog = MockCatalog::with_releases(vec![
            release("r-far", 16),
            release("r-plus3", 13),
            release("r-exact", 10),
            release("r-minus1", 9),
        ]);
        let fingerprinter = MockFingerprinter::no_matches();
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let hints = IdentificationHints {
            album: Some(album),
            ..Default::default()
        };
        let candidates = generator.candidates(&mut cluster(10), &hints, false).unwrap();
        assert_eq!(ids(&candidates), vec!["r-exact", "r-minus1", "r-plus3"]);
    }

    #[test]
    fn test_artist_hint_uses_album_tag() {
        let (release, tracks) = release_with_tracks("r-1", &["a", "b", "c"]);
        let artist = release.album.artist.clone();
        let catalog = MockCatalog::with_releases(vec![(release, tracks)]);
        let fingerprinter = MockFingerprinter::no_matches();
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let hints = IdentificationHints {
            artist: Some(artist),
            ..Default::default()
        };
        let candidates = generator.candidates(&mut cluster(3), &hints, false).unwrap();
        assert_eq!(ids(&candidates), vec!["r-1"]);
        assert_eq!(catalog.calls("candidate_albums"), 1);
        assert_eq!(catalog.calls("candidate_artists"), 0);
    }

    #[test]
    fn test_no_candidates_fingerprints_once() {
        let catalog = MockCatalog::empty();
        let fingerprinter = MockFingerprinter::no_matches();
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let mut cluster = cluster(3);
        let candidates = generator.candidates(&mut cluster, &Default::default(), false).unwrap();
        assert!(candidates.is_empty());
        assert_eq!(fingerprinter.lookups(), 1);
        assert!(cluster.has_fingerprints());
    }

    #[test]
    fn test_catalog_failure_falls_back_to_fingerprints() {
        let catalog = MockCatalog::with_error(CatalogError::Lookup("timeout".to_string()));
        let fingerprinter = MockFingerprinter::with_results(&[("01.flac", "a")]);
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let candidates = generator.candidates(&mut cluster(3), &Default::default(), false).unwrap();
        assert!(candidates.is_empty());
        assert_eq!(fingerprinter.lookups(), 1);
        assert_eq!(catalog.calls("releases_by_recording_ids"), 1);
    }

    #[test]
    fn test_fingerprint_failure_is_not_fatal() {
        let catalog = MockCatalog::empty();
        let fingerprinter = MockFingerprinter::with_error(crate::identification::FingerprintError::Lookup(
            "service down".to_string(),
        ));
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let mut cluster = cluster(3);
        let candidates = generator.candidates(&mut cluster, &Default::default(), true).unwrap();
        assert!(candidates.is_empty());
        assert!(!cluster.has_fingerprints());
    }

    #[test]
    fn test_fingerprint_candidates_filtered_and_ordered() {
        let catalog = MockCatalog::with_releases(vec![
            // 1 of 3 in common: below the 0.6 proportion
            release_with_tracks("r-partial", &["a", "x", "y"]),
            // All in common, one extra track
            release_with_tracks("r-deluxe", &["a", "b", "c", "d"]),
            // All in common, same size
            release_with_tracks("r-exact", &["c", "b", "a"]),
            // 2 of 3 in common, same size
            release_with_tracks("r-two", &["a", "b", "z"]),
        ]);
        let fingerprinter = MockFingerprinter::with_results(&[("01.flac", "a"), ("02.flac", "b"), ("03.flac", "c")]);
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let mut cluster = cluster(3);
        let candidates = generator.candidates(&mut cluster, &Default::default(), true).unwrap();
        assert_eq!(ids(&candidates), vec!["r-exact", "r-two", "r-deluxe"]);
        assert_eq!(catalog.calls("candidate_artists"), 0);
        assert_eq!(
            cluster.tracks[0].acoustic_ids.as_deref(),
            Some(&["a".to_string()][..])
        );
    }

    #[test]
    fn test_fingerprint_candidates_capped() {
        let releases = (0..15)
            .map(|i| release_with_tracks(&format!("r-{:02}", i), &["a", "b", "c"]))
            .collect();
        let catalog = MockCatalog::with_releases(releases);
        let fingerprinter = MockFingerprinter::with_results(&[("01.flac", "a"), ("02.flac", "b"), ("03.flac", "c")]);
        let config = MatchingConfig::default();
        let generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);

        let candidates = generator.candidates(&mut cluster(3), &Default::default(), true).unwrap();
        assert_eq!(candidates.len(), 10);
        assert_eq!(candidates[0].foreign_release_id, "r-00");
    }

    #[test]
    fn test_various_artists_search_fails_fast() {
        let catalog = MockCatalog::empty();
        let fingerprinter = MockFingerprinter::no_matches();
        let config = MatchingConfig::default();
        let mut generator = CandidateGenerator::new(&catalog, &fingerprinter, &config);
        generator.is_various_artists = |_| true;

        let result = generator.candidates(&mut cluster(3), &Default::default(), false);
        assert_eq!(result.unwrap_err(), IdentificationError::VariousArtistsUnsupported);
        assert_eq!(fingerprinter.lookups(), 0);

        // Hints bypass the general search
        let hints = IdentificationHints {
            artist: Some(ArtistRef::default()),
            ..Default::default()
        };
        assert!(generator.candidates(&mut cluster(3), &hints, false).is_ok());
    }
}
