//! Identification service - groups local tracks and matches each cluster
//!
//! This is the high-level API:
//! 1. Group tracks into clusters that look like single releases
//! 2. For each cluster, generate candidate releases from the catalog
//! 3. Score candidates and keep the best, retrying with fingerprints if poor
//! 4. Copy the winning release onto the cluster's tracks
//!
//! Clusters are independent; a failure in one is reported in its outcome and
//! never stops the others.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::candidates::CandidateGenerator;
use super::domain::{ClusterOutcome, IdentificationHints};
use super::matcher::{ReleaseMatcher, ReleaseScorer};
use super::traits::{CatalogService, FingerprintService};
use crate::config::Config;
use crate::distance::DistanceWeights;
use crate::grouping::{GroupingConfig, TrackGrouper};
use crate::model::{LocalReleaseCluster, LocalTrackItem};

/// Configuration for release matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Best distance above which a fingerprint pass is attempted
    pub retry_threshold: f64,
    /// Minimum similarity for fingerprint results
    pub fingerprint_similarity: f64,
    /// Share of the cluster's tracks a release must contain, by recording
    pub fingerprint_min_common_proportion: f64,
    /// Cap on candidates found by fingerprint
    pub fingerprint_max_candidates: usize,
    /// Max track count difference for releases of a known album
    pub album_track_count_window: usize,
    /// Release countries in order of preference
    pub preferred_countries: Vec<String>,
    /// Also compare per-track artist credits
    pub compare_track_artists: bool,
    /// Match clusters on the rayon thread pool
    pub parallel: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            retry_threshold: 0.15,
            fingerprint_similarity: 0.5,
            fingerprint_min_common_proportion: 0.6,
            fingerprint_max_candidates: 10,
            album_track_count_window: 5,
            preferred_countries: ["United Kingdom", "United States", "Europe", "[Worldwide]"]
                .into_iter()
                .map(String::from)
                .collect(),
            compare_track_artists: false,
            parallel: true,
        }
    }
}

/// Service identifying local tracks against a release catalog
pub struct IdentificationService<C, F> {
    catalog: C,
    fingerprinter: F,
    config: MatchingConfig,
    grouping: GroupingConfig,
    weights: DistanceWeights,
}

impl<C: CatalogService, F: FingerprintService> IdentificationService<C, F> {
    /// Create a service with default grouping and unit weights
    pub fn new(catalog: C, fingerprinter: F, config: MatchingConfig) -> Self {
        Self {
            catalog,
            fingerprinter,
            config,
            grouping: GroupingConfig::default(),
            weights: DistanceWeights::default(),
        }
    }

    /// Create a service from a loaded configuration file
    pub fn from_config(catalog: C, fingerprinter: F, config: &Config) -> Self {
        Self::new(catalog, fingerprinter, config.matching.clone())
            .with_grouping(config.grouping)
            .with_weights(config.weights)
    }

    pub fn with_grouping(mut self, grouping: GroupingConfig) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_weights(mut self, weights: DistanceWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Group tracks into clusters without matching them
    pub fn group(&self, tracks: Vec<LocalTrackItem>) -> Vec<LocalReleaseCluster> {
        TrackGrouper::new(self.grouping).group(tracks)
    }

    /// Group and identify tracks, returning one outcome per cluster
    pub fn identify(
        &self,
        tracks: Vec<LocalTrackItem>,
        hints: &IdentificationHints,
    ) -> Vec<ClusterOutcome> {
        debug!("Starting track identification");
        debug!(
            artist = ?hints.artist.as_ref().map(|a| &a.name),
            album = ?hints.album.as_ref().map(|a| &a.title),
            release = ?hints.release.as_ref().map(|r| &r.foreign_release_id),
            "Specified hints"
        );
        trace!(
            files = ?tracks.iter().map(|t| t.path.display().to_string()).collect::<Vec<_>>(),
            "Processing files"
        );

        let clusters = self.group(tracks);
        info!(clusters = clusters.len(), "Grouped tracks into clusters");

        if self.config.parallel {
            clusters
                .into_par_iter()
                .map(|cluster| self.identify_cluster(cluster, hints))
                .collect()
        } else {
            clusters
                .into_iter()
                .map(|cluster| self.identify_cluster(cluster, hints))
                .collect()
        }
    }

    /// Identify a single, already grouped cluster
    pub fn identify_cluster(
        &self,
        mut cluster: LocalReleaseCluster,
        hints: &IdentificationHints,
    ) -> ClusterOutcome {
        let candidates = CandidateGenerator::new(&self.catalog, &self.fingerprinter, &self.config);
        let scorer = ReleaseScorer::new(&self.config, self.weights);
        let matcher = ReleaseMatcher::new(&self.catalog, candidates, scorer, &self.config);

        let error = match matcher.identify(&mut cluster, hints) {
            Ok(()) => None,
            Err(e) => {
                warn!(tracks = cluster.track_count(), error = %e, "Failed to identify cluster");
                Some(e)
            }
        };

        ClusterOutcome {
            release: cluster,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identification::FingerprintError;
    use crate::identification::traits::mocks::{MockCatalog, MockFingerprinter};
    use crate::model::{CandidateRelease, CatalogTrack};
    use crate::test_utils::{candidate_release, catalog_track, timed_track};

    fn album_tracks(dir: &str, artist: &str, album: &str, titles: &[&str]) -> Vec<LocalTrackItem> {
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let n = i as u32 + 1;
                let mut track = timed_track(&format!("{}/{:02}.flac", dir, n), artist, album, title, n, 180 + n as u64);
                track.file_info.year = Some(1969);
                track
            })
            .collect()
    }

    fn release(id: &str, album: &str, artist: &str, titles: &[&str]) -> (CandidateRelease, Vec<CatalogTrack>) {
        let tracks = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let n = i as u32 + 1;
                catalog_track(n, title, &format!("{}-rec-{}", id, n), 180 + n as u64)
            })
            .collect::<Vec<_>>();
        (candidate_release(id, album, artist, tracks.len()), tracks)
    }

    const ABBEY_ROAD: &[&str] = &["Come Together", "Something", "Maxwell's Silver Hammer"];
    const REVOLVER: &[&str] = &["Taxman", "Eleanor Rigby", "I'm Only Sleeping", "Love You To"];

    fn sequential() -> MatchingConfig {
        MatchingConfig {
            parallel: false,
            ..MatchingConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = MatchingConfig::default();
        assert_eq!(config.retry_threshold, 0.15);
        assert_eq!(config.fingerprint_similarity, 0.5);
        assert_eq!(config.fingerprint_max_candidates, 10);
        assert_eq!(config.preferred_countries[0], "United Kingdom");
        assert_eq!(config.preferred_countries[3], "[Worldwide]");
    }

    #[test]
    fn test_identify_abbey_road() {
        let catalog = MockCatalog::with_releases(vec![release("r-abbey", "Abbey Road", "The Beatles", ABBEY_ROAD)]);
        let fingerprinter = MockFingerprinter::no_matches();
        let service = IdentificationService::new(&catalog, &fingerprinter, sequential());

        let outcomes = service.identify(
            album_tracks("/music/Abbey Road", "The Beatles", "Abbey Road", ABBEY_ROAD),
            &IdentificationHints::default(),
        );

        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert!(outcome.is_matched());
        assert_eq!(outcome.release.best_distance(), 0.0);
        assert_eq!(
            outcome.release.release().map(|r| r.foreign_release_id.as_str()),
            Some("r-abbey")
        );
        assert_eq!(
            outcome.release.tracks[1].tracks.first().map(|t| t.title.as_str()),
            Some("Something")
        );
    }

    #[test]
    fn test_consensus_release_id_queries_by_id_only() {
        let catalog = MockCatalog::with_releases(vec![release("r-123", "Abbey Road", "The Beatles", ABBEY_ROAD)]);
        let fingerprinter = MockFingerprinter::no_matches();
        let service = IdentificationService::new(&catalog, &fingerprinter, sequential());

        let mut tracks = album_tracks("/music/Abbey Road", "The Beatles", "Abbey Road", ABBEY_ROAD);
        for track in &mut tracks {
            track.file_info.release_catalog_id = Some("r-123".to_string());
        }
        let outcomes = service.identify(tracks, &IdentificationHints::default());

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_matched());
        assert_eq!(catalog.calls("releases_by_foreign_ids"), 1);
        assert_eq!(catalog.calls("candidate_artists"), 0);
        assert_eq!(catalog.calls("candidate_albums"), 0);
        assert_eq!(catalog.calls("releases_by_album"), 0);
    }

    #[test]
    fn test_zero_candidates_fingerprint_exactly_once() {
        let catalog = MockCatalog::empty();
        let fingerprinter = MockFingerprinter::no_matches();
        let service = IdentificationService::new(&catalog, &fingerprinter, sequential());

        let outcomes = service.identify(
            album_tracks("/music/Unknown", "Nobody", "Nothing", ABBEY_ROAD),
            &IdentificationHints::default(),
        );

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].error.is_none());
        assert!(outcomes[0].release.best().is_none());
        assert_eq!(fingerprinter.lookups(), 1);
    }

    #[test]
    fn test_failing_fingerprinter_is_asked_once() {
        let catalog = MockCatalog::empty();
        let fingerprinter =
            MockFingerprinter::with_error(FingerprintError::Unavailable("no fpcalc".to_string()));
        let service = IdentificationService::new(&catalog, &fingerprinter, sequential());

        let outcomes = service.identify(
            album_tracks("/music/Unknown", "Nobody", "Nothing", ABBEY_ROAD),
            &IdentificationHints::default(),
        );

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].error.is_none());
        assert!(outcomes[0].release.best().is_none());
        assert!(!outcomes[0].release.has_fingerprints());
        assert_eq!(fingerprinter.lookups(), 1);
    }

    #[test]
    fn test_fingerprint_fallback_finds_release() {
        // Tags point nowhere, fingerprints identify the release
        let catalog = MockCatalog::with_releases(vec![release("r-abbey", "Abbey Road", "The Beatles", ABBEY_ROAD)]);
        let fingerprinter = MockFingerprinter::with_results(&[
            ("01.flac", "r-abbey-rec-1"),
            ("02.flac", "r-abbey-rec-2"),
            ("03.flac", "r-abbey-rec-3"),
        ]);
        let service = IdentificationService::new(&catalog, &fingerprinter, sequential());

        let mut tracks = album_tracks("/music/rip", "Track Artist", "Disc", ABBEY_ROAD);
        for track in &mut tracks {
            track.file_info.artist_title = None;
        }
        let outcomes = service.identify(tracks, &IdentificationHints::default());

        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].release.release().map(|r| r.foreign_release_id.as_str()),
            Some("r-abbey")
        );
        assert_eq!(fingerprinter.lookups(), 1);
    }

    #[test]
    fn test_clusters_are_isolated() {
        let mut catalog = MockCatalog::with_releases(vec![
            release("r-abbey", "Abbey Road", "The Beatles", ABBEY_ROAD),
            release("r-revolver", "Revolver", "The Beatles", REVOLVER),
        ]);
        catalog.broken_track_lists = vec!["r-abbey".to_string()];
        let fingerprinter = MockFingerprinter::no_matches();

        let mut tracks = album_tracks("/music/Abbey Road", "The Beatles", "Abbey Road", ABBEY_ROAD);
        tracks.extend(album_tracks("/music/Revolver", "The Beatles", "Revolver", REVOLVER));

        for config in [sequential(), MatchingConfig::default()] {
            let service = IdentificationService::new(&catalog, &fingerprinter, config);
            let outcomes = service.identify(tracks.clone(), &IdentificationHints::default());

            assert_eq!(outcomes.len(), 2);
            let matched: Vec<_> = outcomes
                .iter()
                .filter_map(|o| o.release.release().map(|r| r.foreign_release_id.clone()))
                .collect();
            assert_eq!(matched, vec!["r-revolver".to_string()]);
            assert!(outcomes.iter().all(|o| o.error.is_none()));
        }
    }

    #[test]
    fn test_parallel_preserves_cluster_order() {
        let catalog = MockCatalog::with_releases(vec![
            release("r-abbey", "Abbey Road", "The Beatles", ABBEY_ROAD),
            release("r-revolver", "Revolver", "The Beatles", REVOLVER),
        ]);
        let fingerprinter = MockFingerprinter::no_matches();

        let mut tracks = album_tracks("/music/Abbey Road", "The Beatles", "Abbey Road", ABBEY_ROAD);
        tracks.extend(album_tracks("/music/Revolver", "The Beatles", "Revolver", REVOLVER));

        let run = |config: MatchingConfig| -> Vec<Option<String>> {
            IdentificationService::new(&catalog, &fingerprinter, config)
                .identify(tracks.clone(), &IdentificationHints::default())
                .iter()
                .map(|o| o.release.release().map(|r| r.foreign_release_id.clone()))
                .collect()
        };

        // Revolver passes the folder check, Abbey Road only the last-resort pass
        let expected = vec![Some("r-revolver".to_string()), Some("r-abbey".to_string())];
        assert_eq!(run(sequential()), expected);
        assert_eq!(run(MatchingConfig::default()), expected);
    }
}
