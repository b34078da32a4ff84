//! In-memory collaborators backed by a session snapshot.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::distance::string_distance;
use crate::identification::{CatalogError, CatalogService, FingerprintError, FingerprintService};
use crate::model::{AlbumRef, ArtistRef, CandidateRelease, CatalogTrack, LocalTrackItem};

/// Names further apart than this are not offered as candidates.
const CANDIDATE_MAX_DISTANCE: f64 = 0.3;

/// Catalog holding every artist, album and release of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    artists: Vec<ArtistRef>,
    albums: Vec<AlbumRef>,
    releases: Vec<(CandidateRelease, Vec<CatalogTrack>)>,
}

impl InMemoryCatalog {
    /// Create a catalog. Track lists are expected in medium/track order.
    pub fn new(
        artists: Vec<ArtistRef>,
        albums: Vec<AlbumRef>,
        releases: Vec<(CandidateRelease, Vec<CatalogTrack>)>,
    ) -> Self {
        Self {
            artists,
            albums,
            releases,
        }
    }

    pub fn artist(&self, id: &str) -> Option<&ArtistRef> {
        self.artists.iter().find(|a| a.foreign_artist_id == id)
    }

    pub fn album(&self, id: &str) -> Option<&AlbumRef> {
        self.albums.iter().find(|a| a.foreign_album_id == id)
    }

    pub fn release(&self, id: &str) -> Option<&CandidateRelease> {
        self.releases
            .iter()
            .map(|(release, _)| release)
            .find(|r| r.foreign_release_id == id)
    }

    /// Number of releases in the snapshot
    pub fn release_count(&self) -> usize {
        self.releases.len()
    }

    fn releases_where(&self, keep: impl Fn(&CandidateRelease, &[CatalogTrack]) -> bool) -> Vec<CandidateRelease> {
        self.releases
            .iter()
            .filter(|(release, tracks)| keep(release, tracks))
            .map(|(release, _)| release.clone())
            .collect()
    }
}

/// Keep the items whose name is close to `tag`, closest first.
fn closest<'a, T: Clone + 'a>(
    items: impl Iterator<Item = &'a T>,
    tag: &str,
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    let mut scored: Vec<(f64, &T)> = items
        .map(|item| (string_distance(name(item), tag), item))
        .filter(|(d, _)| *d <= CANDIDATE_MAX_DISTANCE)
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, item)| item.clone()).collect()
}

impl CatalogService for InMemoryCatalog {
    fn releases_by_foreign_ids(&self, ids: &[String]) -> Result<Vec<CandidateRelease>, CatalogError> {
        Ok(self.releases_where(|r, _| ids.contains(&r.foreign_release_id)))
    }

    fn releases_by_album(&self, album: &AlbumRef) -> Result<Vec<CandidateRelease>, CatalogError> {
        Ok(self.releases_where(|r, _| r.album.foreign_album_id == album.foreign_album_id))
    }

    fn candidate_albums(&self, artist: &ArtistRef, album_tag: &str) -> Result<Vec<AlbumRef>, CatalogError> {
        let by_artist = self
            .albums
            .iter()
            .filter(|a| a.artist.foreign_artist_id == artist.foreign_artist_id);
        Ok(closest(by_artist, album_tag, |a| a.title.as_str()))
    }

    fn candidate_artists(&self, artist_tag: &str) -> Result<Vec<ArtistRef>, CatalogError> {
        Ok(closest(self.artists.iter(), artist_tag, |a| a.name.as_str()))
    }

    fn releases_by_recording_ids(&self, ids: &[String]) -> Result<Vec<CandidateRelease>, CatalogError> {
        Ok(self.releases_where(|_, tracks| {
            tracks.iter().any(|t| ids.contains(&t.foreign_recording_id))
        }))
    }

    fn tracks_by_release(&self, release_id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        self.releases
            .iter()
            .find(|(release, _)| release.foreign_release_id == release_id)
            .map(|(_, tracks)| tracks.clone())
            .ok_or_else(|| CatalogError::NotFound(release_id.to_string()))
    }
}

/// Fingerprinter replaying recorded lookup results.
///
/// Results in a snapshot have already passed the similarity threshold of
/// whatever produced them, so the threshold is not applied again.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFingerprinter {
    results: HashMap<PathBuf, Vec<String>>,
}

impl SnapshotFingerprinter {
    pub fn new(results: HashMap<PathBuf, Vec<String>>) -> Self {
        Self { results }
    }

    /// True when no results were recorded
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl FingerprintService for SnapshotFingerprinter {
    fn lookup(&self, tracks: &mut [LocalTrackItem], threshold: f64) -> Result<(), FingerprintError> {
        if self.results.is_empty() {
            return Err(FingerprintError::Unavailable(
                "session has no fingerprint results".to_string(),
            ));
        }

        for track in tracks.iter_mut() {
            let ids = self.results.get(&track.path).cloned().unwrap_or_default();
            tracing::trace!(
                "Fingerprint {:?}: {} recording(s) (threshold {})",
                track.path,
                ids.len(),
                threshold
            );
            track.acoustic_ids = Some(ids);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{album, artist, candidate_release, catalog_track, local_track};

    fn catalog() -> InMemoryCatalog {
        let beatles = artist("a-beatles", "The Beatles");
        let stones = artist("a-stones", "The Rolling Stones");

        let mut abbey_road = album("al-abbey", "Abbey Road", "The Beatles", 1969);
        abbey_road.artist = beatles.clone();
        let mut let_it_bleed = album("al-bleed", "Let It Bleed", "The Rolling Stones", 1969);
        let_it_bleed.artist = stones.clone();

        let mut uk = candidate_release("r-uk", "Abbey Road", "The Beatles", 2);
        uk.album = abbey_road.clone();
        let mut bleed = candidate_release("r-bleed", "Let It Bleed", "The Rolling Stones", 1);
        bleed.album = let_it_bleed.clone();

        InMemoryCatalog::new(
            vec![beatles, stones],
            vec![abbey_road, let_it_bleed],
            vec![
                (
                    uk,
                    vec![
                        catalog_track(1, "Come Together", "rec-1", 259),
                        catalog_track(2, "Something", "rec-2", 182),
                    ],
                ),
                (bleed, vec![catalog_track(1, "Gimme Shelter", "rec-9", 271)]),
            ],
        )
    }

    #[test]
    fn test_candidate_artists_are_fuzzy_and_ordered() {
        let catalog = catalog();

        let found = catalog.candidate_artists("the beatles").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].foreign_artist_id, "a-beatles");

        assert!(catalog.candidate_artists("Miles Davis").unwrap().is_empty());
    }

    #[test]
    fn test_candidate_albums_limited_to_artist() {
        let catalog = catalog();
        let beatles = catalog.artist("a-beatles").unwrap().clone();

        let found = catalog.candidate_albums(&beatles, "Abbey Road").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].foreign_album_id, "al-abbey");

        assert!(catalog.candidate_albums(&beatles, "Let It Bleed").unwrap().is_empty());
    }

    #[test]
    fn test_release_lookups() {
        let catalog = catalog();

        let by_ids = catalog
            .releases_by_foreign_ids(&["r-bleed".to_string(), "r-unknown".to_string()])
            .unwrap();
        assert_eq!(by_ids.len(), 1);

        let by_recording = catalog.releases_by_recording_ids(&["rec-2".to_string()]).unwrap();
        assert_eq!(by_recording[0].foreign_release_id, "r-uk");

        let album = catalog.album("al-abbey").unwrap().clone();
        assert_eq!(catalog.releases_by_album(&album).unwrap().len(), 1);

        assert!(matches!(
            catalog.tracks_by_release("r-unknown"),
            Err(CatalogError::NotFound(_))
        ));
        assert_eq!(catalog.release_count(), 2);
    }

    #[test]
    fn test_snapshot_fingerprinter() {
        let mut results = HashMap::new();
        results.insert(PathBuf::from("/music/a/01.flac"), vec!["rec-1".to_string()]);
        let fingerprinter = SnapshotFingerprinter::new(results);

        let mut tracks = vec![
            local_track("/music/a/01.flac", "A", "B", "C", 1),
            local_track("/music/a/02.flac", "A", "B", "D", 2),
        ];
        fingerprinter.lookup(&mut tracks, 0.5).unwrap();

        assert_eq!(tracks[0].acoustic_ids, Some(vec!["rec-1".to_string()]));
        assert_eq!(tracks[1].acoustic_ids, Some(vec![]));
    }

    #[test]
    fn test_empty_snapshot_fingerprinter_is_unavailable() {
        let fingerprinter = SnapshotFingerprinter::default();
        let mut tracks = vec![local_track("/music/a/01.flac", "A", "B", "C", 1)];

        let result = fingerprinter.lookup(&mut tracks, 0.5);
        assert!(matches!(result, Err(FingerprintError::Unavailable(_))));
        assert!(tracks[0].acoustic_ids.is_none());
    }
}
