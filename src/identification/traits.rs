//! Collaborator traits for catalog and fingerprint lookups.
//!
//! The engine never talks to a database or network itself. It asks these
//! traits, which lets tests substitute mocks and lets the CLI plug in an
//! offline snapshot.
//!
//! # Example
//!
//! ```ignore
//! use release_matcher::identification::{CatalogService, FingerprintService, IdentificationService};
//!
//! fn run<C: CatalogService, F: FingerprintService>(catalog: C, fingerprinter: F) {
//!     let service = IdentificationService::new(catalog, fingerprinter, Default::default());
//!     let outcomes = service.identify(tracks, &Default::default());
//! }
//! ```

use super::domain::{CatalogError, FingerprintError};
use crate::model::{AlbumRef, ArtistRef, CandidateRelease, CatalogTrack, LocalTrackItem};

/// Read access to the release catalog.
///
/// Every lookup returns an ordered, possibly empty list.
pub trait CatalogService: Send + Sync {
    /// Releases with the given foreign release IDs.
    fn releases_by_foreign_ids(&self, ids: &[String]) -> Result<Vec<CandidateRelease>, CatalogError>;

    /// All releases of an album.
    fn releases_by_album(&self, album: &AlbumRef) -> Result<Vec<CandidateRelease>, CatalogError>;

    /// Albums by `artist` plausibly matching an album tag.
    fn candidate_albums(&self, artist: &ArtistRef, album_tag: &str) -> Result<Vec<AlbumRef>, CatalogError>;

    /// Artists plausibly matching an artist tag.
    fn candidate_artists(&self, artist_tag: &str) -> Result<Vec<ArtistRef>, CatalogError>;

    /// Releases containing any of the given recordings.
    fn releases_by_recording_ids(&self, ids: &[String]) -> Result<Vec<CandidateRelease>, CatalogError>;

    /// Ordered track list of a release.
    fn tracks_by_release(&self, release_id: &str) -> Result<Vec<CatalogTrack>, CatalogError>;
}

/// Acoustic fingerprint lookup.
pub trait FingerprintService: Send + Sync {
    /// Attach recording IDs to each track (`acoustic_ids`) for matches at or
    /// above `threshold` similarity.
    fn lookup(&self, tracks: &mut [LocalTrackItem], threshold: f64) -> Result<(), FingerprintError>;
}

impl<T: CatalogService + ?Sized> CatalogService for &T {
    fn releases_by_foreign_ids(&self, ids: &[String]) -> Result<Vec<CandidateRelease>, CatalogError> {
        (**self).releases_by_foreign_ids(ids)
    }

    fn releases_by_album(&self, album: &AlbumRef) -> Result<Vec<CandidateRelease>, CatalogError> {
        (**self).releases_by_album(album)
    }

    fn candidate_albums(&self, artist: &ArtistRef, album_tag: &str) -> Result<Vec<AlbumRef>, CatalogError> {
        (**self).candidate_albums(artist, album_tag)
    }

    fn candidate_artists(&self, artist_tag: &str) -> Result<Vec<ArtistRef>, CatalogError> {
        (**self).candidate_artists(artist_tag)
    }

    fn releases_by_recording_ids(&self, ids: &[String]) -> Result<Vec<CandidateRelease>, CatalogError> {
        (**self).releases_by_recording_ids(ids)
    }

    fn tracks_by_release(&self, release_id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        (**self).tracks_by_release(release_id)
    }
}

impl<T: FingerprintService + ?Sized> FingerprintService for &T {
    fn lookup(&self, tracks: &mut [LocalTrackItem], threshold: f64) -> Result<(), FingerprintError> {
        (**self).lookup(tracks, threshold)
    }
}
