//! Adapter layer: Convert session DTOs to domain models
//!
//! This is the ONLY place where session DTO types are converted to domain
//! types. Dangling references (a release whose album is missing, an album
//! whose artist is missing) are rejected here so the in-memory catalog can
//! assume a consistent snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::dto;
use super::memory::{InMemoryCatalog, SnapshotFingerprinter};
use crate::error::{Error, Result};
use crate::model::{AlbumRef, ArtistRef, CandidateRelease, CatalogTrack};

/// Convert a catalog snapshot into an in-memory catalog
pub fn to_catalog(catalog: dto::CatalogDto) -> Result<InMemoryCatalog> {
    let artists: Vec<ArtistRef> = catalog.artists.into_iter().map(to_artist).collect();
    let by_id: HashMap<&str, &ArtistRef> = artists
        .iter()
        .map(|a| (a.foreign_artist_id.as_str(), a))
        .collect();

    let mut albums = Vec::with_capacity(catalog.albums.len());
    for album in catalog.albums {
        let artist = by_id.get(album.artist_id.as_str()).ok_or_else(|| {
            Error::invalid_session(format!(
                "album {} references unknown artist {}",
                album.id, album.artist_id
            ))
        })?;
        albums.push(AlbumRef {
            foreign_album_id: album.id,
            title: album.title,
            artist: (*artist).clone(),
            release_date: album.release_date,
        });
    }

    let mut releases = Vec::with_capacity(catalog.releases.len());
    for release in catalog.releases {
        let album = albums
            .iter()
            .find(|a| a.foreign_album_id == release.album_id)
            .ok_or_else(|| {
                Error::invalid_session(format!(
                    "release {} references unknown album {}",
                    release.id, release.album_id
                ))
            })?;
        releases.push(to_release(release, album.clone()));
    }

    Ok(InMemoryCatalog::new(artists, albums, releases))
}

/// Convert recorded fingerprint results into a fingerprinter
pub fn to_fingerprinter(fingerprints: impl IntoIterator<Item = (String, Vec<String>)>) -> SnapshotFingerprinter {
    SnapshotFingerprinter::new(
        fingerprints
            .into_iter()
            .map(|(path, ids)| (PathBuf::from(path), ids))
            .collect(),
    )
}

fn to_artist(artist: dto::ArtistDto) -> ArtistRef {
    ArtistRef {
        foreign_artist_id: artist.id,
        name: artist.name,
    }
}

fn to_release(release: dto::ReleaseDto, album: AlbumRef) -> (CandidateRelease, Vec<CatalogTrack>) {
    let mut tracks: Vec<CatalogTrack> = release.tracks.into_iter().map(to_track).collect();
    tracks.sort_by_key(|t| (t.medium_number, t.absolute_track_number));

    let candidate = CandidateRelease {
        foreign_release_id: release.id,
        title: release.title,
        countries: release.countries,
        labels: release.labels,
        disambiguation: release.disambiguation,
        medium_count: release.media,
        track_count: tracks.len(),
        album,
    };
    (candidate, tracks)
}

fn to_track(track: dto::TrackDto) -> CatalogTrack {
    CatalogTrack {
        foreign_track_id: track.id,
        foreign_recording_id: track.recording_id,
        title: track.title,
        artist_name: track.artist,
        absolute_track_number: track.number,
        medium_number: track.medium,
        duration: track.length.map(Duration::from_millis),
    }
}
