//! Test utilities and fixtures for release-matcher tests.
//!
//! Builders return plain structs with sensible defaults; customize with
//! struct update syntax or by mutating fields:
//!
//! ```ignore
//! use release_matcher::test_utils::{local_track, candidate_release};
//!
//! let mut track = local_track("/music/Abbey Road/01.flac", "The Beatles", "Abbey Road", "Come Together", 1);
//! track.file_info.year = Some(1969);
//! ```

use std::time::Duration;

use chrono::NaiveDate;

use crate::model::{
    AlbumRef, ArtistRef, CandidateRelease, CatalogTrack, LocalTrackItem, ParsedTrackInfo,
};

/// A local track with file tags for artist, album, title and track number.
pub fn local_track(path: &str, artist: &str, album: &str, title: &str, number: u32) -> LocalTrackItem {
    LocalTrackItem {
        path: path.into(),
        size: 4_000_000,
        file_info: ParsedTrackInfo {
            title: Some(title.to_string()),
            artist_title: Some(artist.to_string()),
            album_title: Some(album.to_string()),
            track_numbers: vec![number],
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A local track with a duration in seconds.
pub fn timed_track(
    path: &str,
    artist: &str,
    album: &str,
    title: &str,
    number: u32,
    secs: u64,
) -> LocalTrackItem {
    let mut track = local_track(path, artist, album, title, number);
    track.file_info.duration = Some(Duration::from_secs(secs));
    track
}

/// A catalog track on medium 1.
pub fn catalog_track(number: u32, title: &str, recording_id: &str, secs: u64) -> CatalogTrack {
    CatalogTrack {
        foreign_track_id: format!("t-{}", recording_id),
        foreign_recording_id: recording_id.to_string(),
        title: title.to_string(),
        artist_name: None,
        absolute_track_number: number,
        medium_number: 1,
        duration: Some(Duration::from_secs(secs)),
    }
}

pub fn artist(id: &str, name: &str) -> ArtistRef {
    ArtistRef {
        foreign_artist_id: id.to_string(),
        name: name.to_string(),
    }
}

/// An album by `artist_name`, released on January 1st of `year`.
pub fn album(id: &str, title: &str, artist_name: &str, year: i32) -> AlbumRef {
    AlbumRef {
        foreign_album_id: id.to_string(),
        title: title.to_string(),
        artist: artist(&format!("{}-artist", id), artist_name),
        release_date: NaiveDate::from_ymd_opt(year, 1, 1),
    }
}

/// A single-medium release with no countries, labels or disambiguation.
pub fn candidate_release(id: &str, title: &str, artist_name: &str, track_count: usize) -> CandidateRelease {
    CandidateRelease {
        foreign_release_id: id.to_string(),
        title: title.to_string(),
        countries: vec![],
        labels: vec![],
        disambiguation: String::new(),
        medium_count: 1,
        track_count,
        album: album(&format!("{}-album", id), title, artist_name, 1969),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_track_defaults() {
        let track = local_track("/music/a/01.flac", "Artist", "Album", "Title", 3);
        assert_eq!(track.file_info.primary_track_number(), 3);
        assert_eq!(track.file_info.album_title.as_deref(), Some("Album"));
        assert!(track.acoustic_ids.is_none());
        assert!(track.file_info.duration.is_none());
    }

    #[test]
    fn test_candidate_release_defaults() {
        let release = candidate_release("r-1", "Abbey Road", "The Beatles", 17);
        assert_eq!(release.display_title(), "Abbey Road");
        assert_eq!(release.album.artist.name, "The Beatles");
        assert_eq!(release.album.release_year(), Some(1969));
        assert_eq!(release.track_count, 17);
    }
}
