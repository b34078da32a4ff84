//! Session file Data Transfer Objects
//!
//! These types match the JSON session document exactly.
//! DO NOT use these types outside the catalog module - convert to domain types.
//!
//! A session holds the parser's output for a batch of files, a snapshot of
//! the catalog entries relevant to them, and any fingerprint results:
//!
//! ```json
//! {
//!   "tracks": [{ "path": "/music/Abbey Road/01.flac", "file_info": { "title": "Come Together" } }],
//!   "catalog": {
//!     "artists": [{ "id": "b10bbbfc", "name": "The Beatles" }],
//!     "albums": [{ "id": "9162580e", "title": "Abbey Road", "artist_id": "b10bbbfc", "release_date": "1969-09-26" }],
//!     "releases": [{ "id": "r-1", "album_id": "9162580e", "media": 1, "tracks": [] }]
//!   },
//!   "fingerprints": { "/music/Abbey Road/01.flac": ["rec-1"] }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::LocalTrackItem;

/// Whole session document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionDto {
    /// Parsed local files
    pub tracks: Vec<LocalTrackItem>,
    /// Catalog snapshot
    pub catalog: CatalogDto,
    /// Recording IDs per file path, as a fingerprint service would report them
    pub fingerprints: BTreeMap<String, Vec<String>>,
}

/// Catalog snapshot
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogDto {
    pub artists: Vec<ArtistDto>,
    pub albums: Vec<AlbumDto>,
    pub releases: Vec<ReleaseDto>,
}

/// Artist entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistDto {
    /// Foreign artist ID
    pub id: String,
    pub name: String,
}

/// Album (release group) entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlbumDto {
    /// Foreign album ID
    pub id: String,
    pub title: String,
    /// Foreign ID of the album artist
    pub artist_id: String,
    /// First release date, `YYYY-MM-DD`
    pub release_date: Option<NaiveDate>,
}

/// Release entry with its track list
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseDto {
    /// Foreign release ID
    pub id: String,
    /// Foreign ID of the parent album
    pub album_id: String,
    /// Release title (empty means "same as album")
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub disambiguation: String,
    /// Number of media
    #[serde(default = "default_media")]
    pub media: u32,
    #[serde(default)]
    pub tracks: Vec<TrackDto>,
}

fn default_media() -> u32 {
    1
}

/// Track entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackDto {
    /// Foreign track ID
    pub id: String,
    /// Foreign recording ID
    pub recording_id: String,
    pub title: String,
    /// Per-track artist credit
    pub artist: Option<String>,
    /// Absolute track number across media
    pub number: u32,
    /// Medium number, starting at 1
    #[serde(default = "default_media")]
    pub medium: u32,
    /// Duration in milliseconds
    pub length: Option<u64>,
}
