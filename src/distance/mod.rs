//! Weighted multi-attribute distance between local metadata and catalog data.
//!
//! A [`Distance`] accumulates named sub-distances ("penalties"), each in
//! `[0, 1]`, and exposes their weighted mean as the normalized distance:
//!
//! ```text
//! normalized = Σ weight(key) × penalty  /  Σ weight(key) × 1
//! ```
//!
//! Lower is better; `0.0` is a perfect match. A key may receive several
//! penalties (one per mapped track, for example); each one counts separately.
//!
//! # Example
//!
//! ```ignore
//! let mut dist = Distance::new();
//! dist.add_string(DistanceKey::Album, "Abbey Road", "Abbey Road");
//! dist.add_ratio(DistanceKey::TrackLength, 12.0, 30.0);
//! assert!(dist.normalized() < 0.5);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a sub-distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistanceKey {
    Artist,
    Album,
    Mediums,
    Year,
    Country,
    Label,
    AlbumDisambig,
    AlbumId,
    Tracks,
    MissingTracks,
    UnmatchedTracks,
    TrackLength,
    TrackTitle,
    TrackArtist,
    TrackIndex,
    RecordingId,
}

impl DistanceKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Mediums => "mediums",
            Self::Year => "year",
            Self::Country => "country",
            Self::Label => "label",
            Self::AlbumDisambig => "albumdisambig",
            Self::AlbumId => "album_id",
            Self::Tracks => "tracks",
            Self::MissingTracks => "missing_tracks",
            Self::UnmatchedTracks => "unmatched_tracks",
            Self::TrackLength => "track_length",
            Self::TrackTitle => "track_title",
            Self::TrackArtist => "track_artist",
            Self::TrackIndex => "track_index",
            Self::RecordingId => "recording_id",
        }
    }
}

impl fmt::Display for DistanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-key weights used when aggregating penalties.
///
/// Every weight defaults to 1.0, giving a plain mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceWeights {
    pub artist: f64,
    pub album: f64,
    pub mediums: f64,
    pub year: f64,
    pub country: f64,
    pub label: f64,
    pub albumdisambig: f64,
    pub album_id: f64,
    pub tracks: f64,
    pub missing_tracks: f64,
    pub unmatched_tracks: f64,
    pub track_length: f64,
    pub track_title: f64,
    pub track_artist: f64,
    pub track_index: f64,
    pub recording_id: f64,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self {
            artist: 1.0,
            album: 1.0,
            mediums: 1.0,
            year: 1.0,
            country: 1.0,
            label: 1.0,
            albumdisambig: 1.0,
            album_id: 1.0,
            tracks: 1.0,
            missing_tracks: 1.0,
            unmatched_tracks: 1.0,
            track_length: 1.0,
            track_title: 1.0,
            track_artist: 1.0,
            track_index: 1.0,
            recording_id: 1.0,
        }
    }
}

impl DistanceWeights {
    pub fn weight(&self, key: DistanceKey) -> f64 {
        match key {
            DistanceKey::Artist => self.artist,
            DistanceKey::Album => self.album,
            DistanceKey::Mediums => self.mediums,
            DistanceKey::Year => self.year,
            DistanceKey::Country => self.country,
            DistanceKey::Label => self.label,
            DistanceKey::AlbumDisambig => self.albumdisambig,
            DistanceKey::AlbumId => self.album_id,
            DistanceKey::Tracks => self.tracks,
            DistanceKey::MissingTracks => self.missing_tracks,
            DistanceKey::UnmatchedTracks => self.unmatched_tracks,
            DistanceKey::TrackLength => self.track_length,
            DistanceKey::TrackTitle => self.track_title,
            DistanceKey::TrackArtist => self.track_artist,
            DistanceKey::TrackIndex => self.track_index,
            DistanceKey::RecordingId => self.recording_id,
        }
    }
}

/// Accumulator of named penalties.
#[derive(Debug, Clone, Default)]
pub struct Distance {
    penalties: BTreeMap<DistanceKey, Vec<f64>>,
    weights: DistanceWeights,
}

impl Distance {
    /// Empty distance with unit weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty distance using the given weights.
    pub fn with_weights(weights: DistanceWeights) -> Self {
        Self {
            penalties: BTreeMap::new(),
            weights,
        }
    }

    /// Record a raw penalty, clamped to `[0, 1]`. NaN counts as a full penalty.
    pub fn add(&mut self, key: DistanceKey, value: f64) {
        let value = if value.is_nan() {
            1.0
        } else {
            value.clamp(0.0, 1.0)
        };
        self.penalties.entry(key).or_default().push(value);
    }

    /// 0 if `value` equals any option (case-insensitive), else 1.
    pub fn add_equality<S: AsRef<str>>(&mut self, key: DistanceKey, value: &str, options: &[S]) {
        let found = options
            .iter()
            .any(|o| o.as_ref().to_lowercase() == value.to_lowercase());
        self.add_bool(key, !found);
    }

    /// Normalized edit distance between two strings.
    pub fn add_string(&mut self, key: DistanceKey, value: &str, target: &str) {
        self.add(key, string_distance(value, target));
    }

    /// `value / max`, clamped to `[0, 1]`; no penalty when `max` is not positive.
    pub fn add_ratio(&mut self, key: DistanceKey, value: f64, max: f64) {
        let dist = if max > 0.0 {
            value.clamp(0.0, max) / max
        } else {
            0.0
        };
        self.add(key, dist);
    }

    /// One full penalty per unit of difference, or a single 0 when equal.
    pub fn add_number(&mut self, key: DistanceKey, value: i64, target: i64) {
        let diff = value.abs_diff(target);
        if diff == 0 {
            self.add(key, 0.0);
        } else {
            for _ in 0..diff {
                self.add(key, 1.0);
            }
        }
    }

    /// Full penalty when `condition` holds.
    pub fn add_bool(&mut self, key: DistanceKey, condition: bool) {
        self.add(key, if condition { 1.0 } else { 0.0 });
    }

    /// Penalty by rank of the best of `values` in the preference list `options`.
    ///
    /// The first option scores 0, each later option `1 / options.len()` more,
    /// and no match at all scores 1.
    pub fn add_priority<S: AsRef<str>, T: AsRef<str>>(
        &mut self,
        key: DistanceKey,
        values: &[S],
        options: &[T],
    ) {
        let unit = 1.0 / options.len().max(1) as f64;
        let best = values
            .iter()
            .filter_map(|v| {
                options
                    .iter()
                    .position(|o| o.as_ref().eq_ignore_ascii_case(v.as_ref()))
            })
            .min();
        match best {
            Some(index) => self.add(key, index as f64 * unit),
            None => self.add(key, 1.0),
        }
    }

    /// Penalties recorded under `key`.
    pub fn penalties(&self, key: DistanceKey) -> &[f64] {
        self.penalties.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.penalties.is_empty()
    }

    /// Weighted sum of all penalties.
    pub fn raw(&self) -> f64 {
        self.penalties
            .iter()
            .map(|(key, values)| self.weights.weight(*key) * values.iter().sum::<f64>())
            .sum()
    }

    /// Weighted sum of the maximum possible penalties.
    pub fn max(&self) -> f64 {
        self.penalties
            .iter()
            .map(|(key, values)| self.weights.weight(*key) * values.len() as f64)
            .sum()
    }

    /// Weighted mean of all penalties, in `[0, 1]`.
    pub fn normalized(&self) -> f64 {
        let max = self.max();
        if max > 0.0 { self.raw() / max } else { 0.0 }
    }

    /// Mean penalty per key, in key order.
    pub fn breakdown(&self) -> Vec<(DistanceKey, f64)> {
        self.penalties
            .iter()
            .map(|(key, values)| {
                let mean = values.iter().sum::<f64>() / values.len().max(1) as f64;
                (*key, mean)
            })
            .collect()
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .breakdown()
            .into_iter()
            .map(|(key, value)| format!("{}:{:.2}", key, value))
            .collect();
        write!(f, "{:.4} [{}]", self.normalized(), parts.join(", "))
    }
}

/// Articles that tagging conventions move to the end ("Beatles, The").
const END_WORDS: &[&str] = &["the", "a", "an"];

/// Dissimilarity of two strings in `[0, 1]`.
///
/// Equal strings score 0, a blank against a non-blank scores 1. Otherwise both
/// are normalized (case, trailing articles, `&`, punctuation) and compared by
/// Levenshtein distance relative to the longer string.
pub fn string_distance(a: &str, b: &str) -> f64 {
    if a == b {
        return 0.0;
    }
    if a.trim().is_empty() || b.trim().is_empty() {
        return 1.0;
    }

    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return 0.0;
    }
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }

    1.0 - strsim::normalized_levenshtein(&a, &b)
}

fn normalize(s: &str) -> String {
    let mut s = s.trim().to_lowercase();

    for word in END_WORDS {
        let suffix = format!(", {}", word);
        if s.ends_with(&suffix) {
            s = format!("{} {}", word, &s[..s.len() - suffix.len()]);
            break;
        }
    }

    s.replace('&', " and ")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}
