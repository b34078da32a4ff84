//! Partition local tracks into clusters that each look like one release.
//!
//! Three passes, each only seeing what the previous pass rejected:
//!
//! 1. **Directory**: one candidate cluster per parent folder, with adjacent
//!    multi-disc folders (`Album CD1`, `Album CD2`, `.../Disc 1`) merged.
//! 2. **Album tag**: remaining tracks grouped by album tag.
//! 3. **Artist + album tag**: everything left, accepted unconditionally.
//!
//! Passes 1 and 2 only accept a cluster when [`TrackGrouper::looks_like_single_release`]
//! holds for it.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::model::{LocalReleaseCluster, LocalTrackItem};

/// Folder markers introducing a disc number, tried in order.
static MULTI_DISC_MARKERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [("disc", r"dis[ck]"), ("cd", r"cd")]
        .into_iter()
        .map(|(name, marker)| {
            let pattern = format!(r"(?i)^(?P<root>.*{}[\W_]*)\d", marker);
            let regex = Regex::new(&pattern).expect("multi-disc marker pattern is valid");
            (name, regex)
        })
        .collect()
});

/// Thresholds for deciding whether a set of tracks is a single release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Max ratio of distinct album tags to tracks; the most common tag must
    /// cover at least `1 - album_tag_threshold` of the tracks
    pub album_tag_threshold: f64,
    /// Same rule applied to artist tags
    pub artist_tag_threshold: f64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            album_tag_threshold: 0.25,
            artist_tag_threshold: 0.25,
        }
    }
}

/// Splits an unordered set of tracks into release clusters.
#[derive(Debug, Clone, Default)]
pub struct TrackGrouper {
    config: GroupingConfig,
}

impl TrackGrouper {
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    /// Group tracks into clusters. Every input track lands in exactly one cluster.
    pub fn group(&self, tracks: Vec<LocalTrackItem>) -> Vec<LocalReleaseCluster> {
        let mut releases = Vec::new();

        let mut unprocessed = Vec::new();
        for group in group_by_directory(tracks) {
            if self.looks_like_single_release(&group) {
                releases.push(LocalReleaseCluster::new(group));
            } else {
                unprocessed.extend(group);
            }
        }

        // Tracks spread over folders (or mixed folders) may still share an album tag
        let mut unprocessed2 = Vec::new();
        for group in group_by_key(unprocessed, |t| t.file_info.album_title.clone()) {
            debug!(tracks = group.len(), "Falling back to grouping by album tag");
            if self.looks_like_single_release(&group) {
                releases.push(LocalReleaseCluster::new(group));
            } else {
                unprocessed2.extend(group);
            }
        }

        for group in group_by_key(unprocessed2, |t| {
            (
                t.file_info.artist_title.clone(),
                t.file_info.album_title.clone(),
            )
        }) {
            debug!(tracks = group.len(), "Falling back to grouping by album+artist tag");
            releases.push(LocalReleaseCluster::new(group));
        }

        releases
    }

    /// True if the tracks plausibly belong to a single release.
    ///
    /// Rejects sets with conflicting album or release catalog IDs, and sets
    /// where album tags (or, unless various artists, artist tags) are too
    /// scattered.
    pub fn looks_like_single_release(&self, tracks: &[LocalTrackItem]) -> bool {
        if tracks.is_empty() {
            return false;
        }

        let album_ids = distinct_non_blank(tracks.iter().map(|t| &t.file_info.album_catalog_id));
        let release_ids =
            distinct_non_blank(tracks.iter().map(|t| &t.file_info.release_catalog_id));
        if album_ids > 1 || release_ids > 1 {
            return false;
        }

        let albums = tracks.iter().map(|t| t.file_info.album_title.as_deref());
        if !has_tag_consensus(albums, tracks.len(), self.config.album_tag_threshold) {
            return false;
        }

        if !is_various_artists(tracks) {
            let artists = tracks.iter().map(|t| t.file_info.artist_title.as_deref());
            if !has_tag_consensus(artists, tracks.len(), self.config.artist_tag_threshold) {
                return false;
            }
        }

        true
    }
}

/// Whether the tracks form a various-artists compilation.
///
/// Detection is not implemented: always false, so the compilation candidate
/// path is never taken.
pub fn is_various_artists(_tracks: &[LocalTrackItem]) -> bool {
    false
}

fn distinct_non_blank<'a>(values: impl Iterator<Item = &'a Option<String>>) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for value in values.flatten() {
        if !value.trim().is_empty() && !seen.contains(&value.as_str()) {
            seen.push(value.as_str());
        }
    }
    seen.len()
}

/// Few distinct tags, and one dominant tag. Missing tags count as a value.
fn has_tag_consensus<'a>(
    tags: impl Iterator<Item = Option<&'a str>>,
    total: usize,
    threshold: f64,
) -> bool {
    let mut counts: HashMap<Option<&str>, usize> = HashMap::new();
    for tag in tags {
        *counts.entry(tag).or_default() += 1;
    }

    let total = total as f64;
    let distinct = counts.len() as f64;
    let top = counts.values().copied().max().unwrap_or(0) as f64;

    distinct / total <= threshold && top / total >= 1.0 - threshold
}

/// Group by key, keeping groups in first-seen order.
fn group_by_key<K, F>(items: Vec<LocalTrackItem>, key: F) -> Vec<Vec<LocalTrackItem>>
where
    K: Eq + Hash,
    F: Fn(&LocalTrackItem) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<LocalTrackItem>> = Vec::new();
    for item in items {
        let slot = *index.entry(key(&item)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(item);
    }
    groups
}

/// Group by parent folder, merging runs of multi-disc folders.
///
/// Handles layouts such as:
///
/// ```text
/// xx/CD1/1.mp3        yy Disc 1/1.mp3
/// xx/CD2/1.mp3        yy Disc 2/1.mp3
/// ```
///
/// Only the immediate parent folder is considered.
fn group_by_directory(tracks: Vec<LocalTrackItem>) -> Vec<Vec<LocalTrackItem>> {
    let mut by_folder: BTreeMap<String, Vec<LocalTrackItem>> = BTreeMap::new();
    for track in tracks {
        let folder = track.parent_dir().to_string_lossy().into_owned();
        by_folder.entry(folder).or_default().push(track);
    }

    trace!(folders = ?by_folder.keys().collect::<Vec<_>>(), "Grouping by folder");

    let mut groups = Vec::new();
    let mut output: Vec<LocalTrackItem> = Vec::new();
    let mut continuation: Option<Regex> = None;

    for (folder, items) in by_folder {
        if continuation.as_ref().is_some_and(|subdir| subdir.is_match(&folder)) {
            // Folder continues the current multi-disc run
            output.extend(items);
            continue;
        }

        if !output.is_empty() {
            groups.push(std::mem::take(&mut output));
        }

        output.extend(items);
        continuation = multi_disc_continuation(&folder);

        if continuation.is_none() {
            groups.push(std::mem::take(&mut output));
        }
    }

    if !output.is_empty() {
        groups.push(output);
    }

    groups
}

/// If `folder` starts a multi-disc run, a pattern matching its sibling folders.
fn multi_disc_continuation(folder: &str) -> Option<Regex> {
    MULTI_DISC_MARKERS.iter().find_map(|(name, start)| {
        let root = start.captures(folder)?.name("root")?.as_str();
        trace!(marker = name, folder, "Folder starts a multi-disc run");
        Regex::new(&format!(r"(?i)^{}\d+$", regex::escape(root))).ok()
    })
}
