//! Release Matcher - identifies which catalog release a set of local audio
//! files belongs to.
//!
//! Tracks are grouped into clusters that look like single releases, each
//! cluster is scored against candidate releases from a catalog, and the
//! closest release is copied onto its tracks.

pub mod assignment;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod distance;
pub mod error;
pub mod grouping;
pub mod identification;
pub mod model;
#[cfg(test)]
pub mod test_utils;
