//! Release identification - matches clusters of local tracks to catalog releases.
//!
//! # Architecture
//!
//! - **Domain types** (`domain.rs`) - hints, per-cluster outcomes and errors
//! - **Traits** (`traits.rs`) - catalog and fingerprint collaborators
//! - **Candidates** (`candidates.rs`) - narrow-to-broad candidate search
//! - **Matcher** (`matcher.rs`) - track/release distances, track mapping and
//!   the best-of-candidates loop with its fingerprint retry
//! - **Service** (`service.rs`) - grouping plus per-cluster matching
//!
//! # Usage
//!
//! ```ignore
//! use release_matcher::identification::{IdentificationService, MatchingConfig};
//!
//! let service = IdentificationService::new(catalog, fingerprinter, MatchingConfig::default());
//! for outcome in service.identify(tracks, &Default::default()) {
//!     println!("{:?}", outcome.release.release());
//! }
//! ```

pub mod candidates;
pub mod domain;
pub mod matcher;
pub mod service;
pub mod traits;

pub use candidates::CandidateGenerator;
pub use domain::{
    CatalogError, ClusterOutcome, FingerprintError, IdentificationError, IdentificationHints,
    OutcomeSummary,
};
pub use matcher::{ReleaseMatcher, ReleaseScorer};
pub use service::{IdentificationService, MatchingConfig};
pub use traits::{CatalogService, FingerprintService};
