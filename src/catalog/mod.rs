//! Offline catalog snapshot.
//!
//! A session file bundles parsed tracks with the slice of the catalog that is
//! relevant to them, so identification can run without a database or
//! network.
//!
//! # Architecture
//!
//! - **DTOs** (`dto.rs`) - exact JSON shape of a session file
//! - **Adapter** (`adapter.rs`) - converts DTOs to domain types
//! - **Memory** (`memory.rs`) - [`CatalogService`] and [`FingerprintService`]
//!   implementations over the converted snapshot
//!
//! [`CatalogService`]: crate::identification::CatalogService
//! [`FingerprintService`]: crate::identification::FingerprintService

mod adapter;
pub mod dto;
mod memory;

use std::path::Path;

pub use memory::{InMemoryCatalog, SnapshotFingerprinter};

use crate::error::{Error, Result, ResultExt};
use crate::model::LocalTrackItem;

/// A loaded session: tracks to identify and the collaborators to use.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub tracks: Vec<LocalTrackItem>,
    pub catalog: InMemoryCatalog,
    pub fingerprinter: SnapshotFingerprinter,
}

impl Session {
    /// Build a session from its parsed document.
    pub fn from_dto(dto: dto::SessionDto) -> Result<Self> {
        Ok(Self {
            tracks: dto.tracks,
            catalog: adapter::to_catalog(dto.catalog)?,
            fingerprinter: adapter::to_fingerprinter(dto.fingerprints),
        })
    }
}

/// Load a session file.
pub fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(Error::not_found(path));
    }

    let contents = std::fs::read_to_string(path).with_context(format!("reading {}", path.display()))?;
    let dto: dto::SessionDto =
        serde_json::from_str(&contents).with_context(format!("parsing {}", path.display()))?;
    let session = Session::from_dto(dto).with_context(format!("loading {}", path.display()))?;

    tracing::info!(
        "Loaded session {:?}: {} track(s), {} release(s)",
        path,
        session.tracks.len(),
        session.catalog.release_count()
    );
    Ok(session)
}
