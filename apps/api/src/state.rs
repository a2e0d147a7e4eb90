use std::sync::Arc;

use crate::config::Config;
use crate::corpus::versioning::ArtifactStore;
use crate::matching::SnapshotHandle;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable persistence for artifact sets. Default: `FsArtifactStore`.
    pub store: Arc<dyn ArtifactStore>,
    /// The artifact set currently served to queries.
    pub snapshot: SnapshotHandle,
}
