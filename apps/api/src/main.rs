mod config;
mod corpus;
mod errors;
mod matching;
mod models;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::corpus::versioning::{commit_rebuild, ArtifactStore, FsArtifactStore};
use crate::matching::{MatchIndex, SnapshotHandle};
use crate::models::posting::RawPosting;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting skillmatch v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.artifact_dir));
    info!("Artifact store at {}", config.artifact_dir.display());

    let initial = load_initial_index(store.as_ref(), &config).await?;
    let snapshot = SnapshotHandle::new(initial);

    let state = AppState {
        config: config.clone(),
        store,
        snapshot,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads the committed artifact set, or builds one from the seed corpus when
/// nothing has been committed yet.
async fn load_initial_index(
    store: &dyn ArtifactStore,
    config: &Config,
) -> Result<Option<Arc<MatchIndex>>> {
    if let Some(set) = store.load_current().await? {
        let version = set.manifest.version;
        let index = MatchIndex::from_artifacts(set)
            .with_context(|| format!("Committed artifact set v{version} is inconsistent"))?;
        info!(
            "Loaded artifact set v{version} ({} postings)",
            index.postings().len()
        );
        return Ok(Some(Arc::new(index)));
    }

    let Some(path) = &config.seed_corpus_path else {
        warn!("No artifact set committed and SEED_CORPUS_PATH unset; waiting for a rebuild");
        return Ok(None);
    };

    info!("Building initial corpus from {}", path.display());
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read seed corpus {}", path.display()))?;
    let raw: Vec<RawPosting> = serde_json::from_slice(&bytes)
        .with_context(|| format!("Seed corpus {} is not a JSON array of postings", path.display()))?;

    let index = commit_rebuild(store, raw, config.build_options(None))
        .await
        .map_err(|e| anyhow::anyhow!("Initial build failed: {e}"))?;
    Ok(Some(index))
}
