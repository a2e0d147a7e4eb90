use axum::{extract::State, Json};
use serde::Deserialize;

use crate::corpus::versioning::{commit_rebuild, ArtifactManifest};
use crate::errors::AppError;
use crate::models::posting::RawPosting;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RebuildRequest {
    pub postings: Vec<RawPosting>,
    pub num_clusters: Option<usize>,
}

/// GET /api/v1/corpus
pub async fn handle_get_corpus(
    State(state): State<AppState>,
) -> Result<Json<ArtifactManifest>, AppError> {
    let index = state.snapshot.require().await?;
    Ok(Json(index.manifest().clone()))
}

/// GET /api/v1/corpus/history
pub async fn handle_corpus_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<ArtifactManifest>>, AppError> {
    Ok(Json(state.store.history().await?))
}

/// POST /api/v1/corpus/rebuild
///
/// Builds a fresh artifact set, commits it, then swaps it in for new queries.
/// A failed build leaves the served set untouched.
pub async fn handle_rebuild(
    State(state): State<AppState>,
    Json(req): Json<RebuildRequest>,
) -> Result<Json<ArtifactManifest>, AppError> {
    if req.num_clusters == Some(0) {
        return Err(AppError::Validation(
            "num_clusters must be a positive integer".to_string(),
        ));
    }

    let _guard = state.snapshot.lock_rebuild().await;
    let options = state.config.build_options(req.num_clusters);
    let index = commit_rebuild(state.store.as_ref(), req.postings, options).await?;
    let manifest = index.manifest().clone();
    state.snapshot.replace(index).await;

    Ok(Json(manifest))
}
