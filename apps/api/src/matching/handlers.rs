//! Axum route handlers for the Matching API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::config::MAX_TOP_K;
use crate::errors::AppError;
use crate::matching::digest::{compose_digest, Digest, Subscriber, DEFAULT_DIGEST_SIZE};
use crate::matching::index::FilterOptions;
use crate::matching::ranker::{selection, MatchFilters};
use crate::models::posting::Posting;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub skills: String,
    pub location: Option<String>,
    pub company: Option<String>,
    /// Cluster id as text, or "All".
    pub cluster: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MatchResult {
    pub rank: usize,
    pub similarity_score: f64,
    pub has_direct_link: bool,
    pub posting: Posting,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub query: String,
    pub query_cluster_id: usize,
    pub artifact_version: u32,
    pub total_candidates: usize,
    pub results: Vec<MatchResult>,
}

#[derive(Debug, Deserialize)]
pub struct DigestRequest {
    pub subscribers: Vec<Subscriber>,
    pub top_n: Option<usize>,
}

impl MatchRequest {
    fn filters(&self) -> Result<MatchFilters, AppError> {
        let cluster_id = selection(self.cluster.as_deref())
            .map(|raw| {
                raw.parse::<usize>().map_err(|_| {
                    AppError::Validation(format!("cluster must be a cluster id or \"All\", got '{raw}'"))
                })
            })
            .transpose()?;

        Ok(MatchFilters {
            location: selection(self.location.as_deref()),
            company: selection(self.company.as_deref()),
            cluster_id,
        })
    }
}

fn validate_count(name: &str, value: usize) -> Result<usize, AppError> {
    if (1..=MAX_TOP_K).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::Validation(format!(
            "{name} must be between 1 and {MAX_TOP_K}, got {value}"
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/matches
///
/// Ranks the loaded corpus against the caller's skills.
/// An empty result list means nothing matched the filters, not a failure.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    if request.skills.trim().is_empty() {
        return Err(AppError::Validation("skills cannot be empty".to_string()));
    }
    let top_k = validate_count("top_k", request.top_k.unwrap_or(state.config.default_top_k))?;
    let filters = request.filters()?;

    let index = state.snapshot.require().await?;
    let results = index
        .rank(&request.skills, &filters, top_k)
        .into_iter()
        .map(|r| MatchResult {
            rank: r.rank,
            similarity_score: r.similarity_score,
            has_direct_link: r.posting.has_direct_link(),
            posting: r.posting.clone(),
        })
        .collect();

    Ok(Json(MatchResponse {
        query_cluster_id: index.predict_cluster(&request.skills),
        artifact_version: index.manifest().version,
        total_candidates: index.candidate_count(&filters),
        query: request.skills,
        results,
    }))
}

/// GET /api/v1/matches/filters
///
/// Distinct locations, companies and cluster ids of the loaded corpus.
pub async fn handle_filter_options(
    State(state): State<AppState>,
) -> Result<Json<FilterOptions>, AppError> {
    let index = state.snapshot.require().await?;
    Ok(Json(index.filter_options()))
}

/// POST /api/v1/digests
///
/// Composes one plain-text digest per subscriber. Sending them is the caller's job.
pub async fn handle_digests(
    State(state): State<AppState>,
    Json(request): Json<DigestRequest>,
) -> Result<Json<Vec<Digest>>, AppError> {
    let top_n = validate_count("top_n", request.top_n.unwrap_or(DEFAULT_DIGEST_SIZE))?;
    let index = state.snapshot.require().await?;

    let digests = request
        .subscribers
        .iter()
        .filter(|s| !s.skills.trim().is_empty())
        .map(|s| compose_digest(&index, s, top_n))
        .collect();

    Ok(Json(digests))
}
