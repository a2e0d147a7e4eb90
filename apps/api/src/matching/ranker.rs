//! Similarity Ranker: scores every corpus vector against a query vector,
//! applies the conjunctive filters and returns the top results.
//!
//! Pure over its inputs: scores live in a per-call scratch column, postings
//! are only borrowed.

use serde::{Deserialize, Serialize};

use crate::matching::sparse::{cosine_similarity, SparseVector};
use crate::models::posting::Posting;

/// Selection value meaning "no constraint".
pub const ALL_SELECTION: &str = "All";

/// Exact-match constraints; `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFilters {
    pub location: Option<String>,
    pub company: Option<String>,
    pub cluster_id: Option<usize>,
}

impl MatchFilters {
    pub fn matches(&self, posting: &Posting) -> bool {
        let location_ok = self
            .location
            .as_deref()
            .map_or(true, |want| posting.location.as_deref() == Some(want));
        let company_ok = self
            .company
            .as_deref()
            .map_or(true, |want| posting.company.as_deref() == Some(want));
        let cluster_ok = self.cluster_id.map_or(true, |want| posting.cluster_id == want);
        location_ok && company_ok && cluster_ok
    }
}

/// Maps a UI selection to a constraint: absent, blank and `"All"` mean none.
pub fn selection(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL_SELECTION)
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedPosting<'a> {
    /// 1-based position in the result list.
    pub rank: usize,
    pub similarity_score: f64,
    pub posting: &'a Posting,
}

/// Ranks `postings` (with their precomputed `vectors`) against `query`.
///
/// Descending by score; equal scores keep corpus order. Returns at most
/// `top_k` results and an empty list when nothing passes the filters.
pub fn rank_postings<'a>(
    query: &SparseVector,
    postings: &'a [Posting],
    vectors: &[SparseVector],
    filters: &MatchFilters,
    top_k: usize,
) -> Vec<RankedPosting<'a>> {
    debug_assert_eq!(postings.len(), vectors.len());

    let mut scored: Vec<(usize, f64)> = postings
        .iter()
        .zip(vectors)
        .enumerate()
        .filter(|(_, (posting, _))| filters.matches(posting))
        .map(|(i, (_, vector))| (i, cosine_similarity(query, vector)))
        .collect();

    // Stable: ties stay in corpus order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (i, score))| RankedPosting {
            rank: position + 1,
            similarity_score: score,
            posting: &postings[i],
        })
        .collect()
}
