//! A loaded, immutable artifact set ready for queries.
//!
//! Construction validates that the corpus, feature model and cluster model
//! come from the same build and caches the corpus feature matrix once.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::corpus::versioning::{ArtifactManifest, ArtifactSet};
use crate::errors::MatchError;
use crate::matching::cluster_model::ClusterModel;
use crate::matching::feature_model::FeatureModel;
use crate::matching::ranker::{rank_postings, MatchFilters, RankedPosting};
use crate::matching::sparse::SparseVector;
use crate::models::posting::Posting;

#[derive(Debug)]
pub struct MatchIndex {
    manifest: ArtifactManifest,
    postings: Vec<Posting>,
    vectors: Vec<SparseVector>,
    feature_model: FeatureModel,
    cluster_model: ClusterModel,
}

/// Distinct values a caller can filter on, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub companies: Vec<String>,
    pub cluster_ids: Vec<usize>,
}

impl MatchIndex {
    pub fn from_artifacts(set: ArtifactSet) -> Result<Self, MatchError> {
        let ArtifactSet {
            manifest,
            corpus,
            feature_model,
            cluster_model,
        } = set;

        feature_model.check_consistency()?;
        cluster_model.check_consistency()?;

        if feature_model.fingerprint() != cluster_model.fingerprint() {
            return Err(MatchError::VocabularyMismatch(format!(
                "feature model {} and cluster model {} were fitted from different corpora",
                feature_model.fingerprint(),
                cluster_model.fingerprint()
            )));
        }
        if manifest.fingerprint != feature_model.fingerprint() {
            return Err(MatchError::VocabularyMismatch(format!(
                "corpus v{} ({}) does not belong to feature model {}",
                manifest.version,
                manifest.fingerprint,
                feature_model.fingerprint()
            )));
        }
        if cluster_model.dimension() != feature_model.dimension() {
            return Err(MatchError::VocabularyMismatch(format!(
                "cluster model dimension {} != vocabulary size {}",
                cluster_model.dimension(),
                feature_model.dimension()
            )));
        }
        if let Some(bad) = corpus.iter().find(|p| p.cluster_id >= cluster_model.k()) {
            return Err(MatchError::VocabularyMismatch(format!(
                "posting '{}' has cluster {} but the model has {} clusters",
                bad.title,
                bad.cluster_id,
                cluster_model.k()
            )));
        }

        let vectors = corpus
            .iter()
            .map(|p| feature_model.transform(&p.normalized_skills))
            .collect();

        Ok(Self {
            manifest,
            postings: corpus,
            vectors,
            feature_model,
            cluster_model,
        })
    }

    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn feature_model(&self) -> &FeatureModel {
        &self.feature_model
    }

    /// Ranks the corpus against free-text skills.
    pub fn rank(
        &self,
        query_text: &str,
        filters: &MatchFilters,
        top_k: usize,
    ) -> Vec<RankedPosting<'_>> {
        let query = self.feature_model.transform(query_text);
        rank_postings(&query, &self.postings, &self.vectors, filters, top_k)
    }

    /// Cluster the query text falls into.
    pub fn predict_cluster(&self, query_text: &str) -> usize {
        self.cluster_model
            .predict(&self.feature_model.transform(query_text))
    }

    /// Number of postings passing `filters`, before truncation.
    pub fn candidate_count(&self, filters: &MatchFilters) -> usize {
        self.postings.iter().filter(|p| filters.matches(p)).count()
    }

    pub fn filter_options(&self) -> FilterOptions {
        let locations: BTreeSet<&str> = self
            .postings
            .iter()
            .filter_map(|p| p.location.as_deref())
            .collect();
        let companies: BTreeSet<&str> = self
            .postings
            .iter()
            .filter_map(|p| p.company.as_deref())
            .collect();
        let cluster_ids: BTreeSet<usize> = self.postings.iter().map(|p| p.cluster_id).collect();

        FilterOptions {
            locations: locations.into_iter().map(str::to_string).collect(),
            companies: companies.into_iter().map(str::to_string).collect(),
            cluster_ids: cluster_ids.into_iter().collect(),
        }
    }
}
