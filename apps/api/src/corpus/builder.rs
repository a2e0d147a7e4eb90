//! Corpus Builder: turns a raw posting feed into one matched artifact set.
//!
//! Pipeline:
//! 1. Drop records with a missing or blank title or skills
//! 2. Normalize skills text
//! 3. Fit the feature model on every surviving record
//! 4. Vectorize the corpus with that model
//! 5. Fit the cluster model on those vectors
//! 6. Label each posting with its predicted cluster
//!
//! Both models are fitted from the same surviving records in one call, so
//! they always share a provenance fingerprint.

use chrono::Utc;
use tracing::{info, warn};

use crate::corpus::normalize::{non_blank, normalize_skills};
use crate::corpus::versioning::{ArtifactManifest, ArtifactSet};
use crate::errors::MatchError;
use crate::matching::cluster_model::{ClusterModel, ClusterParams};
use crate::matching::feature_model::FeatureModel;
use crate::models::posting::{Posting, RawPosting};

pub const DEFAULT_CLUSTERS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub num_clusters: usize,
    pub cluster: ClusterParams,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            num_clusters: DEFAULT_CLUSTERS,
            cluster: ClusterParams::default(),
        }
    }
}

/// Validates and normalizes raw records. Cluster ids are left at zero.
pub fn prepare_postings(raw_postings: Vec<RawPosting>) -> Vec<Posting> {
    let total = raw_postings.len();
    let postings: Vec<Posting> = raw_postings
        .into_iter()
        .filter_map(|raw| {
            let title = non_blank(raw.title)?;
            let skills = non_blank(raw.skills)?;
            Some(Posting {
                normalized_skills: normalize_skills(&skills),
                title,
                company: non_blank(raw.company),
                location: non_blank(raw.location),
                experience: non_blank(raw.experience),
                summary: non_blank(raw.summary),
                skills,
                job_link: non_blank(raw.job_link),
                cluster_id: 0,
            })
        })
        .collect();

    let dropped = total - postings.len();
    if dropped > 0 {
        warn!("Dropped {dropped} of {total} postings missing a title or skills");
    }
    postings
}

/// Runs the full build and returns the artifact set stamped with `version`.
pub fn build_artifacts(
    raw_postings: Vec<RawPosting>,
    options: &BuildOptions,
    version: u32,
) -> Result<ArtifactSet, MatchError> {
    if options.num_clusters == 0 {
        return Err(MatchError::InvalidClusterCount);
    }

    let mut corpus = prepare_postings(raw_postings);
    if corpus.is_empty() {
        return Err(MatchError::EmptyCorpus);
    }

    let texts: Vec<&str> = corpus.iter().map(|p| p.normalized_skills.as_str()).collect();
    let feature_model = FeatureModel::fit(&texts)?;
    let matrix = feature_model.transform_all(&texts);
    info!(
        "Fitted feature model: {} postings, vocabulary of {} terms",
        matrix.len(),
        feature_model.dimension()
    );

    let cluster_model = ClusterModel::fit(&matrix, options.num_clusters, &options.cluster)?;
    for (posting, vector) in corpus.iter_mut().zip(matrix.rows()) {
        posting.cluster_id = cluster_model.predict(vector);
    }

    let manifest = ArtifactManifest {
        version,
        fingerprint: feature_model.fingerprint(),
        built_at: Utc::now(),
        posting_count: corpus.len(),
        cluster_count: cluster_model.k(),
        vocabulary_size: feature_model.dimension(),
        inertia: cluster_model.inertia(),
        seed: options.cluster.seed,
    };
    info!(
        "Built artifact set v{version}: {} postings in {} clusters",
        manifest.posting_count, manifest.cluster_count
    );

    Ok(ArtifactSet {
        manifest,
        corpus,
        feature_model,
        cluster_model,
    })
}
