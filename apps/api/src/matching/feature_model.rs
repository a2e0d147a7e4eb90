//! Feature Model: TF-IDF weighting fitted once on a corpus's skills text.
//!
//! Vocabulary indices follow lexicographic term order, so two fits over the
//! same texts produce identical models apart from their provenance tag.
//! Weighting: `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, raw term counts,
//! L2-normalized output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::corpus::normalize::{normalize_skills, tokenize};
use crate::errors::MatchError;
use crate::matching::sparse::SparseVector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    document_count: usize,
    /// Provenance tag shared with the cluster model fitted on this model's output.
    fingerprint: Uuid,
}

/// Corpus vectors produced by one feature model, tagged with its provenance.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    rows: Vec<SparseVector>,
    dimension: usize,
    fingerprint: Uuid,
}

impl FeatureMatrix {
    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn fingerprint(&self) -> Uuid {
        self.fingerprint
    }

    pub fn into_rows(self) -> Vec<SparseVector> {
        self.rows
    }
}

impl FeatureModel {
    /// Fits vocabulary and IDF weights over `texts`.
    ///
    /// Every text counts as a document, including ones that normalize to
    /// nothing. Fails with `EmptyCorpus` when there are no texts or no tokens.
    pub fn fit<S: AsRef<str>>(texts: &[S]) -> Result<Self, MatchError> {
        if texts.is_empty() {
            return Err(MatchError::EmptyCorpus);
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for text in texts {
            let normalized = normalize_skills(text.as_ref());
            let mut seen: Vec<&str> = tokenize(&normalized).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term.to_string()).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(MatchError::EmptyCorpus);
        }

        let n = texts.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self {
            vocabulary,
            idf,
            document_count: texts.len(),
            fingerprint: Uuid::new_v4(),
        })
    }

    /// Maps free text to an L2-normalized TF-IDF vector.
    ///
    /// Terms outside the vocabulary are ignored; input with no known terms
    /// yields the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let normalized = normalize_skills(text);
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in tokenize(&normalized) {
            if let Some(&index) = self.vocabulary.get(term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        SparseVector::from_sorted_pairs(
            counts
                .into_iter()
                .map(|(index, tf)| (index, tf * self.idf[index])),
        )
        .l2_normalized()
    }

    pub fn transform_all<S: AsRef<str>>(&self, texts: &[S]) -> FeatureMatrix {
        FeatureMatrix {
            rows: texts.iter().map(|t| self.transform(t.as_ref())).collect(),
            dimension: self.dimension(),
            fingerprint: self.fingerprint,
        }
    }

    /// Vocabulary size V.
    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn fingerprint(&self) -> Uuid {
        self.fingerprint
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&index| self.idf[index])
    }

    /// Checks that a deserialized model is internally consistent.
    pub(crate) fn check_consistency(&self) -> Result<(), MatchError> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(MatchError::VocabularyMismatch(format!(
                "feature model has {} terms but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if self.vocabulary.values().any(|&index| index >= self.idf.len()) {
            return Err(MatchError::VocabularyMismatch(
                "feature model vocabulary index out of range".to_string(),
            ));
        }
        Ok(())
    }
}
