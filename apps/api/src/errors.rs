use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the matching engine while fitting or loading models.
///
/// Every variant is fatal for the operation that raised it. Unknown query
/// terms and empty filter results are not errors and never produce one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("No usable postings: the corpus is empty after dropping rows without title or skills")]
    EmptyCorpus,

    #[error("Cannot form {clusters} clusters from {rows} postings")]
    InsufficientData { rows: usize, clusters: usize },

    #[error("Cluster count must be a positive integer")]
    InvalidClusterCount,

    #[error("Vocabulary mismatch: {0}")]
    VocabularyMismatch(String),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No corpus is loaded")]
    CorpusUnavailable,

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::CorpusUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CORPUS_UNAVAILABLE",
                "No corpus has been built yet. Trigger a rebuild first.".to_string(),
            ),
            AppError::Match(MatchError::VocabularyMismatch(msg)) => {
                tracing::error!("Artifact provenance check failed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "VOCABULARY_MISMATCH",
                    "Loaded models were not fitted from the same corpus".to_string(),
                )
            }
            AppError::Match(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                match e {
                    MatchError::EmptyCorpus => "EMPTY_CORPUS",
                    MatchError::InsufficientData { .. } => "INSUFFICIENT_DATA",
                    _ => "INVALID_CLUSTER_COUNT",
                },
                e.to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_maps_to_unprocessable() {
        let response = AppError::from(MatchError::InsufficientData {
            rows: 2,
            clusters: 5,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_vocabulary_mismatch_is_server_error() {
        let response =
            AppError::from(MatchError::VocabularyMismatch("fingerprints differ".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_corpus_unavailable_is_503() {
        let response = AppError::CorpusUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_insufficient_data_message_names_counts() {
        let msg = MatchError::InsufficientData {
            rows: 3,
            clusters: 4,
        }
        .to_string();
        assert!(msg.contains('3') && msg.contains('4'), "{msg}");
    }
}
