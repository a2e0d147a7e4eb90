pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::corpus::handlers as corpus;
use crate::matching::handlers as matching;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/matches", post(matching::handle_match))
        .route(
            "/api/v1/matches/filters",
            get(matching::handle_filter_options),
        )
        .route("/api/v1/digests", post(matching::handle_digests))
        // Corpus API
        .route("/api/v1/corpus", get(corpus::handle_get_corpus))
        .route("/api/v1/corpus/history", get(corpus::handle_corpus_history))
        .route("/api/v1/corpus/rebuild", post(corpus::handle_rebuild))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::corpus::versioning::MemoryArtifactStore;
    use crate::matching::SnapshotHandle;

    fn test_state() -> AppState {
        AppState {
            config: Config {
                artifact_dir: PathBuf::from("unused"),
                seed_corpus_path: None,
                num_clusters: 2,
                cluster_seed: 42,
                cluster_restarts: 10,
                cluster_max_iterations: 300,
                cluster_tolerance: 1e-4,
                default_top_k: 5,
                port: 0,
                rust_log: "info".to_string(),
            },
            store: Arc::new(MemoryArtifactStore::default()),
            snapshot: SnapshotHandle::default(),
        }
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(b) => Body::from(b.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn rebuild_body() -> Value {
        json!({
            "postings": [
                {"Title": "A", "Company": "Acme", "Location": "Pune", "Skills": "python, sql"},
                {"Title": "B", "Company": "Globex", "Location": "Delhi", "Skills": "java, spring"},
                {"Title": "C", "Company": "Acme", "Location": "Delhi", "Skills": "python, pandas"},
                {"Title": "D", "Company": "Acme", "Location": "Delhi"}
            ]
        })
    }

    #[tokio::test]
    async fn test_queries_before_rebuild_are_unavailable() {
        let router = build_router(test_state());
        let (status, body) = call(&router, "POST", "/api/v1/matches", Some(json!({"skills": "python"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "CORPUS_UNAVAILABLE");

        let (status, body) = call(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["artifact_version"].is_null());
    }

    #[tokio::test]
    async fn test_rebuild_then_match() {
        let router = build_router(test_state());

        let (status, manifest) = call(&router, "POST", "/api/v1/corpus/rebuild", Some(rebuild_body())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(manifest["version"], 1);
        assert_eq!(manifest["posting_count"], 3);
        assert_eq!(manifest["cluster_count"], 2);

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/matches",
            Some(json!({"skills": "Python", "location": "All", "top_k": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_candidates"], 3);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        let titles: Vec<&str> = results
            .iter()
            .map(|r| r["posting"]["title"].as_str().unwrap())
            .collect();
        assert!(titles.contains(&"A") && titles.contains(&"C"));

        let (_, health) = call(&router, "GET", "/health", None).await;
        assert_eq!(health["artifact_version"], 1);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_serving_previous_set() {
        let router = build_router(test_state());
        call(&router, "POST", "/api/v1/corpus/rebuild", Some(rebuild_body())).await;

        let mut too_many = rebuild_body();
        too_many["num_clusters"] = json!(4);
        let (status, body) = call(&router, "POST", "/api/v1/corpus/rebuild", Some(too_many)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_DATA");

        let (status, manifest) = call(&router, "GET", "/api/v1/corpus", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(manifest["version"], 1);

        let (_, history) = call(&router, "GET", "/api/v1/corpus/history", None).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_without_usable_rows_is_rejected() {
        let router = build_router(test_state());
        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/corpus/rebuild",
            Some(json!({"postings": [{"title": "No skills"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "EMPTY_CORPUS");
    }

    #[tokio::test]
    async fn test_match_validation() {
        let router = build_router(test_state());
        call(&router, "POST", "/api/v1/corpus/rebuild", Some(rebuild_body())).await;

        let (status, _) = call(&router, "POST", "/api/v1/matches", Some(json!({"skills": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &router,
            "POST",
            "/api/v1/matches",
            Some(json!({"skills": "python", "top_k": 50})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unmatched_filter_returns_empty_results() {
        let router = build_router(test_state());
        call(&router, "POST", "/api/v1/corpus/rebuild", Some(rebuild_body())).await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/v1/matches",
            Some(json!({"skills": "python", "company": "Nowhere Inc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_candidates"], 0);
        assert!(body["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filter_options_and_digests() {
        let router = build_router(test_state());
        call(&router, "POST", "/api/v1/corpus/rebuild", Some(rebuild_body())).await;

        let (status, options) = call(&router, "GET", "/api/v1/matches/filters", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(options["locations"], json!(["Delhi", "Pune"]));
        assert_eq!(options["companies"], json!(["Acme", "Globex"]));

        let (status, digests) = call(
            &router,
            "POST",
            "/api/v1/digests",
            Some(json!({
                "subscribers": [
                    {"email": "a@example.com", "skills": "java"},
                    {"email": "b@example.com", "skills": ""}
                ],
                "top_n": 1
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let digests = digests.as_array().unwrap();
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0]["email"], "a@example.com");
        assert_eq!(digests[0]["match_count"], 1);
        assert!(digests[0]["body"].as_str().unwrap().contains("B at Globex"));
    }
}
