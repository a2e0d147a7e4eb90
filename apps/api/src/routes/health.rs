use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status and the artifact version being served, if any.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let artifact_version = state
        .snapshot
        .get()
        .await
        .map(|index| index.manifest().version);

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "skillmatch",
        "artifact_version": artifact_version
    }))
}
