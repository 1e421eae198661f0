use crate::services::metrics::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "food-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// 200 only when every configured backend answers.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.catalog.health_check().await;
    let nutrition = state.nutrition.health_check().await;

    match (catalog, nutrition) {
        (Ok(()), Ok(())) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        (catalog, nutrition) => {
            let errors: Vec<String> = [("catalog", catalog), ("nutrition", nutrition)]
                .into_iter()
                .filter_map(|(name, result)| result.err().map(|e| format!("{}: {}", name, e)))
                .collect();
            tracing::warn!(errors = ?errors, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "errors": errors })),
            )
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
