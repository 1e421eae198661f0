use crate::dtos::{CreateNutritionEntryRequest, SummaryParams};
use crate::middleware::AuthUser;
use crate::models::{DateRange, NutritionEntry};
use crate::services::metrics;
use crate::startup::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::utils::{Path, Query, ValidatedJson};

pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let entries = state.nutrition.list(&user.user_id).await?;
    Ok(Json(entries))
}

pub async fn create_entry(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateNutritionEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = NutritionEntry::new(&user.user_id, req.into());
    let entry = state.nutrition.create(entry).await?;
    metrics::record_nutrition_entry();
    tracing::info!(entry_id = %entry.id, "Nutrition entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.nutrition.delete(&user.user_id, &id).await? {
        return Err(AppError::not_found("Document not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn nutrition_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SummaryParams>,
) -> Result<impl IntoResponse, AppError> {
    let range = params.date()?.map(DateRange::day);
    let summary = state.nutrition.summary(&user.user_id, range).await?;
    Ok(Json(summary))
}
