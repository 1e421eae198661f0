use crate::dtos::FoodListParams;
use crate::middleware::AuthUser;
use crate::models::{FoodUpdate, NewFood};
use crate::startup::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::utils::{Path, Query, ValidatedJson};

fn food_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Food {} not found", id))
}

pub async fn list_foods(
    State(state): State<AppState>,
    Query(params): Query<FoodListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = params.into_filter()?;
    let foods = state.catalog.list(&filter).await?;
    Ok(Json(foods))
}

pub async fn get_food(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let food = state.catalog.get(id).await?.ok_or_else(|| food_not_found(id))?;
    Ok(Json(food))
}

pub async fn create_food(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<NewFood>,
) -> Result<impl IntoResponse, AppError> {
    let food = state.catalog.create(req).await?;
    tracing::info!(food_id = food.id, user_id = %user.user_id, "Food added to catalog");
    Ok((StatusCode::CREATED, Json(food)))
}

pub async fn update_food(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<FoodUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let food = state
        .catalog
        .update(id, req)
        .await?
        .ok_or_else(|| food_not_found(id))?;
    tracing::info!(food_id = id, user_id = %user.user_id, "Food updated");
    Ok(Json(food))
}

pub async fn delete_food(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.catalog.delete(id).await? {
        return Err(food_not_found(id));
    }
    tracing::info!(food_id = id, user_id = %user.user_id, "Food deleted");
    Ok(StatusCode::NO_CONTENT)
}
