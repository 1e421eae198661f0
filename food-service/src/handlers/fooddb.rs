use crate::dtos::FoodDbParams;
use crate::middleware::AuthUser;
use crate::startup::AppState;
use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::utils::Query;

pub async fn search_food_db(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<FoodDbParams>,
) -> Result<impl IntoResponse, AppError> {
    let search = params.search.trim();
    if search.is_empty() {
        return Err(AppError::bad_request("Search term is required"));
    }

    let items = state
        .fooddb
        .search(search, params.category.as_deref())
        .await?;
    Ok(Json(items))
}
