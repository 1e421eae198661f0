use crate::dtos::{DetectFoodRequest, DetectResponse, DetectionListParams, LegacyDetectResponse};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::utils::{Query, ValidatedJson};

const IMAGE_FIELD: &str = "image";

/// Multipart upload with an `image` field; other fields are ignored.
pub async fn detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            image = Some(field.bytes().await?);
            break;
        }
    }

    let bytes = image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::bad_request("No image provided"))?;

    let detected = state.detection.detect_and_record(bytes.to_vec()).await?;
    Ok(Json(DetectResponse::new(detected)))
}

/// Base64 JSON variant kept for older clients; nothing is persisted.
pub async fn detect_food(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<DetectFoodRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = req.decode_image()?;
    let detected = state.detection.detect(bytes).await?;
    Ok(Json(LegacyDetectResponse::from(detected)))
}

pub async fn list_detections(
    State(state): State<AppState>,
    Query(params): Query<DetectionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let detections = state.catalog.list_detections(params.limit()).await?;
    Ok(Json(detections))
}
