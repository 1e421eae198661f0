use crate::models::Food;
use crate::services::detection::DetectedFood;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// A catalog food plus the detector's confidence.
#[derive(Debug, Serialize)]
pub struct DetectedFoodResponse {
    #[serde(flatten)]
    pub food: Food,
    pub confidence: f32,
}

impl From<DetectedFood> for DetectedFoodResponse {
    fn from(d: DetectedFood) -> Self {
        Self {
            food: d.food,
            confidence: d.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub detected_foods: Vec<DetectedFoodResponse>,
    pub message: &'static str,
}

impl DetectResponse {
    pub fn new(detected: Vec<DetectedFood>) -> Self {
        let message = if detected.is_empty() {
            "No food detected"
        } else {
            "Food detected successfully"
        };
        Self {
            detected_foods: detected.into_iter().map(Into::into).collect(),
            message,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct DetectFoodRequest {
    #[serde(default)]
    pub image: String,
}

impl DetectFoodRequest {
    /// Decode the base64 payload, tolerating a `data:image/...;base64,` prefix.
    pub fn decode_image(&self) -> Result<Vec<u8>, AppError> {
        let raw = self.image.trim();
        let encoded = match raw.split_once(',') {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => raw,
        };
        if encoded.is_empty() {
            return Err(AppError::bad_request("No image provided"));
        }
        STANDARD
            .decode(encoded)
            .map_err(|e| AppError::bad_request(format!("Invalid base64 image: {}", e)))
    }
}

#[derive(Debug, Serialize)]
pub struct LegacyDetectionResult {
    pub food_name: String,
    pub calories: f64,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct LegacyDetectResponse {
    pub results: Vec<LegacyDetectionResult>,
}

impl From<Vec<DetectedFood>> for LegacyDetectResponse {
    fn from(detected: Vec<DetectedFood>) -> Self {
        Self {
            results: detected
                .into_iter()
                .map(|d| LegacyDetectionResult {
                    food_name: d.food.name,
                    calories: d.food.calories,
                    confidence: d.confidence,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectionListParams {
    pub limit: Option<i64>,
}

impl DetectionListParams {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}
