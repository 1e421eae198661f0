pub mod detection;
pub mod foods;
pub mod nutrition;

pub use detection::{
    DetectFoodRequest, DetectResponse, DetectedFoodResponse, DetectionListParams,
    LegacyDetectResponse, LegacyDetectionResult,
};
pub use foods::{FoodDbParams, FoodListParams};
pub use nutrition::{CreateNutritionEntryRequest, SummaryParams};
