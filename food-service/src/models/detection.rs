//! Detection history model.

use super::Food;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One detected food for one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub id: i64,
    pub food: Food,
    /// Storage key of the uploaded image.
    pub image: String,
    pub confidence: f32,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDetection {
    pub food_id: i64,
    pub image: String,
    pub confidence: f32,
}
