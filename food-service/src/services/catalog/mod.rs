//! Food catalog and detection history persistence.
//!
//! The catalog lives in Postgres by default; MongoDB and an in-memory store
//! implement the same trait for document-store deployments and tests.

pub mod memory;
pub mod mongo;
pub mod postgres;

use crate::models::{Detection, Food, FoodFilter, FoodUpdate, NewDetection, NewFood};
use async_trait::async_trait;
use service_core::error::AppError;

pub use memory::MemoryCatalog;
pub use mongo::MongoCatalog;
pub use postgres::PgCatalog;

#[async_trait]
pub trait FoodCatalog: Send + Sync {
    /// Foods matching the filter, ordered by name.
    async fn list(&self, filter: &FoodFilter) -> Result<Vec<Food>, AppError>;

    async fn get(&self, id: i64) -> Result<Option<Food>, AppError>;

    async fn find_by_class(&self, food_class: &str) -> Result<Option<Food>, AppError>;

    /// Fails with `Conflict` when `food_class` is taken.
    async fn create(&self, food: NewFood) -> Result<Food, AppError>;

    async fn update(&self, id: i64, update: FoodUpdate) -> Result<Option<Food>, AppError>;

    /// Removes the food and its detection history.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Writes every record or none; fails with `NotFound` if any food is missing.
    async fn record_detections(
        &self,
        detections: Vec<NewDetection>,
    ) -> Result<Vec<Detection>, AppError>;

    /// Most recent detections first.
    async fn list_detections(&self, limit: i64) -> Result<Vec<Detection>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    /// Insert foods whose `food_class` is not present yet; returns how many were added.
    async fn seed(&self, foods: Vec<NewFood>) -> Result<usize, AppError> {
        let mut inserted = 0;
        for food in foods {
            if self.find_by_class(&food.food_class).await?.is_some() {
                tracing::debug!(food_class = %food.food_class, "Seed food already present");
                continue;
            }
            match self.create(food).await {
                Ok(created) => {
                    tracing::info!(food_class = %created.food_class, "Seeded food");
                    inserted += 1;
                }
                Err(AppError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(inserted)
    }
}

pub(crate) fn class_conflict(food_class: &str) -> AppError {
    AppError::Conflict(anyhow::anyhow!(
        "Food with class '{}' already exists",
        food_class
    ))
}
