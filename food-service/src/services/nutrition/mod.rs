//! Per-user nutrition log.

pub mod memory;
pub mod mongo;

use crate::models::{DateRange, NutritionEntry, NutritionSummary};
use async_trait::async_trait;
use service_core::error::AppError;

pub use memory::MemoryNutritionStore;
pub use mongo::MongoNutritionStore;

#[async_trait]
pub trait NutritionStore: Send + Sync {
    /// The owner's entries, newest first.
    async fn list(&self, owner: &str) -> Result<Vec<NutritionEntry>, AppError>;

    async fn create(&self, entry: NutritionEntry) -> Result<NutritionEntry, AppError>;

    /// Returns false when no entry with that id belongs to the owner.
    async fn delete(&self, owner: &str, id: &str) -> Result<bool, AppError>;

    async fn summary(
        &self,
        owner: &str,
        range: Option<DateRange>,
    ) -> Result<NutritionSummary, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
