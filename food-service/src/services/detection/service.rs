use super::preprocess::{self, PreparedImage};
use super::Classifier;
use crate::models::{Food, NewDetection};
use crate::services::catalog::FoodCatalog;
use crate::services::metrics;
use crate::services::storage::Storage;
use service_core::error::AppError;
use std::sync::Arc;

/// A catalog food matched by the classifier.
#[derive(Debug, Clone)]
pub struct DetectedFood {
    pub food: Food,
    pub confidence: f32,
}

pub struct DetectionService {
    catalog: Arc<dyn FoodCatalog>,
    storage: Arc<dyn Storage>,
    classifier: Arc<dyn Classifier>,
    max_dimension: u32,
}

impl DetectionService {
    pub fn new(
        catalog: Arc<dyn FoodCatalog>,
        storage: Arc<dyn Storage>,
        classifier: Arc<dyn Classifier>,
        max_dimension: u32,
    ) -> Self {
        Self {
            catalog,
            storage,
            classifier,
            max_dimension,
        }
    }

    pub fn mode(&self) -> &'static str {
        self.classifier.mode()
    }

    /// Classify an upload, store it and record one history entry per food.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len(), mode = self.mode()))]
    pub async fn detect_and_record(&self, bytes: Vec<u8>) -> Result<Vec<DetectedFood>, AppError> {
        let (prepared, bytes) = prepare_blocking(bytes, self.max_dimension).await?;
        let detected = self.classify(&prepared).await?;
        if detected.is_empty() {
            return Ok(detected);
        }

        let key = format!("detections/{}.{}", uuid::Uuid::new_v4(), prepared.extension);
        self.storage.upload(&key, bytes).await?;

        let records = detected
            .iter()
            .map(|item| NewDetection {
                food_id: item.food.id,
                image: key.clone(),
                confidence: item.confidence,
            })
            .collect();
        if let Err(e) = self.catalog.record_detections(records).await {
            if let Err(cleanup) = self.storage.delete(&key).await {
                tracing::error!(image = %key, "Failed to remove orphaned image: {}", cleanup);
            }
            return Err(e);
        }
        tracing::info!(image = %key, foods = detected.len(), "Detection recorded");
        Ok(detected)
    }

    /// Classify without touching storage or history.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len(), mode = self.mode()))]
    pub async fn detect(&self, bytes: Vec<u8>) -> Result<Vec<DetectedFood>, AppError> {
        let (prepared, _) = prepare_blocking(bytes, self.max_dimension).await?;
        self.classify(&prepared).await
    }

    async fn classify(&self, prepared: &PreparedImage) -> Result<Vec<DetectedFood>, AppError> {
        let predictions = match self.classifier.classify(prepared).await {
            Ok(predictions) => predictions,
            Err(e) => {
                metrics::record_detection(self.mode(), "error", 0);
                return Err(e.into());
            }
        };

        let mut detected = Vec::with_capacity(predictions.len());
        for prediction in predictions {
            match self.catalog.find_by_class(&prediction.food_class).await? {
                Some(food) => detected.push(DetectedFood {
                    food,
                    confidence: prediction.confidence,
                }),
                None => tracing::warn!(
                    food_class = %prediction.food_class,
                    "Predicted class is not in the catalog"
                ),
            }
        }

        let outcome = if detected.is_empty() { "empty" } else { "detected" };
        metrics::record_detection(self.mode(), outcome, detected.len());
        Ok(detected)
    }
}

/// Decoding and resizing are CPU bound, keep them off the async workers.
async fn prepare_blocking(
    bytes: Vec<u8>,
    max_dimension: u32,
) -> Result<(PreparedImage, Vec<u8>), AppError> {
    tokio::task::spawn_blocking(move || {
        preprocess::prepare(&bytes, max_dimension).map(|p| (p, bytes))
    })
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Image task failed: {}", e)))?
}
