//! Food detection: image preparation, classification and catalog lookup.
//!
//! Classification is pluggable so the fixed demo classifier and a remote
//! ImageNet model can be swapped by configuration.

pub mod demo;
pub mod imagenet;
pub mod preprocess;
pub mod service;
pub mod vocabulary;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

pub use demo::DemoClassifier;
pub use imagenet::ImagenetClassifier;
pub use preprocess::PreparedImage;
pub use service::{DetectedFood, DetectionService};

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Transport(String),

    #[error("Classifier timed out")]
    Timeout,

    #[error("Classifier returned status {0}")]
    Status(u16),

    #[error("Invalid classifier response: {0}")]
    InvalidResponse(String),
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

/// A catalog food class with its score in `0..=1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub food_class: String,
    pub confidence: f32,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Label used in logs and metrics.
    fn mode(&self) -> &'static str;

    /// Predictions ordered by confidence, highest first.
    async fn classify(&self, image: &PreparedImage) -> Result<Vec<Prediction>, ClassifierError>;
}
