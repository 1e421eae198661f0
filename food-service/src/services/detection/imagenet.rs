//! Remote ImageNet-1k classifier with food-vocabulary post-processing.

use super::preprocess::PreparedImage;
use super::vocabulary::{self, IMAGENET_CLASSES};
use super::{Classifier, ClassifierError, Prediction};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Serialize)]
struct InferenceRequest<'a> {
    shape: [usize; 4],
    data: &'a [f32],
}

#[derive(Deserialize)]
struct InferenceResponse {
    logits: Vec<f32>,
}

/// Softmax with the max subtracted first so large logits do not overflow.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Fold ImageNet probabilities onto food classes and keep the best ones.
pub fn food_predictions(probabilities: &[f32], top_k: usize, min_confidence: f32) -> Vec<Prediction> {
    let mut by_class: HashMap<&'static str, f32> = HashMap::new();
    for (index, p) in probabilities.iter().enumerate() {
        if let Some(class) = vocabulary::food_class(index) {
            *by_class.entry(class).or_insert(0.0) += p;
        }
    }

    let mut predictions: Vec<Prediction> = by_class
        .into_iter()
        .filter(|(_, confidence)| *confidence >= min_confidence)
        .map(|(class, confidence)| Prediction {
            food_class: class.to_string(),
            confidence,
        })
        .collect();
    predictions.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.food_class.cmp(&b.food_class))
    });
    predictions.truncate(top_k);
    predictions
}

pub struct ImagenetClassifier {
    client: Client,
    url: String,
    timeout: Duration,
    top_k: usize,
    min_confidence: f32,
}

impl ImagenetClassifier {
    pub fn new(url: String, timeout: Duration, top_k: usize, min_confidence: f32) -> Self {
        Self {
            client: Client::new(),
            url,
            timeout,
            top_k,
            min_confidence,
        }
    }
}

#[async_trait]
impl Classifier for ImagenetClassifier {
    fn mode(&self) -> &'static str {
        "imagenet"
    }

    #[tracing::instrument(skip(self, image), fields(url = %self.url))]
    async fn classify(&self, image: &PreparedImage) -> Result<Vec<Prediction>, ClassifierError> {
        let request = InferenceRequest {
            shape: PreparedImage::shape(),
            data: &image.tensor,
        };

        let response = self
            .client
            .traced_post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout
                } else {
                    ClassifierError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "Classifier returned an error status");
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body: InferenceResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
        if body.logits.len() != IMAGENET_CLASSES {
            return Err(ClassifierError::InvalidResponse(format!(
                "expected {} logits, got {}",
                IMAGENET_CLASSES,
                body.logits.len()
            )));
        }
        if let Some(index) = body.logits.iter().position(|l| !l.is_finite()) {
            return Err(ClassifierError::InvalidResponse(format!(
                "logit {} is not a finite number",
                index
            )));
        }

        let predictions = food_predictions(&softmax(&body.logits), self.top_k, self.min_confidence);
        tracing::debug!(predictions = predictions.len(), "Classifier predictions");
        Ok(predictions)
    }
}
