use super::{Classifier, ClassifierError, PreparedImage, Prediction};
use async_trait::async_trait;

const FIRST_CONFIDENCE: f32 = 0.85;
const STEP: f32 = 0.10;
const FLOOR: f32 = 0.05;

/// Returns a fixed list of classes regardless of the image content.
pub struct DemoClassifier {
    classes: Vec<String>,
}

impl DemoClassifier {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }
}

#[async_trait]
impl Classifier for DemoClassifier {
    fn mode(&self) -> &'static str {
        "demo"
    }

    async fn classify(&self, _image: &PreparedImage) -> Result<Vec<Prediction>, ClassifierError> {
        Ok(self
            .classes
            .iter()
            .enumerate()
            .map(|(rank, class)| Prediction {
                food_class: class.clone(),
                confidence: (FIRST_CONFIDENCE - STEP * rank as f32).max(FLOOR),
            })
            .collect())
    }
}
