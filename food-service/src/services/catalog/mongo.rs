//! Document-store catalog backed by MongoDB.
//!
//! Foods keep integer ids so the HTTP surface is identical to the relational
//! backend; ids come from the shared `counters` collection.

use super::{class_conflict, FoodCatalog};
use crate::models::{Detection, Food, FoodCategory, FoodFilter, FoodUpdate, NewDetection, NewFood};
use crate::services::mongo::{escape_regex, is_duplicate_key, MongoDb};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::HashMap;
use tracing::instrument;

const FOODS: &str = "foods";
const DETECTIONS: &str = "detections";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FoodDocument {
    #[serde(rename = "_id")]
    id: i64,
    name: String,
    category: FoodCategory,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    #[serde(default)]
    image_url: String,
    food_class: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl From<Food> for FoodDocument {
    fn from(food: Food) -> Self {
        Self {
            id: food.id,
            name: food.name,
            category: food.category,
            calories: food.calories,
            protein: food.protein,
            carbs: food.carbs,
            fat: food.fat,
            image_url: food.image_url,
            food_class: food.food_class,
            created_at: food.created_at,
            updated_at: food.updated_at,
        }
    }
}

impl From<FoodDocument> for Food {
    fn from(doc: FoodDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
            category: doc.category,
            calories: doc.calories,
            protein: doc.protein,
            carbs: doc.carbs,
            fat: doc.fat,
            image_url: doc.image_url,
            food_class: doc.food_class,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectionDocument {
    #[serde(rename = "_id")]
    id: i64,
    food_id: i64,
    image: String,
    confidence: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    detected_at: DateTime<Utc>,
}

/// `$set` document for the fields present in a partial update.
fn update_document(update: &FoodUpdate, now: DateTime<Utc>) -> Document {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("name", name.as_str());
    }
    if let Some(category) = update.category {
        set.insert("category", category.as_str());
    }
    for (field, value) in [
        ("calories", update.calories),
        ("protein", update.protein),
        ("carbs", update.carbs),
        ("fat", update.fat),
    ] {
        if let Some(value) = value {
            set.insert(field, value);
        }
    }
    if let Some(image_url) = &update.image_url {
        set.insert("image_url", image_url.as_str());
    }
    if let Some(food_class) = &update.food_class {
        set.insert("food_class", food_class.as_str());
    }
    set.insert("updated_at", Bson::DateTime(now.into()));
    set
}

fn filter_document(filter: &FoodFilter) -> Document {
    let mut query = Document::new();
    if let Some(category) = filter.category {
        query.insert("category", category.as_str());
    }
    if let Some(term) = &filter.search {
        query.insert("name", doc! { "$regex": escape_regex(term), "$options": "i" });
    }
    query
}

#[derive(Clone)]
pub struct MongoCatalog {
    db: MongoDb,
}

impl MongoCatalog {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    fn foods(&self) -> Collection<FoodDocument> {
        self.db.database().collection(FOODS)
    }

    fn detections(&self) -> Collection<DetectionDocument> {
        self.db.database().collection(DETECTIONS)
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for the food catalog");
        self.db
            .ensure_index(FOODS, doc! { "food_class": 1 }, "food_class_idx", true)
            .await?;
        self.db
            .ensure_index(FOODS, doc! { "category": 1, "name": 1 }, "category_name_idx", false)
            .await?;
        self.db
            .ensure_index(DETECTIONS, doc! { "detected_at": -1 }, "detected_at_idx", false)
            .await?;
        self.db
            .ensure_index(DETECTIONS, doc! { "food_id": 1 }, "food_id_idx", false)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FoodCatalog for MongoCatalog {
    #[instrument(skip(self))]
    async fn list(&self, filter: &FoodFilter) -> Result<Vec<Food>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "name": 1, "_id": 1 })
            .build();
        let cursor = self.foods().find(filter_document(filter), options).await?;
        let docs: Vec<FoodDocument> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Food::from).collect())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Option<Food>, AppError> {
        Ok(self
            .foods()
            .find_one(doc! { "_id": id }, None)
            .await?
            .map(Food::from))
    }

    #[instrument(skip(self))]
    async fn find_by_class(&self, food_class: &str) -> Result<Option<Food>, AppError> {
        Ok(self
            .foods()
            .find_one(doc! { "food_class": food_class }, None)
            .await?
            .map(Food::from))
    }

    #[instrument(skip(self, food), fields(food_class = %food.food_class))]
    async fn create(&self, food: NewFood) -> Result<Food, AppError> {
        let id = self.db.next_sequence(FOODS).await?;
        let created = Food::from_new(id, food, Utc::now());

        self.foods()
            .insert_one(FoodDocument::from(created.clone()), None)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    class_conflict(&created.food_class)
                } else {
                    tracing::error!("Failed to insert food: {}", e);
                    AppError::from(e)
                }
            })?;

        tracing::info!(food_id = id, "Food created");
        Ok(created)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: i64, update: FoodUpdate) -> Result<Option<Food>, AppError> {
        let set = update_document(&update, Utc::now());
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .foods()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    class_conflict(update.food_class.as_deref().unwrap_or_default())
                } else {
                    tracing::error!("Failed to update food {}: {}", id, e);
                    AppError::from(e)
                }
            })?;

        Ok(updated.map(Food::from))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = self.foods().delete_one(doc! { "_id": id }, None).await?;
        if result.deleted_count == 0 {
            return Ok(false);
        }
        let removed = self
            .detections()
            .delete_many(doc! { "food_id": id }, None)
            .await?;
        tracing::info!(
            food_id = id,
            detections_removed = removed.deleted_count,
            "Food deleted"
        );
        Ok(true)
    }

    #[instrument(skip(self, detections), fields(count = detections.len()))]
    async fn record_detections(
        &self,
        detections: Vec<NewDetection>,
    ) -> Result<Vec<Detection>, AppError> {
        let mut foods = Vec::with_capacity(detections.len());
        for detection in &detections {
            let food = self
                .get(detection.food_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Food {} not found", detection.food_id)))?;
            foods.push(food);
        }

        let detected_at = Utc::now();
        let mut docs = Vec::with_capacity(detections.len());
        for detection in detections {
            docs.push(DetectionDocument {
                id: self.db.next_sequence(DETECTIONS).await?,
                food_id: detection.food_id,
                image: detection.image,
                confidence: f64::from(detection.confidence),
                detected_at,
            });
        }
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        if let Err(e) = self.detections().insert_many(&docs, None).await {
            tracing::error!("Failed to insert detections: {}", e);
            let ids: Vec<i64> = docs.iter().map(|d| d.id).collect();
            if let Err(cleanup) = self
                .detections()
                .delete_many(doc! { "_id": { "$in": ids } }, None)
                .await
            {
                tracing::error!("Failed to remove partial detections: {}", cleanup);
            }
            return Err(e.into());
        }

        Ok(docs
            .into_iter()
            .zip(foods)
            .map(|(d, food)| Detection {
                id: d.id,
                food,
                image: d.image,
                confidence: d.confidence as f32,
                detected_at: d.detected_at,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_detections(&self, limit: i64) -> Result<Vec<Detection>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "detected_at": -1, "_id": -1 })
            .limit(limit)
            .build();
        let docs: Vec<DetectionDocument> = self
            .detections()
            .find(None, options)
            .await?
            .try_collect()
            .await?;

        let food_ids: Vec<i64> = docs.iter().map(|d| d.food_id).collect();
        let foods: HashMap<i64, Food> = self
            .foods()
            .find(doc! { "_id": { "$in": food_ids } }, None)
            .await?
            .try_collect::<Vec<FoodDocument>>()
            .await?
            .into_iter()
            .map(|d| (d.id, Food::from(d)))
            .collect();

        Ok(docs
            .into_iter()
            .filter_map(|d| {
                foods.get(&d.food_id).map(|food| Detection {
                    id: d.id,
                    food: food.clone(),
                    image: d.image,
                    confidence: d.confidence as f32,
                    detected_at: d.detected_at,
                })
            })
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_document_only_sets_present_fields() {
        let update = FoodUpdate {
            calories: Some(120.0),
            category: Some(FoodCategory::FastFood),
            ..Default::default()
        };
        let set = update_document(&update, Utc::now());
        assert_eq!(set.get_f64("calories").unwrap(), 120.0);
        assert_eq!(set.get_str("category").unwrap(), "Fast Food");
        assert!(set.get("name").is_none());
        assert!(set.get("protein").is_none());
        assert!(set.get_datetime("updated_at").is_ok());
    }

    #[test]
    fn filter_document_escapes_search_term() {
        let filter = FoodFilter {
            category: Some(FoodCategory::Fruits),
            search: Some("app.le".to_string()),
        };
        let query = filter_document(&filter);
        assert_eq!(query.get_str("category").unwrap(), "Fruits");
        let name = query.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), "app\\.le");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(filter_document(&FoodFilter::default()).is_empty());
    }
}
