use super::NutritionStore;
use crate::models::{DateRange, NutritionEntry, NutritionSummary};
use crate::services::mongo::MongoDb;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::FindOptions,
    Collection,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tracing::instrument;

const COLLECTION: &str = "nutrition_entries";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryDocument {
    #[serde(rename = "_id")]
    id: String,
    owner: String,
    food_name: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    timestamp: DateTime<Utc>,
}

impl From<NutritionEntry> for EntryDocument {
    fn from(e: NutritionEntry) -> Self {
        Self {
            id: e.id,
            owner: e.owner,
            food_name: e.food_name,
            calories: e.calories,
            protein: e.protein,
            carbs: e.carbs,
            fat: e.fat,
            timestamp: e.timestamp,
        }
    }
}

impl From<EntryDocument> for NutritionEntry {
    fn from(d: EntryDocument) -> Self {
        Self {
            id: d.id,
            owner: d.owner,
            food_name: d.food_name,
            calories: d.calories,
            protein: d.protein,
            carbs: d.carbs,
            fat: d.fat,
            timestamp: d.timestamp,
        }
    }
}

fn match_stage(owner: &str, range: Option<DateRange>) -> Document {
    let mut filter = doc! { "owner": owner };
    if let Some(range) = range {
        filter.insert(
            "timestamp",
            doc! {
                "$gte": Bson::DateTime(range.from.into()),
                "$lt": Bson::DateTime(range.to.into()),
            },
        );
    }
    filter
}

/// `$sum` yields int or double depending on the inputs.
fn number(doc: &Document, key: &str) -> f64 {
    match doc.get(key) {
        Some(Bson::Double(v)) => *v,
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        _ => 0.0,
    }
}

fn summary_from_group(group: &Document) -> NutritionSummary {
    NutritionSummary {
        total_calories: number(group, "total_calories"),
        total_protein: number(group, "total_protein"),
        total_carbs: number(group, "total_carbs"),
        total_fat: number(group, "total_fat"),
        entry_count: number(group, "entry_count") as u64,
    }
}

#[derive(Clone)]
pub struct MongoNutritionStore {
    db: MongoDb,
}

impl MongoNutritionStore {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    fn entries(&self) -> Collection<EntryDocument> {
        self.db.database().collection(COLLECTION)
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for nutrition entries");
        self.db
            .ensure_index(
                COLLECTION,
                doc! { "owner": 1, "timestamp": -1 },
                "owner_timestamp_idx",
                false,
            )
            .await
    }
}

#[async_trait]
impl NutritionStore for MongoNutritionStore {
    #[instrument(skip(self))]
    async fn list(&self, owner: &str) -> Result<Vec<NutritionEntry>, AppError> {
        let options = FindOptions::builder().sort(doc! { "timestamp": -1 }).build();
        let docs: Vec<EntryDocument> = self
            .entries()
            .find(doc! { "owner": owner }, options)
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(NutritionEntry::from).collect())
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn create(&self, entry: NutritionEntry) -> Result<NutritionEntry, AppError> {
        self.entries()
            .insert_one(EntryDocument::from(entry.clone()), None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert nutrition entry: {}", e);
                AppError::from(e)
            })?;
        Ok(entry)
    }

    #[instrument(skip(self))]
    async fn delete(&self, owner: &str, id: &str) -> Result<bool, AppError> {
        let result = self
            .entries()
            .delete_one(doc! { "_id": id, "owner": owner }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn summary(
        &self,
        owner: &str,
        range: Option<DateRange>,
    ) -> Result<NutritionSummary, AppError> {
        let pipeline = vec![
            doc! { "$match": match_stage(owner, range) },
            doc! {
                "$group": {
                    "_id": Bson::Null,
                    "total_calories": { "$sum": "$calories" },
                    "total_protein": { "$sum": "$protein" },
                    "total_carbs": { "$sum": "$carbs" },
                    "total_fat": { "$sum": "$fat" },
                    "entry_count": { "$sum": 1 },
                }
            },
        ];

        let mut cursor = self.entries().aggregate(pipeline, None).await?;
        Ok(cursor
            .try_next()
            .await?
            .map(|group| summary_from_group(&group))
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn match_stage_adds_half_open_window() {
        let range = DateRange::day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let stage = match_stage("alice", Some(range));
        assert_eq!(stage.get_str("owner").unwrap(), "alice");
        let window = stage.get_document("timestamp").unwrap();
        assert!(window.get_datetime("$gte").is_ok());
        assert!(window.get_datetime("$lt").is_ok());

        assert!(match_stage("alice", None).get("timestamp").is_none());
    }

    #[test]
    fn group_numbers_accept_int_and_double() {
        let group = doc! {
            "total_calories": 380.5,
            "total_protein": 2_i32,
            "total_carbs": 4_i64,
            "total_fat": 6.0,
            "entry_count": 2_i32,
        };
        let summary = summary_from_group(&group);
        assert_eq!(summary.total_calories, 380.5);
        assert_eq!(summary.total_protein, 2.0);
        assert_eq!(summary.total_carbs, 4.0);
        assert_eq!(summary.entry_count, 2);
    }
}
