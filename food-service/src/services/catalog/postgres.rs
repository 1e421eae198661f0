//! Relational catalog backed by PostgreSQL.

use super::{class_conflict, FoodCatalog};
use crate::models::{Detection, Food, FoodFilter, FoodUpdate, NewDetection, NewFood};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};

const FOOD_COLUMNS: &str =
    "id, name, category, calories, protein, carbs, fat, image_url, food_class, created_at, updated_at";

#[derive(Debug, FromRow)]
struct FoodRow {
    id: i64,
    name: String,
    category: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    image_url: String,
    food_class: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FoodRow> for Food {
    type Error = AppError;

    fn try_from(row: FoodRow) -> Result<Self, Self::Error> {
        let category = row.category.parse().map_err(|e: String| {
            AppError::DatabaseError(anyhow::anyhow!("Food {} has invalid category: {}", row.id, e))
        })?;
        Ok(Food {
            id: row.id,
            name: row.name,
            category,
            calories: row.calories,
            protein: row.protein,
            carbs: row.carbs,
            fat: row.fat,
            image_url: row.image_url,
            food_class: row.food_class,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DetectionRow {
    detection_id: i64,
    image: String,
    confidence: f32,
    detected_at: DateTime<Utc>,
    #[sqlx(flatten)]
    food: FoodRow,
}

/// Escape `%`, `_` and `\` so user input is matched literally by ILIKE.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn map_write_error(e: sqlx::Error, food_class: &str, action: &str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            class_conflict(food_class)
        }
        _ => AppError::DatabaseError(anyhow::anyhow!("Failed to {} food: {}", action, e)),
    }
}

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[instrument(skip(database_url))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl FoodCatalog for PgCatalog {
    #[instrument(skip(self))]
    async fn list(&self, filter: &FoodFilter) -> Result<Vec<Food>, AppError> {
        let sql = format!(
            r#"
            SELECT {FOOD_COLUMNS}
            FROM foods
            WHERE ($1::varchar IS NULL OR category = $1)
              AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%' ESCAPE '\')
            ORDER BY name, id
            "#
        );
        let rows = sqlx::query_as::<_, FoodRow>(&sql)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(filter.search.as_deref().map(escape_like))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list foods: {}", e)))?;

        rows.into_iter().map(Food::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Option<Food>, AppError> {
        let sql = format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = $1");
        sqlx::query_as::<_, FoodRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get food: {}", e)))?
            .map(Food::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_class(&self, food_class: &str) -> Result<Option<Food>, AppError> {
        let sql = format!("SELECT {FOOD_COLUMNS} FROM foods WHERE food_class = $1");
        sqlx::query_as::<_, FoodRow>(&sql)
            .bind(food_class)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to find food by class: {}", e))
            })?
            .map(Food::try_from)
            .transpose()
    }

    #[instrument(skip(self, food), fields(food_class = %food.food_class))]
    async fn create(&self, food: NewFood) -> Result<Food, AppError> {
        let sql = format!(
            r#"
            INSERT INTO foods (name, category, calories, protein, carbs, fat, image_url, food_class)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {FOOD_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, FoodRow>(&sql)
            .bind(&food.name)
            .bind(food.category.as_str())
            .bind(food.calories)
            .bind(food.protein)
            .bind(food.carbs)
            .bind(food.fat)
            .bind(food.image_url.as_deref().unwrap_or_default())
            .bind(&food.food_class)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &food.food_class, "create"))?;

        info!(food_id = row.id, "Food created");
        Food::try_from(row)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: i64, update: FoodUpdate) -> Result<Option<Food>, AppError> {
        let sql = format!(
            r#"
            UPDATE foods SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                calories = COALESCE($4, calories),
                protein = COALESCE($5, protein),
                carbs = COALESCE($6, carbs),
                fat = COALESCE($7, fat),
                image_url = COALESCE($8, image_url),
                food_class = COALESCE($9, food_class),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FOOD_COLUMNS}
            "#
        );
        let class_for_errors = update.food_class.clone().unwrap_or_default();
        sqlx::query_as::<_, FoodRow>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.category.map(|c| c.as_str()))
            .bind(update.calories)
            .bind(update.protein)
            .bind(update.carbs)
            .bind(update.fat)
            .bind(update.image_url)
            .bind(update.food_class)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &class_for_errors, "update"))?
            .map(Food::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM foods WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete food: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, detections), fields(count = detections.len()))]
    async fn record_detections(
        &self,
        detections: Vec<NewDetection>,
    ) -> Result<Vec<Detection>, AppError> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO detection_history (food_id, image, confidence)
                VALUES ($1, $2, $3)
                RETURNING id, food_id, image, confidence, detected_at
            )
            SELECT inserted.id AS detection_id, inserted.image, inserted.confidence, inserted.detected_at,
                   {}
            FROM inserted JOIN foods f ON f.id = inserted.food_id
            "#,
            prefixed_food_columns("f")
        );

        // Dropping the transaction on an early return rolls back earlier rows.
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to start transaction: {}", e))
        })?;

        let mut recorded = Vec::with_capacity(detections.len());
        for detection in &detections {
            let row = sqlx::query_as::<_, DetectionRow>(&sql)
                .bind(detection.food_id)
                .bind(&detection.image)
                .bind(detection.confidence)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                        AppError::not_found(format!("Food {} not found", detection.food_id))
                    }
                    _ => AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to record detection: {}",
                        e
                    )),
                })?;
            recorded.push(detection_from_row(row)?);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit detections: {}", e))
        })?;
        Ok(recorded)
    }

    #[instrument(skip(self))]
    async fn list_detections(&self, limit: i64) -> Result<Vec<Detection>, AppError> {
        let sql = format!(
            r#"
            SELECT d.id AS detection_id, d.image, d.confidence, d.detected_at,
                   {}
            FROM detection_history d JOIN foods f ON f.id = d.food_id
            ORDER BY d.detected_at DESC, d.id DESC
            LIMIT $1
            "#,
            prefixed_food_columns("f")
        );
        let rows = sqlx::query_as::<_, DetectionRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list detections: {}", e))
            })?;

        rows.into_iter().map(detection_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

fn prefixed_food_columns(alias: &str) -> String {
    FOOD_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn detection_from_row(row: DetectionRow) -> Result<Detection, AppError> {
    Ok(Detection {
        id: row.detection_id,
        food: Food::try_from(row.food)?,
        image: row.image,
        confidence: row.confidence,
        detected_at: row.detected_at,
    })
}
