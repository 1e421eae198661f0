use super::{class_conflict, FoodCatalog};
use crate::models::{Detection, Food, FoodFilter, FoodUpdate, NewDetection, NewFood};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    foods: BTreeMap<i64, Food>,
    detections: Vec<(i64, NewDetection, chrono::DateTime<Utc>)>,
    next_food_id: i64,
    next_detection_id: i64,
}

/// Process-local catalog for development and tests.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FoodCatalog for MemoryCatalog {
    async fn list(&self, filter: &FoodFilter) -> Result<Vec<Food>, AppError> {
        let tables = self.tables.read().await;
        let mut foods: Vec<Food> = tables
            .foods
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        foods.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(foods)
    }

    async fn get(&self, id: i64) -> Result<Option<Food>, AppError> {
        Ok(self.tables.read().await.foods.get(&id).cloned())
    }

    async fn find_by_class(&self, food_class: &str) -> Result<Option<Food>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .foods
            .values()
            .find(|f| f.food_class == food_class)
            .cloned())
    }

    async fn create(&self, food: NewFood) -> Result<Food, AppError> {
        let mut tables = self.tables.write().await;
        if tables.foods.values().any(|f| f.food_class == food.food_class) {
            return Err(class_conflict(&food.food_class));
        }
        tables.next_food_id += 1;
        let id = tables.next_food_id;
        let created = Food::from_new(id, food, Utc::now());
        tables.foods.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, update: FoodUpdate) -> Result<Option<Food>, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(class) = &update.food_class {
            if tables
                .foods
                .values()
                .any(|f| f.id != id && &f.food_class == class)
            {
                return Err(class_conflict(class));
            }
        }
        let Some(food) = tables.foods.get_mut(&id) else {
            return Ok(None);
        };
        food.apply(update, Utc::now());
        Ok(Some(food.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let removed = tables.foods.remove(&id).is_some();
        if removed {
            tables.detections.retain(|(_, d, _)| d.food_id != id);
        }
        Ok(removed)
    }

    async fn record_detections(
        &self,
        detections: Vec<NewDetection>,
    ) -> Result<Vec<Detection>, AppError> {
        let mut tables = self.tables.write().await;
        let foods = detections
            .iter()
            .map(|d| {
                tables
                    .foods
                    .get(&d.food_id)
                    .cloned()
                    .ok_or_else(|| AppError::not_found(format!("Food {} not found", d.food_id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let detected_at = Utc::now();
        let mut recorded = Vec::with_capacity(detections.len());
        for (detection, food) in detections.into_iter().zip(foods) {
            tables.next_detection_id += 1;
            let id = tables.next_detection_id;
            tables.detections.push((id, detection.clone(), detected_at));
            recorded.push(Detection {
                id,
                food,
                image: detection.image,
                confidence: detection.confidence,
                detected_at,
            });
        }
        Ok(recorded)
    }

    async fn list_detections(&self, limit: i64) -> Result<Vec<Detection>, AppError> {
        let tables = self.tables.read().await;
        let detections = tables
            .detections
            .iter()
            .rev()
            .filter_map(|(id, d, at)| {
                tables.foods.get(&d.food_id).map(|food| Detection {
                    id: *id,
                    food: food.clone(),
                    image: d.image.clone(),
                    confidence: d.confidence,
                    detected_at: *at,
                })
            })
            .take(limit.max(0) as usize)
            .collect();
        Ok(detections)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FoodCategory;

    fn new_food(name: &str, class: &str, category: FoodCategory) -> NewFood {
        NewFood {
            name: name.to_string(),
            category,
            calories: 100.0,
            protein: 1.0,
            carbs: 2.0,
            fat: 3.0,
            image_url: None,
            food_class: class.to_string(),
        }
    }

    #[tokio::test]
    async fn list_is_sorted_by_name_and_filtered() {
        let catalog = MemoryCatalog::new();
        catalog.create(new_food("Pizza", "pizza", FoodCategory::FastFood)).await.unwrap();
        catalog.create(new_food("Apple", "apple", FoodCategory::Fruits)).await.unwrap();
        catalog.create(new_food("Burger", "burger", FoodCategory::FastFood)).await.unwrap();

        let all = catalog.list(&FoodFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Burger", "Pizza"]);

        let fast_food = catalog
            .list(&FoodFilter {
                category: Some(FoodCategory::FastFood),
                search: Some("zz".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(fast_food.len(), 1);
        assert_eq!(fast_food[0].food_class, "pizza");
    }

    #[tokio::test]
    async fn duplicate_class_conflicts() {
        let catalog = MemoryCatalog::new();
        catalog.create(new_food("Apple", "apple", FoodCategory::Fruits)).await.unwrap();
        let err = catalog
            .create(new_food("Green Apple", "apple", FoodCategory::Fruits))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_cascades_to_detections() {
        let catalog = MemoryCatalog::new();
        let apple = catalog.create(new_food("Apple", "apple", FoodCategory::Fruits)).await.unwrap();
        catalog
            .record_detections(vec![NewDetection {
                food_id: apple.id,
                image: "detections/a.png".to_string(),
                confidence: 0.9,
            }])
            .await
            .unwrap();
        assert_eq!(catalog.list_detections(10).await.unwrap().len(), 1);

        assert!(catalog.delete(apple.id).await.unwrap());
        assert!(catalog.list_detections(10).await.unwrap().is_empty());
        assert!(!catalog.delete(apple.id).await.unwrap());
    }

    #[tokio::test]
    async fn detections_with_a_missing_food_write_nothing() {
        let catalog = MemoryCatalog::new();
        let apple = catalog.create(new_food("Apple", "apple", FoodCategory::Fruits)).await.unwrap();

        let err = catalog
            .record_detections(vec![
                NewDetection {
                    food_id: apple.id,
                    image: "detections/a.png".to_string(),
                    confidence: 0.9,
                },
                NewDetection {
                    food_id: apple.id + 100,
                    image: "detections/a.png".to_string(),
                    confidence: 0.5,
                },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(catalog.list_detections(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_to_taken_class_conflicts() {
        let catalog = MemoryCatalog::new();
        catalog.create(new_food("Apple", "apple", FoodCategory::Fruits)).await.unwrap();
        let mango = catalog.create(new_food("Mango", "mango", FoodCategory::Fruits)).await.unwrap();

        let err = catalog
            .update(
                mango.id,
                FoodUpdate {
                    food_class: Some("apple".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let renamed = catalog
            .update(
                mango.id,
                FoodUpdate {
                    food_class: Some("mango".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.food_class, "mango");
    }

    #[tokio::test]
    async fn seed_skips_existing_classes() {
        let catalog = MemoryCatalog::new();
        catalog.create(new_food("Apple", "apple", FoodCategory::Fruits)).await.unwrap();
        let inserted = catalog
            .seed(vec![
                new_food("Apple", "apple", FoodCategory::Fruits),
                new_food("Banana", "banana", FoodCategory::Fruits),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
    }
}
