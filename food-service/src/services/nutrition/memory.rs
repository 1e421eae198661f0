use super::NutritionStore;
use crate::models::{DateRange, NutritionEntry, NutritionSummary};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryNutritionStore {
    entries: RwLock<HashMap<String, NutritionEntry>>,
}

impl MemoryNutritionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NutritionStore for MemoryNutritionStore {
    async fn list(&self, owner: &str) -> Result<Vec<NutritionEntry>, AppError> {
        let entries = self.entries.read().await;
        let mut owned: Vec<NutritionEntry> = entries
            .values()
            .filter(|e| e.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(owned)
    }

    async fn create(&self, entry: NutritionEntry) -> Result<NutritionEntry, AppError> {
        self.entries
            .write()
            .await
            .insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<bool, AppError> {
        let mut entries = self.entries.write().await;
        match entries.get(id) {
            Some(entry) if entry.owner == owner => {
                entries.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn summary(
        &self,
        owner: &str,
        range: Option<DateRange>,
    ) -> Result<NutritionSummary, AppError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| e.owner == owner)
            .filter(|e| range.map_or(true, |r| r.contains(&e.timestamp)))
            .collect())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewNutritionEntry;
    use chrono::{Duration, Utc};

    fn entry(owner: &str, name: &str, calories: f64) -> NutritionEntry {
        NutritionEntry::new(
            owner,
            NewNutritionEntry {
                food_name: name.to_string(),
                calories,
                protein: 1.0,
                carbs: 2.0,
                fat: 3.0,
            },
        )
    }

    #[tokio::test]
    async fn entries_are_scoped_to_owner() {
        let store = MemoryNutritionStore::new();
        let mine = store.create(entry("alice", "Apple", 95.0)).await.unwrap();
        store.create(entry("bob", "Pizza", 285.0)).await.unwrap();

        let listed = store.list("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].food_name, "Apple");

        assert!(!store.delete("bob", &mine.id).await.unwrap());
        assert!(store.delete("alice", &mine.id).await.unwrap());
        assert!(store.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryNutritionStore::new();
        let mut older = entry("alice", "Oatmeal", 150.0);
        older.timestamp = Utc::now() - Duration::hours(2);
        store.create(older).await.unwrap();
        store.create(entry("alice", "Coffee", 2.0)).await.unwrap();

        let names: Vec<_> = store
            .list("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.food_name)
            .collect();
        assert_eq!(names, vec!["Coffee", "Oatmeal"]);
    }

    #[tokio::test]
    async fn summary_respects_date_range() {
        let store = MemoryNutritionStore::new();
        let mut yesterday = entry("alice", "Pizza", 285.0);
        yesterday.timestamp = Utc::now() - Duration::days(1);
        store.create(yesterday).await.unwrap();
        store.create(entry("alice", "Apple", 95.0)).await.unwrap();

        let all = store.summary("alice", None).await.unwrap();
        assert_eq!(all.entry_count, 2);
        assert_eq!(all.total_calories, 380.0);

        let today = store
            .summary("alice", Some(DateRange::day(Utc::now().date_naive())))
            .await
            .unwrap();
        assert_eq!(today.entry_count, 1);
        assert_eq!(today.total_calories, 95.0);
    }
}
