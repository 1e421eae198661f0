//! Nutrition log model.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// A consumed food logged by a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionEntry {
    pub id: String,
    #[serde(skip_serializing)]
    pub owner: String,
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNutritionEntry {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionEntry {
    pub fn new(owner: &str, new: NewNutritionEntry) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            food_name: new.food_name,
            calories: new.calories,
            protein: new.protein,
            carbs: new.carbs,
            fat: new.fat,
            timestamp: Utc::now(),
        }
    }
}

/// Half-open `[from, to)` timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// The whole UTC day.
    pub fn day(date: NaiveDate) -> Self {
        let from = date.and_time(chrono::NaiveTime::MIN).and_utc();
        Self {
            from,
            to: from + Duration::days(1),
        }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.from && *ts < self.to
    }
}

/// Totals over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionSummary {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub entry_count: u64,
}

impl NutritionSummary {
    pub fn add(&mut self, entry: &NutritionEntry) {
        self.total_calories += entry.calories;
        self.total_protein += entry.protein;
        self.total_carbs += entry.carbs;
        self.total_fat += entry.fat;
        self.entry_count += 1;
    }
}

impl<'a> FromIterator<&'a NutritionEntry> for NutritionSummary {
    fn from_iter<I: IntoIterator<Item = &'a NutritionEntry>>(iter: I) -> Self {
        let mut summary = NutritionSummary::default();
        for entry in iter {
            summary.add(entry);
        }
        summary
    }
}
