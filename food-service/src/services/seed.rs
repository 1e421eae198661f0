//! Built-in catalog and optional JSON seed file.

use crate::models::{FoodCategory, NewFood};
use service_core::error::AppError;
use std::path::Path;
use validator::Validate;

/// (name, category, calories, protein, carbs, fat, food_class, image_url)
type SeedRow = (
    &'static str,
    FoodCategory,
    f64,
    f64,
    f64,
    f64,
    &'static str,
    Option<&'static str>,
);

const BUILTIN: &[SeedRow] = &[
    ("Chicken Breast", FoodCategory::Protein, 165.0, 31.0, 0.0, 3.6, "chicken_breast", Some("https://example.com/chicken-breast.jpg")),
    ("Broccoli", FoodCategory::Vegetables, 55.0, 3.7, 11.2, 0.6, "broccoli", Some("https://example.com/broccoli.jpg")),
    ("Brown Rice", FoodCategory::Carbs, 216.0, 5.0, 45.0, 1.8, "brown_rice", Some("https://example.com/brown-rice.jpg")),
    ("Apple", FoodCategory::Fruits, 95.0, 0.5, 25.0, 0.3, "apple", Some("https://example.com/apple.jpg")),
    ("Greek Yogurt", FoodCategory::Dairy, 133.0, 10.0, 9.0, 5.0, "greek_yogurt", Some("https://example.com/greek-yogurt.jpg")),
    ("Banana", FoodCategory::Fruits, 105.0, 1.3, 27.0, 0.4, "banana", None),
    ("Orange", FoodCategory::Fruits, 62.0, 1.2, 15.4, 0.2, "orange", None),
    ("Sandwich", FoodCategory::FastFood, 350.0, 15.0, 45.0, 12.0, "sandwich", None),
    ("Pizza", FoodCategory::FastFood, 266.0, 11.0, 33.0, 10.0, "pizza", None),
    ("Burger", FoodCategory::FastFood, 354.0, 20.0, 29.0, 17.0, "burger", None),
    ("Hotdog", FoodCategory::FastFood, 290.0, 12.0, 18.0, 18.0, "hotdog", None),
    ("Rice", FoodCategory::Grains, 130.0, 2.7, 28.0, 0.3, "rice", None),
    ("Noodles", FoodCategory::Grains, 138.0, 4.5, 25.0, 0.5, "noodles", None),
    ("Salad", FoodCategory::Vegetables, 20.0, 1.2, 3.8, 0.2, "salad", None),
    ("Bread", FoodCategory::Grains, 265.0, 9.0, 49.0, 3.2, "bread", None),
    ("Cake", FoodCategory::Desserts, 257.0, 3.0, 38.0, 10.0, "cake", None),
    ("Donut", FoodCategory::Desserts, 300.0, 4.0, 36.0, 16.0, "donut", None),
    ("Coffee", FoodCategory::Beverages, 2.0, 0.3, 0.0, 0.0, "coffee", None),
    ("Juice", FoodCategory::Beverages, 120.0, 1.0, 28.0, 0.0, "juice", None),
];

pub fn builtin_foods() -> Vec<NewFood> {
    BUILTIN
        .iter()
        .map(
            |&(name, category, calories, protein, carbs, fat, food_class, image_url)| NewFood {
                name: name.to_string(),
                category,
                calories,
                protein,
                carbs,
                fat,
                image_url: image_url.map(str::to_string),
                food_class: food_class.to_string(),
            },
        )
        .collect()
}

/// Parse a JSON array of foods; every record must pass validation.
pub fn parse_seed(json: &str) -> Result<Vec<NewFood>, AppError> {
    let foods: Vec<NewFood> = serde_json::from_str(json)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid seed file: {}", e)))?;
    for food in &foods {
        food.validate().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid seed food '{}': {}",
                food.food_class,
                e
            ))
        })?;
    }
    Ok(foods)
}

pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<NewFood>, AppError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Failed to read seed file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_seed(&raw)
}
