//! Food catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Catalog category. Accepts the singular spellings used by older seed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FoodCategory {
    Protein,
    Carbs,
    Vegetables,
    Fruits,
    Dairy,
    FastFood,
    Grains,
    Desserts,
    Beverages,
}

impl FoodCategory {
    pub const ALL: [FoodCategory; 9] = [
        FoodCategory::Protein,
        FoodCategory::Carbs,
        FoodCategory::Vegetables,
        FoodCategory::Fruits,
        FoodCategory::Dairy,
        FoodCategory::FastFood,
        FoodCategory::Grains,
        FoodCategory::Desserts,
        FoodCategory::Beverages,
    ];

    /// Display name, also the stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protein => "Protein",
            Self::Carbs => "Carbs",
            Self::Vegetables => "Vegetables",
            Self::Fruits => "Fruits",
            Self::Dairy => "Dairy",
            Self::FastFood => "Fast Food",
            Self::Grains => "Grains",
            Self::Desserts => "Desserts",
            Self::Beverages => "Beverages",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "protein" | "proteins" => Ok(Self::Protein),
            "carbs" | "carb" => Ok(Self::Carbs),
            "vegetables" | "vegetable" => Ok(Self::Vegetables),
            "fruits" | "fruit" => Ok(Self::Fruits),
            "dairy" => Ok(Self::Dairy),
            "fastfood" => Ok(Self::FastFood),
            "grains" | "grain" => Ok(Self::Grains),
            "desserts" | "dessert" => Ok(Self::Desserts),
            "beverages" | "beverage" => Ok(Self::Beverages),
            _ => Err(format!(
                "Unknown category: {} (expected one of {})",
                s.trim(),
                Self::ALL.map(|c| c.as_str()).join(", ")
            )),
        }
    }
}

impl TryFrom<String> for FoodCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FoodCategory> for String {
    fn from(value: FoodCategory) -> Self {
        value.as_str().to_string()
    }
}

/// A catalog entry. `food_class` is the unique key detection results refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Food {
    pub id: i64,
    pub name: String,
    pub category: FoodCategory,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub image_url: String,
    pub food_class: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Food {
    pub fn from_new(id: i64, new: NewFood, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            category: new.category,
            calories: new.calories,
            protein: new.protein,
            carbs: new.carbs,
            fat: new.fat,
            image_url: new.image_url.unwrap_or_default(),
            food_class: new.food_class,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: FoodUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(calories) = update.calories {
            self.calories = calories;
        }
        if let Some(protein) = update.protein {
            self.protein = protein;
        }
        if let Some(carbs) = update.carbs {
            self.carbs = carbs;
        }
        if let Some(fat) = update.fat {
            self.fat = fat;
        }
        if let Some(image_url) = update.image_url {
            self.image_url = image_url;
        }
        if let Some(food_class) = update.food_class {
            self.food_class = food_class;
        }
        self.updated_at = now;
    }
}

pub(crate) fn validate_food_class(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("food_class");
        err.message = Some("food_class may only contain a-z, 0-9 and '_'".into());
        Err(err)
    }
}

/// Payload for creating a catalog entry; also the seed-file record format.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct NewFood {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    pub category: FoodCategory,
    #[validate(range(min = 0.0, message = "Calories cannot be negative"))]
    pub calories: f64,
    #[validate(range(min = 0.0, message = "Protein cannot be negative"))]
    pub protein: f64,
    #[validate(range(min = 0.0, message = "Carbs cannot be negative"))]
    pub carbs: f64,
    #[validate(range(min = 0.0, message = "Fat cannot be negative"))]
    pub fat: f64,
    #[validate(url(message = "image_url must be a URL"))]
    #[serde(default)]
    pub image_url: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "food_class must be 1-50 characters"),
        custom(function = "validate_food_class")
    )]
    pub food_class: String,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FoodUpdate {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    pub category: Option<FoodCategory>,
    #[validate(range(min = 0.0, message = "Calories cannot be negative"))]
    pub calories: Option<f64>,
    #[validate(range(min = 0.0, message = "Protein cannot be negative"))]
    pub protein: Option<f64>,
    #[validate(range(min = 0.0, message = "Carbs cannot be negative"))]
    pub carbs: Option<f64>,
    #[validate(range(min = 0.0, message = "Fat cannot be negative"))]
    pub fat: Option<f64>,
    #[validate(url(message = "image_url must be a URL"))]
    pub image_url: Option<String>,
    #[validate(
        length(min = 1, max = 50, message = "food_class must be 1-50 characters"),
        custom(function = "validate_food_class")
    )]
    pub food_class: Option<String>,
}

/// Catalog query: category (None = all) and case-insensitive name search.
#[derive(Debug, Clone, Default)]
pub struct FoodFilter {
    pub category: Option<FoodCategory>,
    pub search: Option<String>,
}

impl FoodFilter {
    pub fn matches(&self, food: &Food) -> bool {
        if let Some(category) = self.category {
            if food.category != category {
                return false;
            }
        }
        match &self.search {
            Some(term) => food.name.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_category_spellings() {
        assert_eq!("Fruit".parse(), Ok(FoodCategory::Fruits));
        assert_eq!("fast food".parse(), Ok(FoodCategory::FastFood));
        assert_eq!("fast_food".parse(), Ok(FoodCategory::FastFood));
        assert_eq!("Grain".parse(), Ok(FoodCategory::Grains));
        assert_eq!("VEGETABLES".parse(), Ok(FoodCategory::Vegetables));
        assert!("Snacks".parse::<FoodCategory>().is_err());
    }

    #[test]
    fn unknown_category_lists_every_choice() {
        let err = "Snacks".parse::<FoodCategory>().unwrap_err();
        for category in FoodCategory::ALL {
            assert!(err.contains(category.as_str()), "{} missing from {}", category, err);
        }
    }

    #[test]
    fn category_serializes_with_display_name() {
        let json = serde_json::to_string(&FoodCategory::FastFood).unwrap();
        assert_eq!(json, "\"Fast Food\"");
        let back: FoodCategory = serde_json::from_str("\"Dessert\"").unwrap();
        assert_eq!(back, FoodCategory::Desserts);
    }

    #[test]
    fn food_class_rejects_uppercase_and_spaces() {
        assert!(validate_food_class("greek_yogurt").is_ok());
        assert!(validate_food_class("Greek Yogurt").is_err());
    }

    #[test]
    fn new_food_validation_catches_negative_values() {
        let food = NewFood {
            name: "Apple".to_string(),
            category: FoodCategory::Fruits,
            calories: -1.0,
            protein: 0.5,
            carbs: 25.0,
            fat: 0.3,
            image_url: None,
            food_class: "apple".to_string(),
        };
        let errors = food.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("calories"));
    }

    #[test]
    fn filter_matches_category_and_substring() {
        let now = Utc::now();
        let food = Food::from_new(
            1,
            NewFood {
                name: "Brown Rice".to_string(),
                category: FoodCategory::Carbs,
                calories: 216.0,
                protein: 5.0,
                carbs: 45.0,
                fat: 1.8,
                image_url: None,
                food_class: "brown_rice".to_string(),
            },
            now,
        );

        let by_search = FoodFilter {
            category: None,
            search: Some("RICE".to_string()),
        };
        assert!(by_search.matches(&food));

        let wrong_category = FoodFilter {
            category: Some(FoodCategory::Dairy),
            search: None,
        };
        assert!(!wrong_category.matches(&food));
    }
}
