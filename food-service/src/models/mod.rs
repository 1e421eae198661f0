pub mod detection;
pub mod food;
pub mod nutrition;

pub use detection::{Detection, NewDetection};
pub use food::{Food, FoodCategory, FoodFilter, FoodUpdate, NewFood};
pub use nutrition::{DateRange, NewNutritionEntry, NutritionEntry, NutritionSummary};
