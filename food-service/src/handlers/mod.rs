pub mod detection;
pub mod fooddb;
pub mod foods;
pub mod health;
pub mod nutrition;

pub use detection::{detect, detect_food, list_detections};
pub use fooddb::search_food_db;
pub use foods::{create_food, delete_food, get_food, list_foods, update_food};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use nutrition::{create_entry, delete_entry, list_entries, nutrition_summary};
