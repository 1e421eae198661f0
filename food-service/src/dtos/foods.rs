use crate::models::{FoodCategory, FoodFilter};
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct FoodListParams {
    pub category: Option<String>,
    pub search: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FoodListParams {
    /// `all` or an empty category means no category filter.
    pub fn into_filter(self) -> Result<FoodFilter, AppError> {
        let category = match non_empty(self.category) {
            None => None,
            Some(c) if c.eq_ignore_ascii_case("all") => None,
            Some(c) => Some(c.parse::<FoodCategory>().map_err(AppError::bad_request)?),
        };
        Ok(FoodFilter {
            category,
            search: non_empty(self.search),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FoodDbParams {
    #[serde(default)]
    pub search: String,
    pub category: Option<String>,
}
