use crate::models::NewNutritionEntry;
use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use service_core::error::AppError;
use validator::Validate;

/// Accepts `12.5` as well as `"12.5"`.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| de::Error::custom(format!("expected a number, got {}", value)))
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNutritionEntryRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "food_name must be 1-100 characters"))]
    pub food_name: String,
    #[serde(deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, message = "calories cannot be negative"))]
    pub calories: f64,
    #[serde(deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, message = "protein cannot be negative"))]
    pub protein: f64,
    #[serde(deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, message = "carbs cannot be negative"))]
    pub carbs: f64,
    #[serde(deserialize_with = "number_or_string")]
    #[validate(range(min = 0.0, message = "fat cannot be negative"))]
    pub fat: f64,
}

impl From<CreateNutritionEntryRequest> for NewNutritionEntry {
    fn from(req: CreateNutritionEntryRequest) -> Self {
        Self {
            food_name: req.food_name,
            calories: req.calories,
            protein: req.protein,
            carbs: req.carbs,
            fat: req.fat,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub date: Option<String>,
}

impl SummaryParams {
    pub fn date(&self) -> Result<Option<NaiveDate>, AppError> {
        match self.date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| AppError::bad_request(format!("Invalid date '{}', expected YYYY-MM-DD", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_strings() {
        let req: CreateNutritionEntryRequest = serde_json::from_str(
            r#"{"food_name":"Apple","calories":"95","protein":0.5,"carbs":" 25 ","fat":0}"#,
        )
        .unwrap();
        assert_eq!(req.calories, 95.0);
        assert_eq!(req.carbs, 25.0);
    }

    #[test]
    fn blank_food_name_fails_validation() {
        let req: CreateNutritionEntryRequest = serde_json::from_str(
            r#"{"food_name":"   ","calories":1,"protein":0,"carbs":0,"fat":0}"#,
        )
        .unwrap();
        assert_eq!(req.food_name, "");
        assert!(req.validate().is_err());

        let req: CreateNutritionEntryRequest = serde_json::from_str(
            r#"{"food_name":"  Apple ","calories":1,"protein":0,"carbs":0,"fat":0}"#,
        )
        .unwrap();
        assert_eq!(req.food_name, "Apple");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_missing_and_non_numeric_values() {
        assert!(serde_json::from_str::<CreateNutritionEntryRequest>(
            r#"{"food_name":"Apple","calories":"lots","protein":0,"carbs":0,"fat":0}"#
        )
        .is_err());
        assert!(serde_json::from_str::<CreateNutritionEntryRequest>(
            r#"{"food_name":"Apple","protein":0,"carbs":0,"fat":0}"#
        )
        .is_err());
        assert!(serde_json::from_str::<CreateNutritionEntryRequest>(
            r#"{"food_name":"Apple","calories":null,"protein":0,"carbs":0,"fat":0}"#
        )
        .is_err());
    }

    #[test]
    fn parses_summary_date() {
        let params = SummaryParams {
            date: Some("2024-03-10".to_string()),
        };
        assert_eq!(
            params.date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 10)
        );
        assert!(SummaryParams { date: Some("10/03/2024".to_string()) }.date().is_err());
        assert!(SummaryParams::default().date().unwrap().is_none());
    }
}
