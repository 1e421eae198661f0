//! OpenFoodFacts search proxy.
//!
//! Wraps `/cgi/search.pl` and flattens each product into the shape the food
//! database page consumes.

use crate::config::OpenFoodFactsConfig;
use crate::services::metrics;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;
use service_core::observability::TracedClientExt;
use std::time::Duration;

const SEARCH_FIELDS: &str = "product_name,nutriments,image_front_url";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    nutriments: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    image_front_url: Option<String>,
}

/// One search hit, nutrition values per 100 g.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodDbItem {
    pub id: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub category: String,
    pub image: String,
}

#[derive(Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    config: OpenFoodFactsConfig,
}

/// Numbers come back as JSON numbers or numeric strings depending on the product.
fn nutriment(nutriments: &serde_json::Map<String, Value>, key: &str) -> f64 {
    match nutriments.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn fallback_image(search: &str) -> String {
    format!(
        "https://source.unsplash.com/featured/?{}",
        search.replace(' ', ",")
    )
}

fn to_item(product: Product, search: &str, category: &str) -> Option<FoodDbItem> {
    let name = product.product_name.filter(|n| !n.trim().is_empty())?;
    let nutriments = product.nutriments.unwrap_or_default();
    Some(FoodDbItem {
        id: name.to_lowercase().replace(' ', "_"),
        calories: nutriment(&nutriments, "energy-kcal_100g"),
        protein: nutriment(&nutriments, "proteins_100g"),
        carbs: nutriment(&nutriments, "carbohydrates_100g"),
        fat: nutriment(&nutriments, "fat_100g"),
        category: category.to_string(),
        image: product
            .image_front_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| fallback_image(search)),
        name,
    })
}

/// The requested category label, `General` for `all` or none.
fn category_label(category: Option<&str>) -> String {
    match category.map(str::trim) {
        None | Some("") => "General".to_string(),
        Some(c) if c.eq_ignore_ascii_case("all") => "General".to_string(),
        Some(c) => c.to_string(),
    }
}

impl OpenFoodFactsClient {
    pub fn new(config: OpenFoodFactsConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("food-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(
        &self,
        search: &str,
        category: Option<&str>,
    ) -> Result<Vec<FoodDbItem>, AppError> {
        let url = format!(
            "{}/cgi/search.pl",
            self.config.base_url.trim_end_matches('/')
        );
        let page_size = self.config.page_size.to_string();

        let response = self
            .client
            .traced_get(&url)
            .query(&[
                ("search_terms", search),
                ("search_simple", "1"),
                ("json", "1"),
                ("fields", SEARCH_FIELDS),
                ("page_size", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                metrics::record_openfoodfacts_request("error");
                tracing::error!("OpenFoodFacts request failed: {}", e);
                AppError::BadGateway(format!("OpenFoodFacts request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            metrics::record_openfoodfacts_request("error");
            tracing::error!(status = %status, "OpenFoodFacts returned an error status");
            return Err(AppError::BadGateway(format!(
                "OpenFoodFacts returned {}",
                status
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            metrics::record_openfoodfacts_request("error");
            AppError::BadGateway(format!("Invalid OpenFoodFacts response: {}", e))
        })?;

        metrics::record_openfoodfacts_request("success");
        let label = category_label(category);
        let items: Vec<FoodDbItem> = body
            .products
            .into_iter()
            .filter_map(|p| to_item(p, search, &label))
            .collect();
        tracing::debug!(results = items.len(), "OpenFoodFacts search completed");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn product(value: Value) -> Product {
        serde_json::from_value(value).unwrap()
    }

    fn client_for(server: &MockServer) -> OpenFoodFactsClient {
        OpenFoodFactsClient::new(OpenFoodFactsConfig {
            base_url: server.uri(),
            page_size: 10,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn maps_product_with_string_nutriments() {
        let item = to_item(
            product(json!({
                "product_name": "Peanut Butter",
                "nutriments": {
                    "energy-kcal_100g": "588",
                    "proteins_100g": 25.1,
                    "fat_100g": 50
                }
            })),
            "peanut butter",
            "Protein",
        )
        .unwrap();

        assert_eq!(item.id, "peanut_butter");
        assert_eq!(item.calories, 588.0);
        assert_eq!(item.protein, 25.1);
        assert_eq!(item.carbs, 0.0);
        assert_eq!(item.fat, 50.0);
        assert_eq!(item.category, "Protein");
        assert_eq!(
            item.image,
            "https://source.unsplash.com/featured/?peanut,butter"
        );
    }

    #[test]
    fn skips_unnamed_products() {
        assert!(to_item(product(json!({"product_name": ""})), "x", "General").is_none());
        assert!(to_item(product(json!({})), "x", "General").is_none());
    }

    #[test]
    fn all_category_becomes_general() {
        assert_eq!(category_label(Some("all")), "General");
        assert_eq!(category_label(None), "General");
        assert_eq!(category_label(Some("Dairy")), "Dairy");
    }

    #[tokio::test]
    async fn search_sends_expected_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi/search.pl"))
            .and(query_param("search_terms", "greek yogurt"))
            .and(query_param("search_simple", "1"))
            .and(query_param("json", "1"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [
                    {"product_name": "Greek Yogurt", "nutriments": {"energy-kcal_100g": 97},
                     "image_front_url": "https://images.example/yogurt.jpg"},
                    {"nutriments": {}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = client_for(&server)
            .search("greek yogurt", Some("all"))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].image, "https://images.example/yogurt.jpg");
        assert_eq!(items[0].category, "General");
    }

    #[tokio::test]
    async fn upstream_errors_become_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).search("apple", None).await.unwrap_err();
        assert!(matches!(err, AppError::BadGateway(_)));
    }
}
