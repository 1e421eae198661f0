#![allow(dead_code)]

use food_service::config::{
    AuthConfig, CatalogBackend, CatalogConfig, CorsConfig, DatabaseConfig, DetectionConfig,
    DetectionMode, FoodConfig, MongoConfig, NutritionBackend, NutritionConfig,
    OpenFoodFactsConfig, StorageConfig,
};
use food_service::startup::{AppState, Application};
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde_json::json;
use service_core::config::Config as CoreConfig;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "food-service-test-secret";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub state: AppState,
    pub storage_path: String,
}

/// Memory backends, demo detection, no auth, unreachable upstreams.
pub fn test_config() -> FoodConfig {
    FoodConfig {
        common: CoreConfig {
            port: 0,
            ..CoreConfig::default()
        },
        catalog: CatalogConfig {
            backend: CatalogBackend::Memory,
            seed_on_startup: true,
            seed_path: None,
        },
        nutrition: NutritionConfig {
            backend: NutritionBackend::Memory,
        },
        database: DatabaseConfig {
            url: Secret::new(String::new()),
            max_connections: 1,
            min_connections: 0,
        },
        mongodb: MongoConfig {
            uri: String::new(),
            database: "food_test".to_string(),
        },
        storage: StorageConfig {
            local_path: format!("target/test-storage-{}", Uuid::new_v4()),
        },
        detection: DetectionConfig {
            mode: DetectionMode::Demo,
            classifier_url: None,
            classifier_timeout_secs: 5,
            top_k: 3,
            min_confidence: 0.05,
            demo_classes: vec!["chicken_breast".to_string(), "broccoli".to_string()],
            max_upload_bytes: 1024 * 1024,
            max_image_dimension: 4096,
            rate_limit_per_minute: 1000,
        },
        openfoodfacts: OpenFoodFactsConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            page_size: 10,
            timeout_secs: 2,
        },
        auth: AuthConfig {
            enabled: false,
            jwt_secret: None,
            public_key_path: None,
            issuer: None,
            audience: None,
        },
        cors: CorsConfig {
            allowed_origins: Vec::new(),
        },
    }
}

/// Enable HS256 auth with [`TEST_JWT_SECRET`].
pub fn with_auth(mut config: FoodConfig) -> FoodConfig {
    config.auth.enabled = true;
    config.auth.jwt_secret = Some(Secret::new(TEST_JWT_SECRET.to_string()));
    config
}

pub fn token_for(user_id: &str) -> String {
    let claims = json!({
        "sub": user_id,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// A small PNG that decodes cleanly.
pub fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([120, 180, 60]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageOutputFormat::Png)
        .expect("Failed to encode PNG");
    buffer
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: FoodConfig) -> Self {
        let storage_path = config.storage.local_path.clone();

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let state = app.state().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            state,
            storage_path,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn upload_image(&self, path: &str, field: &str, data: Vec<u8>) -> reqwest::Response {
        let form = reqwest::multipart::Form::new().part(
            field.to_string(),
            reqwest::multipart::Part::bytes(data)
                .file_name("meal.png")
                .mime_str("image/png")
                .unwrap(),
        );
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.storage_path);
    }
}
