use secrecy::Secret;
use service_core::config::{self as core_config, get_env, optional_env, parse_env};
use service_core::error::AppError;

#[derive(Debug, Clone)]
pub struct FoodConfig {
    pub common: core_config::Config,
    pub catalog: CatalogConfig,
    pub nutrition: NutritionConfig,
    pub database: DatabaseConfig,
    pub mongodb: MongoConfig,
    pub storage: StorageConfig,
    pub detection: DetectionConfig,
    pub openfoodfacts: OpenFoodFactsConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

/// Where the food catalog and detection history live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogBackend {
    Postgres,
    Mongodb,
    Memory,
}

/// Where nutrition entries live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutritionBackend {
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Fixed results, the image is only validated.
    Demo,
    /// Remote ImageNet classifier remapped onto the food vocabulary.
    Imagenet,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub seed_on_startup: bool,
    pub seed_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NutritionConfig {
    pub backend: NutritionBackend,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub local_path: String,
}

#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub mode: DetectionMode,
    pub classifier_url: Option<String>,
    pub classifier_timeout_secs: u64,
    pub top_k: usize,
    pub min_confidence: f32,
    pub demo_classes: Vec<String>,
    pub max_upload_bytes: usize,
    /// Longest accepted side of an uploaded image, in pixels.
    pub max_image_dimension: u32,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone)]
pub struct OpenFoodFactsConfig {
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    /// HS256 shared secret.
    pub jwt_secret: Option<Secret<String>>,
    /// PEM public key for RS256 tokens (Firebase/Google signing keys).
    pub public_key_path: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl std::str::FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(CatalogBackend::Postgres),
            "mongodb" | "mongo" => Ok(CatalogBackend::Mongodb),
            "memory" => Ok(CatalogBackend::Memory),
            _ => Err(format!("Invalid catalog backend: {}", s)),
        }
    }
}

impl std::str::FromStr for NutritionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(NutritionBackend::Mongodb),
            "memory" => Ok(NutritionBackend::Memory),
            _ => Err(format!("Invalid nutrition backend: {}", s)),
        }
    }
}

impl std::str::FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "demo" => Ok(DetectionMode::Demo),
            "imagenet" | "classifier" => Ok(DetectionMode::Imagenet),
            _ => Err(format!("Invalid detection mode: {}", s)),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl FoodConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = core_config::is_production();

        let catalog_backend: CatalogBackend = parse_env("CATALOG_BACKEND", "postgres", is_prod)?;
        let nutrition_backend: NutritionBackend =
            parse_env("NUTRITION_BACKEND", "mongodb", is_prod)?;
        let needs_postgres = catalog_backend == CatalogBackend::Postgres;
        let needs_mongo = catalog_backend == CatalogBackend::Mongodb
            || nutrition_backend == NutritionBackend::Mongodb;

        let config = FoodConfig {
            common,
            catalog: CatalogConfig {
                backend: catalog_backend,
                seed_on_startup: parse_env("CATALOG_SEED", "true", is_prod)?,
                seed_path: optional_env("CATALOG_SEED_PATH"),
            },
            nutrition: NutritionConfig {
                backend: nutrition_backend,
            },
            database: DatabaseConfig {
                url: Secret::new(if needs_postgres {
                    get_env("DATABASE_URL", None, is_prod)?
                } else {
                    optional_env("DATABASE_URL").unwrap_or_default()
                }),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            mongodb: MongoConfig {
                uri: if needs_mongo {
                    get_env("MONGODB_URI", None, is_prod)?
                } else {
                    optional_env("MONGODB_URI").unwrap_or_default()
                },
                database: get_env("MONGODB_DATABASE", Some("food_db"), is_prod)?,
            },
            storage: StorageConfig {
                local_path: get_env("STORAGE_LOCAL_PATH", Some("media"), is_prod)?,
            },
            detection: DetectionConfig {
                mode: parse_env("DETECTION_MODE", "demo", is_prod)?,
                classifier_url: optional_env("CLASSIFIER_URL"),
                classifier_timeout_secs: parse_env("CLASSIFIER_TIMEOUT_SECS", "10", is_prod)?,
                top_k: parse_env("DETECTION_TOP_K", "3", is_prod)?,
                min_confidence: parse_env("DETECTION_MIN_CONFIDENCE", "0.05", is_prod)?,
                demo_classes: split_list(&get_env(
                    "DETECTION_DEMO_CLASSES",
                    Some("chicken_breast,broccoli"),
                    is_prod,
                )?),
                max_upload_bytes: parse_env(
                    "DETECTION_MAX_UPLOAD_BYTES",
                    "10485760",
                    is_prod,
                )?,
                max_image_dimension: parse_env(
                    "DETECTION_MAX_IMAGE_DIMENSION",
                    "8192",
                    is_prod,
                )?,
                rate_limit_per_minute: parse_env(
                    "DETECTION_RATE_LIMIT_PER_MINUTE",
                    "30",
                    is_prod,
                )?,
            },
            openfoodfacts: OpenFoodFactsConfig {
                base_url: get_env(
                    "OPENFOODFACTS_BASE_URL",
                    Some("https://world.openfoodfacts.org"),
                    is_prod,
                )?,
                page_size: parse_env("OPENFOODFACTS_PAGE_SIZE", "10", is_prod)?,
                timeout_secs: parse_env("OPENFOODFACTS_TIMEOUT_SECS", "10", is_prod)?,
            },
            auth: AuthConfig {
                enabled: parse_env("AUTH_ENABLED", "false", is_prod)?,
                jwt_secret: optional_env("AUTH_JWT_SECRET").map(Secret::new),
                public_key_path: optional_env("AUTH_PUBLIC_KEY_PATH"),
                issuer: optional_env("AUTH_ISSUER"),
                audience: optional_env("AUTH_AUDIENCE"),
            },
            cors: CorsConfig {
                allowed_origins: split_list(
                    &optional_env("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks that `load` cannot express per variable.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.detection.mode == DetectionMode::Imagenet && self.detection.classifier_url.is_none()
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CLASSIFIER_URL is required when DETECTION_MODE=imagenet"
            )));
        }
        if self.detection.max_image_dimension == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DETECTION_MAX_IMAGE_DIMENSION must be at least 1"
            )));
        }
        if self.detection.top_k == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DETECTION_TOP_K must be at least 1"
            )));
        }
        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DETECTION_MIN_CONFIDENCE must be between 0 and 1"
            )));
        }
        if self.auth.enabled && self.auth.jwt_secret.is_none() && self.auth.public_key_path.is_none()
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "AUTH_ENABLED requires AUTH_JWT_SECRET or AUTH_PUBLIC_KEY_PATH"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backends_case_insensitively() {
        assert_eq!("Postgres".parse(), Ok(CatalogBackend::Postgres));
        assert_eq!("mongo".parse(), Ok(NutritionBackend::Mongodb));
        assert_eq!("IMAGENET".parse(), Ok(DetectionMode::Imagenet));
        assert!("sqlite".parse::<CatalogBackend>().is_err());
    }

    #[test]
    fn splits_comma_lists() {
        assert_eq!(
            split_list(" chicken_breast, ,broccoli "),
            vec!["chicken_breast".to_string(), "broccoli".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
