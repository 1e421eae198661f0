use crate::config::{CatalogBackend, DetectionMode, FoodConfig, NutritionBackend};
use crate::handlers;
use crate::middleware::TokenVerifier;
use crate::services::catalog::{FoodCatalog, MemoryCatalog, MongoCatalog, PgCatalog};
use crate::services::detection::{Classifier, DemoClassifier, DetectionService, ImagenetClassifier};
use crate::services::mongo::MongoDb;
use crate::services::nutrition::{MemoryNutritionStore, MongoNutritionStore, NutritionStore};
use crate::services::openfoodfacts::OpenFoodFactsClient;
use crate::services::seed;
use crate::services::storage::{LocalStorage, Storage};
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router, ServiceExt,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    create_ip_rate_limiter, ip_rate_limit_middleware, make_request_span, metrics_middleware,
    request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn FoodCatalog>,
    pub nutrition: Arc<dyn NutritionStore>,
    pub detection: Arc<DetectionService>,
    pub fooddb: OpenFoodFactsClient,
    /// None when authentication is disabled.
    pub token_verifier: Option<Arc<TokenVerifier>>,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

fn mongo_required(mongo: &Option<MongoDb>) -> Result<MongoDb, AppError> {
    mongo
        .clone()
        .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("MONGODB_URI is not configured")))
}

async fn build_catalog(
    config: &FoodConfig,
    mongo: &Option<MongoDb>,
) -> Result<Arc<dyn FoodCatalog>, AppError> {
    let catalog: Arc<dyn FoodCatalog> = match config.catalog.backend {
        CatalogBackend::Postgres => {
            let pg = PgCatalog::connect(
                config.database.url.expose_secret(),
                config.database.max_connections,
                config.database.min_connections,
            )
            .await?;
            pg.run_migrations().await?;
            Arc::new(pg)
        }
        CatalogBackend::Mongodb => {
            let catalog = MongoCatalog::new(mongo_required(mongo)?);
            catalog.initialize_indexes().await?;
            Arc::new(catalog)
        }
        CatalogBackend::Memory => {
            tracing::warn!("Using in-memory catalog; data is lost on restart");
            Arc::new(MemoryCatalog::new())
        }
    };

    if config.catalog.seed_on_startup {
        let inserted = catalog.seed(seed::builtin_foods()).await?;
        tracing::info!(inserted = inserted, "Built-in catalog seeded");
    }
    if let Some(path) = &config.catalog.seed_path {
        let foods = seed::load_seed_file(path).await?;
        let inserted = catalog.seed(foods).await?;
        tracing::info!(inserted = inserted, path = %path, "Seed file loaded");
    }

    Ok(catalog)
}

async fn build_nutrition(
    config: &FoodConfig,
    mongo: &Option<MongoDb>,
) -> Result<Arc<dyn NutritionStore>, AppError> {
    Ok(match config.nutrition.backend {
        NutritionBackend::Mongodb => {
            let store = MongoNutritionStore::new(mongo_required(mongo)?);
            store.initialize_indexes().await?;
            Arc::new(store)
        }
        NutritionBackend::Memory => {
            tracing::warn!("Using in-memory nutrition store; data is lost on restart");
            Arc::new(MemoryNutritionStore::new())
        }
    })
}

fn build_classifier(config: &FoodConfig) -> Result<Arc<dyn Classifier>, AppError> {
    let detection = &config.detection;
    Ok(match detection.mode {
        DetectionMode::Demo => Arc::new(DemoClassifier::new(detection.demo_classes.clone())),
        DetectionMode::Imagenet => {
            let url = detection.classifier_url.clone().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("CLASSIFIER_URL is not configured"))
            })?;
            Arc::new(ImagenetClassifier::new(
                url,
                Duration::from_secs(detection.classifier_timeout_secs),
                detection.top_k,
                detection.min_confidence,
            ))
        }
    })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    if allowed_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

fn router(config: &FoodConfig, state: AppState) -> Router {
    let detect_limiter = create_ip_rate_limiter(config.detection.rate_limit_per_minute, 60);
    let detection_routes = Router::new()
        .route("/api/detect", post(handlers::detect))
        .route("/api/detect-food", post(handlers::detect_food))
        .layer(DefaultBodyLimit::max(config.detection.max_upload_bytes))
        .route_layer(from_fn_with_state(detect_limiter, ip_rate_limit_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/api/foods",
            get(handlers::list_foods).post(handlers::create_food),
        )
        .route(
            "/api/foods/:id",
            get(handlers::get_food)
                .put(handlers::update_food)
                .delete(handlers::delete_food),
        )
        .route("/api/detections", get(handlers::list_detections))
        .route(
            "/api/nutrition/food",
            get(handlers::list_entries).post(handlers::create_entry),
        )
        .route("/api/nutrition/food/:id", delete(handlers::delete_entry))
        .route("/api/nutrition/summary", get(handlers::nutrition_summary))
        .route("/api/fooddb", get(handlers::search_food_db))
        .merge(detection_routes)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&config.cors.allowed_origins))
        .with_state(state)
}

impl Application {
    pub async fn build(config: FoodConfig) -> Result<Self, AppError> {
        let needs_mongo = config.catalog.backend == CatalogBackend::Mongodb
            || config.nutrition.backend == NutritionBackend::Mongodb;
        let mongo = if needs_mongo {
            Some(MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?)
        } else {
            None
        };

        let catalog = build_catalog(&config, &mongo).await.map_err(|e| {
            tracing::error!("Failed to initialize food catalog: {}", e);
            e
        })?;
        let nutrition = build_nutrition(&config, &mongo).await.map_err(|e| {
            tracing::error!("Failed to initialize nutrition store: {}", e);
            e
        })?;

        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.local_path)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?,
        );

        let classifier = build_classifier(&config)?;
        tracing::info!(mode = classifier.mode(), "Food detection configured");

        let token_verifier = if config.auth.enabled {
            Some(Arc::new(TokenVerifier::from_config(&config.auth)?))
        } else {
            tracing::warn!("Authentication disabled; all requests run as anonymous");
            None
        };

        let state = AppState {
            catalog: catalog.clone(),
            nutrition,
            detection: Arc::new(DetectionService::new(
                catalog,
                storage,
                classifier,
                config.detection.max_image_dimension,
            )),
            fooddb: OpenFoodFactsClient::new(config.openfoodfacts.clone())?,
            token_verifier,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();
        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router: router(&config, state.clone()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        // Trailing slashes are trimmed before routing so `/api/foods/` matches.
        let app = NormalizePathLayer::trim_trailing_slash().layer(self.router);
        axum::serve(
            self.listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
