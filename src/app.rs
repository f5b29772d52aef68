//! Application state and service initialization
//!
//! This module centralizes all service initialization and dependency injection,
//! making it easier to manage the application lifecycle and test services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::repository::PgTriageStore;
use crate::model::Config;
use crate::service::{HttpModelClient, SystemClock, TriageService};

/// Environment variable holding the model endpoint API key
const ENV_LLM_API_KEY: &str = "TRIAGE_LLM_API_KEY";

/// Application state containing all services and shared resources
pub struct AppState {
    /// Database connection pool
    pub db_pool: PgPool,
    /// Triage orchestration service
    pub triage_service: Arc<TriageService>,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// This performs:
    /// 1. Database connection and schema initialization
    /// 2. Model client initialization (requires TRIAGE_LLM_API_KEY)
    /// 3. Service dependency graph construction
    pub async fn new(config: Config) -> Result<Self, AppError> {
        // Initialize PostgreSQL database
        let db_pool = crate::db::create_pool()
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        // Initialize database schema
        crate::db::init_schema(&db_pool)
            .await
            .map_err(|e| AppError::DatabaseInit(e.to_string()))?;

        // Model API key is required
        let api_key =
            std::env::var(ENV_LLM_API_KEY).map_err(|_| AppError::MissingConfig(ENV_LLM_API_KEY))?;

        let model_client = HttpModelClient::new(config.llm.clone(), api_key)
            .map_err(|_| AppError::InvalidConfig("Invalid model client configuration"))?;

        tracing::info!(
            model = %config.llm.model,
            hourly_limit = config.limits.hourly_limit,
            batch_cap = config.limits.batch_cap,
            "Triage service initialized"
        );

        let triage_service = Arc::new(TriageService::new(
            Arc::new(PgTriageStore::new(db_pool.clone())),
            Arc::new(model_client),
            Arc::new(SystemClock),
            config.limits,
        ));

        Ok(Self {
            db_pool,
            triage_service,
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Database initialization failed
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
