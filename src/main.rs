use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod db;
mod model;
mod service;

use api::error::ApiError;
use app::AppState;
use model::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind_addr = config.bind_addr();

    let state = AppState::new(config)
        .await
        .unwrap_or_else(|e| panic!("Failed to initialize application: {}", e));

    let db_pool = web::Data::new(state.db_pool);
    let triage_service = web::Data::from(state.triage_service);

    tracing::info!("Starting triage-agent server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allowed_headers(vec![
                "authorization",
                "x-client-info",
                "apikey",
                "content-type",
            ]);

        // Malformed JSON bodies come back as the unified 400 error shape
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            let response =
                actix_web::error::ResponseError::error_response(&ApiError::BadRequest(
                    "Invalid JSON body".to_string(),
                ));
            actix_web::error::InternalError::from_response(err, response).into()
        });

        App::new()
            .wrap(cors)
            .app_data(json_config)
            .app_data(db_pool.clone())
            .app_data(triage_service.clone())
            .configure(api::triage::configure)
            .configure(api::health::configure)
            .configure(api::openapi::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
