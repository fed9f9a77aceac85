mod handlers;
mod models;
mod services;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::path::PathBuf;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    handlers::{dashboard, requisitions, transfer},
    utils::{config::AppConfig, database::create_pool, logger::LOGGER},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if origin == "*" {
        Ok(layer.allow_origin(HeaderValue::from_static("*")))
    } else {
        Ok(layer.allow_origin(origin.parse::<HeaderValue>()?))
    }
}

fn build_router(state: AppState, config: &AppConfig) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/requisitions",
            get(requisitions::list_requisitions).post(requisitions::create_requisition),
        )
        .route(
            "/requisitions/:id",
            get(requisitions::get_requisition)
                .put(requisitions::update_requisition)
                .delete(requisitions::delete_requisition),
        )
        .route("/stats", get(requisitions::get_summary_stats))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/filters", get(dashboard::get_filter_options))
        .route("/export", get(transfer::export_requisitions))
        .route("/import", post(transfer::import_requisitions));

    let static_dir = PathBuf::from(&config.static_dir);

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(&static_dir))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/dashboard", ServeFile::new(static_dir.join("dashboard.html")))
        .layer(cors_layer(&config.cors_allowed_origin)?)
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes()))
        .with_state(state);

    Ok(app)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recruitment_stats_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    LOGGER.set_slow_query_threshold(config.slow_query_ms);

    let db = create_pool(&config.database_url, config.database_max_connections).await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    let app = build_router(AppState { db }, &config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
