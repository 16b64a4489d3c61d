use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommendation_service::config::Config;
use recommendation_service::handlers::{
    health_check, model_status, predict_likes, recommend_explore, recommend_timeline,
    recommend_users, train_model,
};
use recommendation_service::services::RecommendationEngine;
use recommendation_service::store::{DataStore, InMemoryStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!(
        "Starting {} v{}",
        config.service.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Initialize the data store from the configured snapshot, or start
    // empty when none is given.
    let store: Arc<dyn DataStore> = match &config.store.snapshot_path {
        Some(path) => {
            let store = InMemoryStore::from_snapshot_file(path).map_err(|e| {
                io::Error::new(io::ErrorKind::Other, format!("Failed to load snapshot: {e}"))
            })?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("STORE_SNAPSHOT_PATH not set, starting with an empty store");
            Arc::new(InMemoryStore::new())
        }
    };

    let engine = web::Data::new(RecommendationEngine::new(store, &config));
    let port = config.service.http_port;

    tracing::info!("HTTP server listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .service(train_model)
            .service(predict_likes)
            .service(recommend_timeline)
            .service(recommend_explore)
            .service(recommend_users)
            .service(model_status)
            .service(health_check)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
