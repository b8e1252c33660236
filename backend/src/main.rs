mod catalog;
mod config;
mod detect;
mod routes;

use std::env;
use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use catalog::JsonCatalog;
use config::DetectionConfig;
use detect::classifier::ClassifierRegistry;
use detect::pipeline::DetectionPipeline;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = DetectionConfig::load().map_err(|e| {
        std::io::Error::other(format!("Failed to load detection config: {e}"))
    })?;

    let data_dir = env::var("CATALOG_DATA_DIR").unwrap_or_else(|_| {
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            format!("{}/../data", manifest_dir)
        } else {
            "/usr/src/app/data".to_string()
        }
    });

    let catalog = JsonCatalog::load(Path::new(&data_dir)).map_err(|e| {
        std::io::Error::other(format!("Failed to load catalogs from {data_dir}: {e}"))
    })?;
    let (plants, diseases, pests) = catalog.counts();
    log::info!("loaded catalogs: {plants} plants, {diseases} diseases, {pests} pests");

    // Weights load once here and are shared read-only by every worker.
    let classifiers = ClassifierRegistry::load(&config).map_err(|e| {
        std::io::Error::other(format!("Model loading failed: {e}"))
    })?;

    let pipeline = DetectionPipeline::new(&config, classifiers, Arc::new(catalog))
        .map_err(|e| std::io::Error::other(format!("Failed to build pipeline: {e}")))?;
    let pipeline = web::Data::new(pipeline);

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(pipeline.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
