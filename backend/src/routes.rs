use actix_web::{HttpResponse, web};
use serde_json::json;
use shared::{ClimateSeries, DetectRequest};

use crate::detect::pipeline::DetectionPipeline;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/detect/species").route(web::post().to(detect_species)))
        .service(web::resource("/api/detect/disease").route(web::post().to(detect_disease)))
        .service(web::resource("/api/detect/pest").route(web::post().to(detect_pest)))
        .service(web::resource("/api/forecast/drought").route(web::post().to(forecast_drought)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

// Pipeline failures come back as 200 with a failure envelope; the caller
// decides what to persist. Only malformed requests get a 4xx, from actix.

async fn detect_species(
    pipeline: web::Data<DetectionPipeline>,
    request: web::Json<DetectRequest>,
) -> HttpResponse {
    let result = pipeline.detect_species(&request.image_url).await;
    HttpResponse::Ok().json(result)
}

async fn detect_disease(
    pipeline: web::Data<DetectionPipeline>,
    request: web::Json<DetectRequest>,
) -> HttpResponse {
    let result = pipeline.detect_disease(&request.image_url).await;
    HttpResponse::Ok().json(result)
}

async fn detect_pest(
    pipeline: web::Data<DetectionPipeline>,
    request: web::Json<DetectRequest>,
) -> HttpResponse {
    let result = pipeline.detect_pest(&request.image_url).await;
    HttpResponse::Ok().json(result)
}

async fn forecast_drought(
    pipeline: web::Data<DetectionPipeline>,
    series: web::Json<ClimateSeries>,
) -> HttpResponse {
    let result = pipeline.forecast_drought(&series);
    HttpResponse::Ok().json(result)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
