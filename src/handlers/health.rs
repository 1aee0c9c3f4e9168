use actix_web::{HttpResponse, Responder};

/// GET /
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}
