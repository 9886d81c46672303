/// Thumbnail handlers - HTTP endpoints for thumbnail retrieval
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::error::{Result, ThumbnailError};
use crate::models::ThumbnailQuery;
use crate::services::ThumbnailManager;

/// Get a thumbnail, generating it on first request
///
/// The `Authorization` header is passed through to the content store.
pub async fn get_thumbnail(
    manager: web::Data<ThumbnailManager>,
    req: HttpRequest,
    query: web::Query<ThumbnailQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    query
        .validate()
        .map_err(|e| ThumbnailError::InvalidRequest(e.to_string()))?;

    let credential = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let thumbnail = manager
        .get_or_generate(&query.into_request(credential))
        .await?;

    Ok(HttpResponse::Ok()
        .content_type(thumbnail.mime_type)
        .body(thumbnail.data))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Route table, shared by the server and tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/health", web::get().to(health))
        .route("/metrics", web::get().to(crate::metrics::metrics_handler))
        .route("/api/v1/thumbnails", web::get().to(get_thumbnail));
}
