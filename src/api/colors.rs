//! Color analysis routes

use actix_web::{post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::api::AppState;
use crate::core::colorlib::ColorLib;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    /// Optional `#rrggbb` anchor overriding automatic selection
    #[serde(default)]
    pub base_color: Option<String>,
}

/// POST /analyze-colors
#[post("/analyze-colors")]
pub async fn analyze_colors(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> impl Responder {
    let body = body.into_inner();

    let image_url = match body.image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            return HttpResponse::BadRequest().json(json!({ "error": "imageUrl is required" }));
        }
    };

    let base_color = match body.base_color.as_deref().map(str::trim) {
        Some(hex) if !hex.is_empty() => match ColorLib::hex_to_rgb(hex) {
            Some(rgb) => Some(rgb),
            None => {
                return HttpResponse::BadRequest()
                    .json(json!({ "error": "baseColor must be a #rrggbb hex color" }));
            }
        },
        _ => None,
    };

    tracing::info!("Color analysis request for {}", image_url);

    match state.analyzer.analyze(&image_url, base_color).await {
        Ok(analysis) => HttpResponse::Ok().json(analysis),
        Err(e) => {
            tracing::warn!("Color analysis failed for {}: {}", image_url, e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "Could not process the image." }))
        }
    }
}

/// Configure color routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze_colors);
}
