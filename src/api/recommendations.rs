//! Recommendation routes

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::api::AppState;

/// GET /recommendations/<user_id>
#[get("/recommendations/{user_id}")]
pub async fn get_recommendations(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let user_id = path.into_inner();
    tracing::info!("Recommendation request for user {}", user_id);

    match state.recommender.recommend(&user_id).await {
        Ok(recommendations) => {
            tracing::debug!("Found {} recommendations", recommendations.len());
            HttpResponse::Ok().json(recommendations)
        }
        Err(e) => {
            tracing::error!("{}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "An internal error occurred." }))
        }
    }
}

/// Configure recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_recommendations);
}
