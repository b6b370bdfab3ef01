//! Trend listing routes

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::api::AppState;
use crate::config::TREND_LISTING_LIMIT;
use crate::db::TrendTable;

/// GET /api/trends
#[get("/trends")]
pub async fn get_trends(state: web::Data<AppState>) -> impl Responder {
    match TrendTable::latest(&state.db, TREND_LISTING_LIMIT).await {
        Ok(trends) => HttpResponse::Ok().json(trends),
        Err(e) => {
            tracing::error!("Failed to fetch trends: {:#}", e);
            HttpResponse::InternalServerError().json(json!({ "error": "Failed to fetch trends" }))
        }
    }
}

/// Configure trend routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_trends);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::testing::state_with;
    use crate::models::TrendItem;
    use crate::utils::network::testing::StaticImageSource;
    use actix_web::{test, App};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_lists_twenty_most_recent() {
        let state = state_with(StaticImageSource::default()).await;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for i in 0..25 {
            let trend = TrendItem {
                id: format!("t{:02}", i),
                image_url: format!("https://trends/{}.jpg", i),
                description: "runway".into(),
                source: "vogue".into(),
                scraped_at: base + Duration::hours(i),
            };
            TrendTable::upsert(&state.db, &trend).await.unwrap();
        }

        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/api").configure(configure)),
        )
        .await;
        let req = test::TestRequest::get().uri("/api/trends").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 20);
        assert_eq!(items[0]["id"], "t24");
        assert_eq!(items[0]["imageUrl"], "https://trends/24.jpg");
        assert!(items[0]["scrapedAt"].as_str().unwrap().starts_with("2024-01-02T00:00:00"));
    }
}
