//! Style recluster routes

use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::api::AppState;

/// POST /recluster
#[post("")]
pub async fn trigger_recluster(state: web::Data<AppState>) -> impl Responder {
    match state.recluster.trigger() {
        Ok(ticket) => HttpResponse::Accepted().json(json!({
            "message": "Clustering process started in the background.",
            "runId": ticket.run_id,
            "coalesced": ticket.coalesced,
        })),
        Err(e) => {
            tracing::error!("Failed to queue recluster run: {:#}", e);
            HttpResponse::InternalServerError()
                .json(json!({ "error": "An internal error occurred." }))
        }
    }
}

/// GET /recluster/status
#[get("/status")]
pub async fn recluster_status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.recluster.status())
}

/// Configure recluster routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(trigger_recluster).service(recluster_status);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::state::testing::state_with;
    use crate::utils::network::testing::StaticImageSource;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::time::Duration;

    #[actix_web::test]
    async fn test_trigger_is_accepted_and_reported() {
        let state = state_with(StaticImageSource::default()).await;
        let app = test::init_service(
            App::new()
                .app_data(state)
                .service(web::scope("/recluster").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post().uri("/recluster").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 202);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["runId"], 1);
        assert_eq!(body["coalesced"], false);

        // the empty catalogue run finishes quickly
        let mut status = Value::Null;
        for _ in 0..200 {
            let req = test::TestRequest::get().uri("/recluster/status").to_request();
            status = test::call_and_read_body_json(&app, req).await;
            if !status["lastRun"].is_null() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(status["lastRun"]["runId"], 1);
        assert_eq!(status["lastRun"]["outcome"]["reason"], "noFeatures");
    }
}
