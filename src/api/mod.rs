//! REST API routes for the palette service

pub mod colors;
pub mod recluster;
pub mod recommendations;
mod state;
pub mod trends;

pub use state::AppState;

use actix_web::web;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Color analysis
        .configure(colors::configure)
        // Recommendations
        .configure(recommendations::configure)
        // Background reclustering
        .service(web::scope("/recluster").configure(recluster::configure))
        // Trend listing
        .service(web::scope("/api").configure(trends::configure));
}
