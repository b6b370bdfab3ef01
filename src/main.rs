//! StylePalette - color analysis, style clustering and recommendations for a
//! catalogue of user designs

mod api;
mod config;
mod core;
mod db;
mod models;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// StylePalette service
#[derive(Parser, Debug)]
#[command(name = "stylepalette")]
#[command(version)]
#[command(about = "Color palettes, style clustering and recommendations for design catalogues")]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5001)]
    port: u16,

    /// Enable debug mode
    #[arg(long)]
    debug: bool,

    /// Path to config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Import designs and trends from a JSON file before serving
    #[arg(long)]
    import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };

    // keep dependency chatter out of the service log
    let filter = tracing_subscriber::EnvFilter::new(format!(
        "{},sqlx=warn,hyper=warn,reqwest=warn,tokenizers=warn",
        log_level
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("StylePalette v{} starting...", env!("CARGO_PKG_VERSION"));

    // Initialize paths
    let paths = config::Paths::init(args.config)?;
    info!("Config directory: {:?}", paths.config_dir());

    let settings = config::AppConfig::load(&paths.settings_path())?;

    // Open the catalogue store
    let db_path = settings
        .database_path
        .clone()
        .unwrap_or_else(|| paths.app_db_path());
    info!("Database: {:?}", db_path);
    let db = db::DbEngine::connect(&db_path).await?;

    if let Some(path) = args.import {
        info!("Importing catalogue from {:?}", path);
        core::import::import_file(&db, &path).await?;
    }
    info!("Catalogue holds {} designs", db::DesignTable::count(&db).await?);

    start_server(args.host, args.port, Arc::new(settings), &paths, db).await
}

async fn start_server(
    host: String,
    port: u16,
    settings: Arc<config::AppConfig>,
    paths: &config::Paths,
    db: db::DbEngine,
) -> Result<()> {
    use actix_cors::Cors;
    use actix_web::{http, middleware, web, App, HttpServer};

    info!("Loading sentence embedder...");
    let embedder = core::embeddings::build_embedder(&settings, paths);

    let source = utils::network::HttpImageSource::new(utils::network::RetryPolicy::from_config(
        &settings,
    ))
    .context("Failed to build HTTP client")?;

    let state = web::Data::new(api::AppState::new(
        Arc::clone(&settings),
        db,
        Arc::new(source),
        embedder,
    ));

    let addr = format!("{}:{}", host, port);
    info!("Server listening on http://{}", addr);

    let origins = settings.allowed_origins.clone();

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::ACCEPT])
            .max_age(3600);

        cors = if origins.is_empty() {
            cors.allow_any_origin()
        } else {
            origins
                .iter()
                .fold(cors, |cors, origin| cors.allowed_origin(origin))
        };

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
