#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the channel scope application.
//!
//! Serves the chat frontend and its REST API: AI-assisted questions over
//! videos via SSE streaming from `/api/ai/ask`, chat session CRUD over the
//! `SQLite` conversations database, and the channel harvest job surface —
//! job creation, a live SSE progress stream per job, and status/result
//! polling. Harvest jobs run as detached tasks; their state lives in an
//! in-memory registry owned by [`AppState`] for the life of the process.

mod handlers;
mod harvest_routes;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use channel_scope_ai::providers::LlmProvider;
use channel_scope_harvest::{ChannelSource, YtDlpSource};
use channel_scope_jobs::{JobRegistry, ProgressBroadcaster};
use switchy_database::Database;

/// Shared application state.
pub struct AppState {
    /// In-memory registry of harvest jobs.
    pub registry: Arc<JobRegistry>,
    /// Fan-out of harvest progress events to live subscribers.
    pub broadcaster: Arc<ProgressBroadcaster>,
    /// Channel listing / video metadata source (`yt-dlp` in production).
    pub source: Arc<dyn ChannelSource>,
    /// LLM provider for the AI ask endpoint.
    pub provider: Arc<dyn LlmProvider>,
    /// `SQLite` database for persistent chat session storage.
    pub conversations_db: Arc<dyn Database>,
}

/// Resolves the conversations database path from `CONVERSATIONS_DB_PATH`.
fn conversations_db_path() -> PathBuf {
    std::env::var("CONVERSATIONS_DB_PATH").map_or_else(
        |_| PathBuf::from(channel_scope_conversations::DEFAULT_DB_PATH),
        PathBuf::from,
    )
}

/// Starts the channel scope API server.
///
/// Opens the conversations database, configures the AI provider and the
/// `yt-dlp` source from the environment, constructs the job registry and
/// progress broadcaster, and starts the Actix-Web HTTP server. This is a
/// regular async function — the caller is responsible for providing the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the conversations database cannot be opened or no AI provider
/// is configured.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Opening conversations database...");
    let conversations_db = channel_scope_conversations::open_db(&conversations_db_path())
        .await
        .expect("Failed to open conversations database");

    log::info!("Configuring AI provider...");
    let provider = channel_scope_ai::providers::create_provider_from_env()
        .expect("Failed to configure AI provider");

    let state = web::Data::new(AppState {
        registry: Arc::new(JobRegistry::new()),
        broadcaster: Arc::new(ProgressBroadcaster::new()),
        source: Arc::new(YtDlpSource::from_env()),
        provider: Arc::from(provider),
        conversations_db: Arc::from(conversations_db),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/ai/ask", web::post().to(handlers::ai_ask))
                    .route("/chats", web::get().to(handlers::list_chats))
                    .route("/chats/{id}", web::get().to(handlers::get_chat))
                    .route("/chats/{id}", web::delete().to(handlers::delete_chat))
                    .route(
                        "/channel/jobs",
                        web::post().to(harvest_routes::create_job),
                    )
                    .route(
                        "/channel/jobs/{id}/events",
                        web::get().to(harvest_routes::job_events),
                    )
                    .route(
                        "/channel/jobs/{id}/status",
                        web::get().to(harvest_routes::job_status),
                    )
                    .route(
                        "/channel/jobs/{id}/results",
                        web::get().to(harvest_routes::job_results),
                    ),
            )
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
