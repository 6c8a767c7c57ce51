//! Kard Backend
//!
//! REST backend for anonymous flashcard decks and quota-gated text generation.

mod api;
mod config;
mod errors;
mod generate;
mod models;
mod ratelimit;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, MethodFilter},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat};
use errors::AppError;
use generate::TextGenerator;
use store::{AnonFlashcardStore, Clock, SystemClock, UsageTracker};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub flashcards: Arc<AnonFlashcardStore>,
    /// Quota for `/api/generate`
    pub generate_usage: Arc<UsageTracker>,
    /// General per-IP limit for every `/api` route
    pub request_usage: Arc<UsageTracker>,
    pub generator: Arc<TextGenerator>,
}

impl AppState {
    /// Build fresh, empty stores from configuration.
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let generate_usage = UsageTracker::new(
            config.generate_quota.ceiling,
            config.generate_quota.window,
            clock.clone(),
        );
        let request_usage =
            UsageTracker::new(config.rate_limit.ceiling, config.rate_limit.window, clock);

        Ok(Self {
            flashcards: Arc::new(AnonFlashcardStore::new()),
            generate_usage: Arc::new(generate_usage),
            request_usage: Arc::new(request_usage),
            generator: Arc::new(TextGenerator::from_config(config)?),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    tracing::info!("Starting Kard Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    let state = AppState::new(&config, Arc::new(SystemClock))?;

    tracing::info!(
        "Generation quota: {} per {:?}",
        state.generate_usage.ceiling(),
        config.generate_quota.window
    );
    tracing::info!(
        "Request rate limit: {} per {:?}",
        state.request_usage.ceiling(),
        config.rate_limit.window
    );
    if !state.generator.is_enabled() {
        tracing::warn!("No OPENAI_API_KEY configured. Text generation is disabled!");
    }

    spawn_usage_pruner(&state, config.prune_interval);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone tracker for the rate limit layer
    let request_usage = state.request_usage.clone();

    // API routes
    let api_routes = Router::new()
        // Anonymous flashcards
        .route(
            "/anonFlashcard",
            get(api::list_anon_flashcards)
                .post(api::create_anon_flashcard)
                .put(api::update_anon_flashcard)
                .delete(api::delete_anon_flashcard)
                .patch(api::reorder_anon_flashcards)
                // `get` would otherwise answer HEAD too
                .on(MethodFilter::HEAD, api::anon_flashcard_method_not_allowed)
                .fallback(api::anon_flashcard_method_not_allowed),
        )
        // Generation
        .route("/generate", post(api::generate_text))
        .route("/aichat", post(api::chat_about_flashcards))
        // Apply per-IP rate limit
        .layer(middleware::from_fn(move |req, next| {
            ratelimit::rate_limit_layer(request_usage.clone(), req, next)
        }));

    // Health check (not rate limited)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Periodically drop usage records whose window has elapsed.
fn spawn_usage_pruner(state: &AppState, period: std::time::Duration) {
    let trackers = [state.generate_usage.clone(), state.request_usage.clone()];
    let flashcards = state.flashcards.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let pruned: usize = trackers.iter().map(|t| t.prune_expired()).sum();
            let tracked: usize = trackers.iter().map(|t| t.tracked()).sum();
            tracing::debug!(
                pruned,
                tracked,
                decks = flashcards.deck_count(),
                "Pruned expired usage records"
            );
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
