use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strikesike::{
    config::ServerConfig,
    prompts::{PromptDeck, PromptProvider},
    state::AppState,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strikesike=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Strike/Sike...");

    let config = ServerConfig::from_env();

    let deck = match &config.prompts_file {
        Some(path) => match PromptDeck::from_file(path) {
            Ok(deck) => deck,
            Err(e) => {
                tracing::warn!("{}. Falling back to the standard deck.", e);
                PromptDeck::standard()
            }
        },
        None => PromptDeck::standard(),
    };
    tracing::info!("Using prompt deck '{}' ({} prompts)", deck.name(), deck.len());
    let prompts: Arc<dyn PromptProvider> = Arc::new(deck);

    let addr = config.addr();
    let state = Arc::new(AppState::with_config(config, prompts));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", addr, e));
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
