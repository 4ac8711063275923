//! Crowdstory API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crowdstory_api::config::ServerConfig;
use crowdstory_api::error::AppError;
use crowdstory_api::state::AppState;
use crowdstory_core::clock::{Clock, SystemClock};
use crowdstory_core::rng::{DeterministicRng, SystemRng};
use crowdstory_party::registry::RoomRegistry;
use crowdstory_story::chat::HttpCompletionClient;
use crowdstory_story::domain::StoryGenerator;
use crowdstory_story::fallback::FallbackStoryGenerator;
use crowdstory_story::image::DisabledImageGenerator;
use crowdstory_story::model::ModelStoryGenerator;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Crowdstory API server");

    // Read configuration from environment.
    let config = ServerConfig::from_env()?;
    tracing::info!(
        max_players = config.game.max_players,
        voting_duration_ms = config.game.voting_duration_ms,
        max_rounds = ?config.game.max_rounds,
        tie_break = ?config.game.tie_break,
        default_theme = %config.game.default_theme,
        "game configuration loaded"
    );

    // Build application state.
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(SystemRng::from_entropy()));
    let fallback = FallbackStoryGenerator::builtin()?;
    let stories: Arc<dyn StoryGenerator> = match &config.model {
        Some(model) => {
            tracing::info!(base_url = %model.base_url, models = ?model.models, "story engine: hosted model");
            let client = HttpCompletionClient::new(&model.base_url, model.api_key.clone())?;
            Arc::new(ModelStoryGenerator::new(
                Arc::new(client),
                model.models.clone(),
                fallback,
            ))
        }
        None => {
            tracing::warn!("story engine: offline stories (CROWDSTORY_MODEL_API_KEY not set)");
            Arc::new(fallback)
        }
    };
    let app_state = AppState::new(
        Arc::new(RoomRegistry::new(config.game.clone())),
        clock,
        rng,
        stories,
        Arc::new(DisabledImageGenerator),
    );

    // Build router.
    let app = crowdstory_api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
