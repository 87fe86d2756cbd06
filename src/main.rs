//! PromptScroll binary entry point

use promptscroll::service::FetchOutcome;
use promptscroll::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the logging section
/// 3. Initialize AppState
/// 4. Load top prompts and the first feed page with the saved filters
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG overrides the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter_directive().into());

    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting PromptScroll...");
    tracing::info!(
        gateway = %config.gateway.url,
        page_size = config.feed.page_size,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    promptscroll::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config)?;

    // 5. Top prompts are decoration; the feed still loads without them
    if let Err(error) = state.top.refresh().await {
        tracing::warn!(%error, "Failed to load top prompts");
    }

    // 6. First feed page
    tracing::info!(
        filters = ?state.feed.filters(),
        active = state.feed.has_active_filters(),
        "Loading feed"
    );
    if state.feed.refresh().await == FetchOutcome::Failed {
        let message = state
            .feed
            .snapshot()
            .error
            .unwrap_or_else(|| "feed request failed".to_string());
        tracing::error!(%message, "Feed unavailable");
        return Err(message.into());
    }

    let snapshot = state.feed.snapshot();
    for prompt in &snapshot.items {
        tracing::info!(
            id = %prompt.id,
            title = %prompt.title,
            model = %promptscroll::data::model_meta(&prompt.primary_model).name,
            likes = prompt.total_likes,
            uses = prompt.total_uses,
            top = state.top.is_top(&prompt.id),
            "Prompt"
        );
    }
    tracing::info!(
        loaded = snapshot.items.len(),
        has_more = snapshot.has_more,
        "Feed loaded"
    );

    tracing::debug!(metrics = %promptscroll::metrics::render(), "Metrics snapshot");

    Ok(())
}
