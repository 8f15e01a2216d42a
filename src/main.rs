use tracing_subscriber::EnvFilter;

use gitwise_search::api;
use gitwise_search::config::Config;
use gitwise_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Posts snapshot: {}", config.posts_path.display());
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!(
        "Ranking: top {} candidates, {:?} validation, cache capacity {}",
        config.ranking.candidate_limit,
        config.ranking.strictness,
        config.cache.capacity
    );

    let state = AppState::new(config.clone())?;
    tracing::info!("Loaded {} posts", state.posts.len());

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
