use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdesk::config::Config;
use newsdesk::db::Database;
use newsdesk::news_api::NewsApiClient;
use newsdesk::routes::{self, AppState};
use newsdesk::service::{ArticleService, NewsService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsdesk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWSDESK_CONFIG").unwrap_or_else(|_| "newsdesk.toml".to_string());
    let mut config = Config::load(&config_path)?;
    config.apply_env_overrides();
    info!("Loaded configuration from {}", config_path);
    if config.news_api.api_key.is_empty() {
        warn!("No news API key configured; ingestion requests will be rejected");
    }

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.initialize().await?;
    info!("Database initialized");

    let db = Arc::new(db);
    let api = Arc::new(NewsApiClient::new(&config.news_api)?);

    // Create app state
    let state = Arc::new(AppState {
        news: NewsService::new(db.clone(), api.clone()),
        articles: ArticleService::new(db.clone(), api),
        page_size: config.page_size,
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
