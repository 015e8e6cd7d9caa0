pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod store;
pub mod upstream;

use std::sync::Arc;

use axum::serve;
use tokio::net::TcpListener;

use crate::api::{create_router, AppState, ServiceState};
use crate::config::AppConfig;
use crate::logic::FixedWindowLimiter;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export model, store and client types
pub use model::*;
pub use store::{MemoryStore, PostgresStore, Store};
pub use upstream::TwitterCloneClient;

/// Initialise `env_logger` at info, keeping sqlx quiet unless `RUST_LOG` says otherwise
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,sqlx=warn"),
    )
    .try_init();
}

/// Load configuration, pick a store and serve until the listener fails
pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}, upstream={}, generator={:?}",
        config.server_address(),
        config.twitter_clone.base_url,
        config.generator.mode
    );
    if config.twitter_clone.api_key().is_none() {
        log::warn!("TWITTER_CLONE_API_KEY is not set; tweet proxy routes will return 500");
    }

    match &config.database.connection_string {
        Some(url) => {
            log::info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(url, config.database.max_connections).await?;
            store.migrate().await?;
            log::info!("Database schema ready");
            serve_with_store(Arc::new(store), &config).await
        }
        None => {
            log::warn!("No database configured; drafts are kept in memory and lost on restart");
            serve_with_store(Arc::new(MemoryStore::new()), &config).await
        }
    }
}

async fn serve_with_store<S: Store + 'static>(store: Arc<S>, config: &AppConfig) -> anyhow::Result<()> {
    let state: AppState<S> = Arc::new(ServiceState::from_config(store, config)?);
    spawn_limiter_sweeper(state.limiter.clone());

    let app = create_router(state);
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Tweet proxy running on http://{}", bind_address);

    serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Periodically forget clients whose window has closed
pub fn spawn_limiter_sweeper(limiter: Arc<FixedWindowLimiter>) -> tokio::task::JoinHandle<()> {
    let period = limiter.window().max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = limiter.purge_expired();
            if purged > 0 {
                log::debug!("Rate limiter dropped {} expired client windows", purged);
            }
        }
    })
}
