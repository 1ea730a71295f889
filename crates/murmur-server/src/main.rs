mod config;

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use murmur_api::AppStateInner;
use murmur_api::countries::CountryProvider;
use murmur_db::{BlobPersistence, MemoryBlobStore, SqliteBlobStore};
use murmur_store::ChatStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let mut store = match &config.db_path {
        Some(path) => ChatStore::open(BlobPersistence::with_key(
            SqliteBlobStore::open(path)?,
            config.storage_key.clone(),
        )),
        None => {
            warn!("MURMUR_DB_PATH is :memory:, chat state will not survive a restart");
            ChatStore::open(BlobPersistence::with_key(
                MemoryBlobStore::new(),
                config.storage_key.clone(),
            ))
        }
    };
    if let Some(e) = store.take_startup_warning() {
        warn!("Saved chat state could not be restored and will be overwritten: {}", e);
    }
    info!("Loaded {} chatrooms", store.chatrooms().len());

    let state = AppStateInner::new(
        store,
        config.reply.clone(),
        CountryProvider::new(config.countries_url.clone()),
    );

    let app = murmur_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Murmur listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
