//! API Key Manager - Main Application Entry Point
//!
//! A service that issues API keys to signed-in developers and answers
//! "is this key valid for this origin?" for the services that accept them.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: JSON records in a blob store behind a moka cache, or
//!   normalized PostgreSQL tables (sqlx)
//! - **Authentication**: identity header set by an OAuth proxy
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build the configured record store (running migrations for Postgres)
//! 3. Build HTTP router with routes and middleware
//! 4. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;
mod store;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use config::{Config, StorageBackend};
use state::AppState;
use store::{
    RecordStore,
    blob::{InMemoryBlobStore, PgBlobStore},
    cache::RecordCache,
    kv::KvRecordStore,
    relational::PgRecordStore,
};

/// Connect to Postgres and bring the schema up to date.
async fn connect(config: &Config) -> anyhow::Result<db::DbPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for the kv and relational backends")?;

    let pool = db::create_pool(database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    Ok(pool)
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; records are lost on restart");
            Arc::new(KvRecordStore::new(
                Arc::new(InMemoryBlobStore::new()),
                RecordCache::new(config.cache_capacity, config.cache_ttl()),
                config.storage_prefix.clone(),
            ))
        }
        StorageBackend::Kv => {
            let pool = connect(config).await?;
            Arc::new(KvRecordStore::new(
                Arc::new(PgBlobStore::new(pool)),
                RecordCache::new(config.cache_capacity, config.cache_ttl()),
                config.storage_prefix.clone(),
            ))
        }
        StorageBackend::Relational => Arc::new(PgRecordStore::new(connect(config).await?)),
    };

    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(backend = ?config.storage_backend, "Configuration loaded");

    let state = AppState {
        store: build_store(&config).await?,
        policy: Arc::new(config.access_policy()),
        identity_header: config.identity_header.clone(),
        email_header: config.email_header.clone(),
    };

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
