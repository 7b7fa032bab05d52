//! Customer/Address CRUD Server
//!
//! JSON REST service over customers and the addresses they link to.
//!
//! Uses SQLite (embedded) for storage and per-entity in-memory read-through
//! caches in front of it.

mod handlers;
mod services;
mod settings;
mod storage;

use anyhow::{Context, Result};
use axum::{
    routing::{get, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use settings::ServerConfig;
use services::{AddressService, CustomerService};
use storage::Database;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub address_service: Arc<AddressService>,
    pub customer_service: Arc<CustomerService>,
}

impl AppState {
    /// Wire services on top of a database
    pub fn new(db: Arc<Database>, customer_cache_idle: Duration) -> Self {
        let address_service = Arc::new(AddressService::new(db.clone()));
        let customer_service = Arc::new(CustomerService::new(
            db,
            address_service.clone(),
            customer_cache_idle,
        ));

        Self {
            address_service,
            customer_service,
        }
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let db = Arc::new(Database::in_memory().await?);
        Ok(Self::new(db, services::customer::DEFAULT_CACHE_IDLE))
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting CRUD server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, db={}, customer cache idle={}s",
        config.bind_address, config.database_path, config.customer_cache_idle_secs
    );

    let db = Arc::new(
        Database::new(&config.database_path, config.max_connections)
            .await
            .context("Failed to initialize database")?,
    );
    if config.seed {
        db.seed_sample_data()
            .await
            .context("Failed to seed sample data")?;
    }

    let state = AppState::new(db, config.customer_cache_idle());
    let app = build_router(state);

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/address",
            get(handlers::address::list)
                .post(handlers::address::create)
                .put(handlers::address::update),
        )
        .route(
            "/address/:id",
            get(handlers::address::get).delete(handlers::address::delete),
        )
        .route(
            "/customer",
            get(handlers::customer::list)
                .post(handlers::customer::create)
                .put(handlers::customer::update),
        )
        .route(
            "/customer/:id",
            get(handlers::customer::get).delete(handlers::customer::delete),
        )
        .route(
            "/customer/:id/address/:address_id",
            put(handlers::customer::update_address),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
