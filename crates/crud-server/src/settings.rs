//! Server settings
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `crud-server.{toml,yaml,json}` file in the working directory, then
//! `CRUD_*` environment variables (`CRUD_BIND_ADDRESS`, `CRUD_DATABASE_PATH`, ...).

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::services::customer::DEFAULT_CACHE_IDLE;

/// Config file name, without extension
pub const CONFIG_FILE_NAME: &str = "crud-server";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub database_path: String,
    pub max_connections: u32,
    /// Idle window of the customer cache, in seconds
    pub customer_cache_idle_secs: u64,
    /// Insert sample rows into an empty database on startup
    pub seed: bool,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE_NAME).required(false))
            .add_source(Environment::with_prefix("CRUD").try_parsing(true));
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("database_path", "./data/crud.db")?
            .set_default("max_connections", 5)?
            .set_default(
                "customer_cache_idle_secs",
                DEFAULT_CACHE_IDLE.as_secs() as i64,
            )?
            .set_default("seed", false)?
            .build()?
            .try_deserialize()
    }

    pub fn customer_cache_idle(&self) -> Duration {
        Duration::from_secs(self.customer_cache_idle_secs)
    }
}
