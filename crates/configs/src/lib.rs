//! quillpress/crates/configs/src/lib.rs
//!
//! Layered application configuration: built-in defaults, then an optional
//! `config/default.toml`, then `QUILLPRESS__*` environment variables (with
//! `__` as the section separator, e.g. `QUILLPRESS__SERVER__PORT=8080`).
//! `.env` files are honored via dotenvy. The database URL carries
//! credentials and is wrapped in `SecretString` so it never lands in debug
//! output or logs.

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// An `EnvFilter` directive string, e.g. "info,services=debug".
    pub filter: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/quillpress")?
            .set_default("database.max_connections", 8)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("QUILLPRESS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
