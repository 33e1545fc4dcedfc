use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for uploaded files. Images land in `<root>/images`,
    /// model files in `<root>/models`.
    pub uploads_dir: String,
    pub max_image_bytes: u64,
    pub max_model_bytes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default(
                "server.cors.allow_origins",
                vec!["http://localhost:5173".to_string()],
            )?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://data/modelhub.db?mode=rwc")?
            .set_default("auth.jwt_secret", "secret_key")?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("storage.uploads_dir", "uploads")?
            .set_default("storage.max_image_bytes", 5 * 1024 * 1024)?
            .set_default("storage.max_model_bytes", 50 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., MODELHUB__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("MODELHUB").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
