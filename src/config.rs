use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: Secret<String>,
    pub host: String,
    pub port: u16,

    // Max pooled Postgres connections
    pub database_max_connections: u32,

    // Session cookies are HTTPS-only unless explicitly disabled for local dev
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: Secret::new(config.get("database_url")?),
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port").unwrap_or(8000),
            database_max_connections: config.get("database_max_connections").unwrap_or(20),
            cookie_secure: config.get("cookie_secure").unwrap_or(true),
        })
    }
}
