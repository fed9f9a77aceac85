use std::env;
use std::str::FromStr;

use crate::utils::logger::DEFAULT_SLOW_QUERY_MS;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_STATIC_DIR: &str = "./frontend";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_BODY_MB: usize = 50;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub static_dir: String,
    pub cors_allowed_origin: String,
    pub max_request_body_mb: usize,
    pub database_max_connections: u32,
    pub slow_query_ms: u64,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string()),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_CORS_ORIGIN.to_string()),
            max_request_body_mb: parse_or(
                "MAX_REQUEST_BODY_MB",
                env::var("MAX_REQUEST_BODY_MB").ok(),
                DEFAULT_MAX_BODY_MB,
            ),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                env::var("DATABASE_MAX_CONNECTIONS").ok(),
                DEFAULT_MAX_CONNECTIONS,
            ),
            slow_query_ms: parse_or(
                "SLOW_QUERY_MS",
                env::var("SLOW_QUERY_MS").ok(),
                DEFAULT_SLOW_QUERY_MS,
            ),
        })
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.max_request_body_mb * 1024 * 1024
    }

    /// Defaults for everything, pointing at the given database.
    #[cfg(test)]
    pub fn with_database_url(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            cors_allowed_origin: DEFAULT_CORS_ORIGIN.to_string(),
            max_request_body_mb: DEFAULT_MAX_BODY_MB,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value {:?} for {}, using default", value, key);
            default
        }),
    }
}
