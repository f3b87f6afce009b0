use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// Sessions unused for this long are discarded. Also sent as the cookie's `Max-Age`.
    pub idle_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres connection string. In-memory storage is used when unset.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>()?,
            Err(_) => 8080,
        };
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "postboard.sid".into()),
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            idle_ttl: Duration::from_secs(match std::env::var("SESSION_IDLE_TTL_SECS") {
                Ok(v) => v.parse::<u64>()?,
                Err(_) => 2 * 60 * 60,
            }),
        };
        Ok(Self {
            database_url,
            max_connections,
            host,
            port,
            session,
        })
    }

    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            database_url: None,
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            session: SessionConfig {
                cookie_name: "postboard.sid".into(),
                cookie_secure: false,
                idle_ttl: Duration::from_secs(3600),
            },
        }
    }
}
