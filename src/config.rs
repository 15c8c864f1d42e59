use std::net::SocketAddr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32);

        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_or("APP_PORT", 8080u16);
        let bind_addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid APP_HOST {:?}", host))?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            ttl_minutes: env_or("JWT_TTL_MINUTES", 10i64),
        };

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
            jwt,
        })
    }
}

/// Unset or unparseable values fall back to `default`.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_bad_values() {
        assert_eq!(env_or("USERDESK_TEST_UNSET_VAR", 7u32), 7);
        std::env::set_var("USERDESK_TEST_BAD_VAR", "ten");
        assert_eq!(env_or("USERDESK_TEST_BAD_VAR", 10i64), 10);
        std::env::set_var("USERDESK_TEST_GOOD_VAR", " 25 ");
        assert_eq!(env_or("USERDESK_TEST_GOOD_VAR", 10u32), 25);
    }
}
