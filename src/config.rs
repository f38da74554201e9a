use anyhow::Context;
use serde::Deserialize;

use crate::secrets::SecretResolver;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Process-wide configuration, assembled once at startup and never
/// mutated afterwards. Values that may live in a vault (database URL,
/// signing key, admin setup key) go through the [`SecretResolver`].
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin_setup_key: Option<String>,
}

impl AppConfig {
    pub async fn load(resolver: &dyn SecretResolver) -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let database_url = resolver.resolve(&database_url).await?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let secret = resolver.resolve(&secret).await?;

        let admin_setup_key = match std::env::var("ADMIN_SETUP_KEY") {
            Ok(v) => Some(resolver.resolve(&v).await?),
            Err(_) => None,
        };

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "slotbook".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "slotbook-users".into()),
            ttl_minutes: ttl_minutes_from(std::env::var("JWT_TTL_MINUTES").ok()),
        };

        Ok(Self {
            database_url,
            jwt,
            admin_setup_key,
        })
    }
}

/// Token TTL from the environment, defaulting to one day. Unparseable
/// or non-positive values fall back to the default; a negative TTL
/// must never reach the signing path, where it would wrap into an
/// enormous unsigned duration.
fn ttl_minutes_from(raw: Option<String>) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(60 * 24)
}
