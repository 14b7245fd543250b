use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Identities created at startup when seeding is enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub user_email: String,
    pub user_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub webhook_secret: String,
    pub seed: Option<SeedConfig>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: env_or("JWT_ISSUER", "payledger"),
            audience: env_or("JWT_AUDIENCE", "payledger-users"),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };
        let webhook_secret =
            std::env::var("WEBHOOK_SECRET").context("WEBHOOK_SECRET is not set")?;
        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let seed_enabled = std::env::var("SEED_DEFAULTS")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let seed = seed_enabled.then(|| SeedConfig {
            admin_email: env_or("DEFAULT_ADMIN_EMAIL", "admin@example.com"),
            admin_password: env_or("DEFAULT_ADMIN_PASSWORD", "admin123"),
            user_email: env_or("DEFAULT_USER_EMAIL", "user@example.com"),
            user_password: env_or("DEFAULT_USER_PASSWORD", "user123"),
        });

        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
            webhook_secret,
            seed,
        })
    }
}
