use anyhow::Context;
use serde::Deserialize;

/// Signing secrets and lifetimes for the two token kinds.
///
/// Access and refresh tokens are signed with independent secrets so that
/// compromise of one does not compromise the other.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub access_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_secret: String,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub tokens: TokenConfig,
}

impl AppConfig {
    /// Read configuration from the environment. Secrets and expiries are
    /// required: missing values abort startup instead of issuing unsigned
    /// or non-expiring tokens.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let tokens = TokenConfig {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")
                .context("ACCESS_TOKEN_SECRET is not set")?,
            access_ttl_minutes: std::env::var("ACCESS_TOKEN_EXPIRY")
                .context("ACCESS_TOKEN_EXPIRY is not set")?
                .parse::<i64>()
                .context("ACCESS_TOKEN_EXPIRY must be an integer number of minutes")?,
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")
                .context("REFRESH_TOKEN_SECRET is not set")?,
            refresh_ttl_days: std::env::var("REFRESH_TOKEN_EXPIRY")
                .context("REFRESH_TOKEN_EXPIRY is not set")?
                .parse::<i64>()
                .context("REFRESH_TOKEN_EXPIRY must be an integer number of days")?,
        };
        Ok(Self {
            database_url,
            tokens,
        })
    }
}
