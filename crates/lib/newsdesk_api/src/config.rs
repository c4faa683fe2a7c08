//! API server configuration.

use std::fmt;

use newsdesk_core::auth::AuthError;
use newsdesk_core::auth::jwt::{DEFAULT_ACCESS_LIFETIME, DEFAULT_REFRESH_LIFETIME, TokenLifetimes};

/// Deployment environment. Only `Development` exposes internal error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Anything other than `development`/`dev` is treated as production.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub token_lifetimes: TokenLifetimes,
    /// Key for verifying legacy `enc:` password records.
    pub crypto_secret_key: Option<String>,
    pub environment: Environment,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("pg_connection_url", &self.pg_connection_url)
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetimes", &self.token_lifetimes)
            .field(
                "crypto_secret_key",
                &self.crypto_secret_key.as_ref().map(|_| "<redacted>"),
            )
            .field("environment", &self.environment)
            .finish()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                 | Default                                   |
    /// |--------------------------|-------------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3000`                          |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/newsdesk`      |
    /// | `JWT_SECRET`             | required                                  |
    /// | `JWT_EXPIRES_IN`         | `7d`                                      |
    /// | `JWT_REFRESH_EXPIRES_IN` | `30d`                                     |
    /// | `CRYPTO_SECRET_KEY`      | unset                                     |
    /// | `APP_ENV`                | `production`                              |
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret =
            var("JWT_SECRET").ok_or_else(|| AuthError::Config("JWT_SECRET is not set".into()))?;
        let token_lifetimes = TokenLifetimes::parse(
            &var("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_ACCESS_LIFETIME.into()),
            &var("JWT_REFRESH_EXPIRES_IN").unwrap_or_else(|| DEFAULT_REFRESH_LIFETIME.into()),
        )?;

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
            pg_connection_url: var("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/newsdesk".into()),
            jwt_secret,
            token_lifetimes,
            crypto_secret_key: var("CRYPTO_SECRET_KEY"),
            environment: var("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or_default(),
        })
    }
}
