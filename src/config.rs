//! Configuration management

use anyhow::{self, Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// External places API base URL (optional, mock provider when unset)
    pub places_api_url: Option<String>,

    /// External places API key
    pub places_api_key: Option<String>,

    /// Timeout for a single external places lookup, in seconds
    pub places_timeout_secs: u64,

    /// JWT secret key for token signing/validation
    pub jwt_secret: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url =
            std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let places_api_url = std::env::var("PLACES_API_URL").ok();
        let places_api_key = std::env::var("PLACES_API_KEY").ok();

        let places_timeout_secs = std::env::var("PLACES_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let jwt_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set — generate one with: openssl rand -base64 48")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 bytes (current: {} bytes). Generate one with: openssl rand -base64 48",
                jwt_secret.len()
            );
        }

        Ok(Self {
            nats_url,
            database_url,
            places_api_url,
            places_api_key,
            places_timeout_secs,
            jwt_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state, so they only run one at a time:
    // cargo test -- --ignored --test-threads=1
    #[test]
    #[ignore]
    fn places_url_some_when_set() {
        std::env::set_var("PLACES_API_URL", "http://localhost:9090");
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.places_api_url,
            Some("http://localhost:9090".to_string())
        );

        std::env::remove_var("PLACES_API_URL");
    }

    #[test]
    #[ignore]
    fn short_jwt_secret_is_rejected() {
        std::env::set_var("DATABASE_URL", "postgres://test");
        std::env::set_var("JWT_SECRET", "too-short");

        assert!(Config::from_env().is_err());

        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
    }
}
