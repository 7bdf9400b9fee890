//! Configuration management

use postboard_common::{PostboardError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Ingestion Configuration Constants
// ============================================================================

/// Default endpoint template selecting a user's post collection; the user id
/// is appended as the query value.
pub const DEFAULT_POSTS_URL: &str = "https://jsonplaceholder.typicode.com/posts?userId=";

/// Default endpoint template selecting a post's comment collection; the post
/// id is appended as the query value.
pub const DEFAULT_COMMENTS_URL: &str = "https://jsonplaceholder.typicode.com/comments?postId=";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/postboard";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint template for the post collection
    pub posts_url: String,

    /// Endpoint template for a post's comment collection
    pub comments_url: String,

    /// Optional request timeout in seconds; `None` leaves requests unbounded,
    /// so a hung remote call hangs only the worker that issued it
    pub timeout_secs: Option<u64>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            api: ApiConfig {
                posts_url: std::env::var("POSTBOARD_POSTS_URL")
                    .unwrap_or_else(|_| DEFAULT_POSTS_URL.to_string()),
                comments_url: std::env::var("POSTBOARD_COMMENTS_URL")
                    .unwrap_or_else(|_| DEFAULT_COMMENTS_URL.to_string()),
                timeout_secs: std::env::var("POSTBOARD_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.posts_url.is_empty() {
            return Err(PostboardError::Config(
                "Posts endpoint URL cannot be empty".to_string(),
            ));
        }

        if self.api.comments_url.is_empty() {
            return Err(PostboardError::Config(
                "Comments endpoint URL cannot be empty".to_string(),
            ));
        }

        if self.database.url.is_empty() {
            return Err(PostboardError::Config(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(PostboardError::Config(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(PostboardError::Config(format!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                posts_url: DEFAULT_POSTS_URL.to_string(),
                comments_url: DEFAULT_COMMENTS_URL.to_string(),
                timeout_secs: None,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.max_connections, 10);
        assert!(config.api.posts_url.ends_with("userId="));
        assert!(config.api.comments_url.ends_with("postId="));
    }

    #[test]
    fn test_validate_rejects_empty_posts_url() {
        let mut config = Config::default();
        config.api.posts_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_min_above_max() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }
}
