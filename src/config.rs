use std::time::Duration;

use serde::Deserialize;

use crate::{cache::CacheTtls, http::RetryPolicy};

/// Upper bound for `HTTP_MAX_RETRIES`
pub const MAX_HTTP_RETRIES: u32 = 10;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,

    /// Outbound TMDB requests per second
    #[serde(default = "default_tmdb_rate_limit")]
    pub tmdb_rate_limit: u32,

    /// OMDB API key
    pub omdb_api_key: String,

    /// OMDB API base URL
    #[serde(default = "default_omdb_base_url")]
    pub omdb_base_url: String,

    /// Outbound OMDB requests per second
    #[serde(default = "default_omdb_rate_limit")]
    pub omdb_rate_limit: u32,

    /// Inbound requests each client may make per minute
    #[serde(default = "default_inbound_rate_limit_per_minute")]
    pub inbound_rate_limit_per_minute: u32,

    /// Per-attempt timeout for outbound requests, in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_http_max_retries")]
    pub http_max_retries: u32,

    /// First retry delay in milliseconds, doubled after every retry
    #[serde(default = "default_http_initial_backoff_ms")]
    pub http_initial_backoff_ms: u64,

    /// Movie/TV details TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    /// Search results TTL in seconds
    #[serde(default = "default_search_cache_ttl")]
    pub search_cache_ttl: u64,

    /// Trending pool TTL in seconds
    #[serde(default = "default_trending_cache_ttl")]
    pub trending_cache_ttl: u64,

    /// Genre list TTL in seconds
    #[serde(default = "default_genres_cache_ttl")]
    pub genres_cache_ttl: u64,

    /// Recommendation and similar-movie TTL in seconds
    #[serde(default = "default_recommendations_cache_ttl")]
    pub recommendations_cache_ttl: u64,

    /// How often expired cache entries are swept, in seconds
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,

    /// Fallback log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_rate_limit() -> u32 {
    40
}

fn default_omdb_base_url() -> String {
    "http://www.omdbapi.com".to_string()
}

fn default_omdb_rate_limit() -> u32 {
    1000
}

fn default_inbound_rate_limit_per_minute() -> u32 {
    100
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_http_max_retries() -> u32 {
    3
}

fn default_http_initial_backoff_ms() -> u64 {
    1000
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_search_cache_ttl() -> u64 {
    1800
}

fn default_trending_cache_ttl() -> u64 {
    3600
}

fn default_genres_cache_ttl() -> u64 {
    86400
}

fn default_recommendations_cache_ttl() -> u64 {
    1800
}

fn default_cache_sweep_interval_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.tmdb_api_key.trim().is_empty() {
            anyhow::bail!("TMDB_API_KEY is required");
        }
        if self.omdb_api_key.trim().is_empty() {
            anyhow::bail!("OMDB_API_KEY is required");
        }
        if self.tmdb_rate_limit == 0 || self.omdb_rate_limit == 0 {
            anyhow::bail!("Rate limits must be at least 1 request per second");
        }
        if self.inbound_rate_limit_per_minute == 0 {
            anyhow::bail!("INBOUND_RATE_LIMIT_PER_MINUTE must be at least 1");
        }
        if self.http_max_retries > MAX_HTTP_RETRIES {
            anyhow::bail!("HTTP_MAX_RETRIES must be at most {}", MAX_HTTP_RETRIES);
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.http_max_retries,
            initial_backoff: Duration::from_millis(self.http_initial_backoff_ms),
        }
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs.max(1))
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            details: Duration::from_secs(self.cache_ttl),
            search: Duration::from_secs(self.search_cache_ttl),
            trending: Duration::from_secs(self.trending_cache_ttl),
            genres: Duration::from_secs(self.genres_cache_ttl),
            recommendations: Duration::from_secs(self.recommendations_cache_ttl),
        }
    }
}
