//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub feed: FeedConfig,
    pub votes: VoteConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Remote data gateway (PostgREST) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Project URL (e.g., "https://abc.supabase.co")
    pub url: String,
    /// Anonymous API key sent as `apikey` and bearer token
    pub anon_key: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Database schema exposed by the REST endpoint (default: "public")
    pub schema: String,
}

impl GatewayConfig {
    /// Base URL of the REST endpoint
    ///
    /// # Returns
    /// URL like "https://abc.supabase.co/rest/v1"
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Plain http to a host other than loopback
    pub fn is_insecure(&self) -> bool {
        url::Url::parse(&self.url).is_ok_and(|parsed| {
            parsed.scheme() == "http" && !is_local_host(parsed.host_str().unwrap_or_default())
        })
    }
}

/// Feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Items requested per page (default: 20)
    pub page_size: usize,
    /// Size of the top prompts view (default: 10)
    pub top_limit: usize,
}

/// Session vote configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VoteConfig {
    /// Cooldown before a session may vote on the same prompt again (default: 300)
    pub cooldown_seconds: u64,
}

impl VoteConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Local persisted storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the filter and session vote blobs
    pub dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("promptscroll={}", self.level.to_ascii_lowercase())
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (PROMPTSCROLL__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("gateway.timeout_seconds", 30)?
            .set_default("gateway.schema", "public")?
            .set_default("feed.page_size", 20)?
            .set_default("feed.top_limit", 10)?
            .set_default("votes.cooldown_seconds", 300)?
            .set_default("storage.dir", ".promptscroll")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (PROMPTSCROLL__*)
            .add_source(
                Environment::with_prefix("PROMPTSCROLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        let parsed = url::Url::parse(&self.gateway.url)
            .map_err(|e| AppError::Config(format!("gateway.url is not a valid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "gateway.url must use http or https".to_string(),
            ));
        }

        if self.gateway.anon_key.trim().is_empty() {
            return Err(AppError::Config(
                "gateway.anon_key must not be empty".to_string(),
            ));
        }

        if self.gateway.timeout_seconds == 0 {
            return Err(AppError::Config(
                "gateway.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.feed.page_size == 0 {
            return Err(AppError::Config(
                "feed.page_size must be greater than 0".to_string(),
            ));
        }

        if self.votes.cooldown_seconds == 0 {
            return Err(AppError::Config(
                "votes.cooldown_seconds must be greater than 0".to_string(),
            ));
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {})",
                self.logging.level
            )));
        }

        if !matches!(
            self.logging.format.to_ascii_lowercase().as_str(),
            "pretty" | "json"
        ) {
            return Err(AppError::Config(format!(
                "logging.format must be pretty or json (got {})",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<std::net::IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
