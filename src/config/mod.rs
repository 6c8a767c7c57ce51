//! Configuration module for the Kard backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Ceiling and window for one usage tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaConfig {
    pub ceiling: u32,
    pub window: Duration,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Per-caller quota for the generation endpoint
    pub generate_quota: QuotaConfig,
    /// Per-caller quota for every `/api` request
    pub rate_limit: QuotaConfig,
    /// How often expired usage records are dropped
    pub prune_interval: Duration,
    /// API key for the chat-completions backend; `None` disables generation
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
}

/// Configuration value that could not be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.var, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_addr = parse_var("KARD_BIND_ADDR", "127.0.0.1:8080")?;
        let log_level = env::var("KARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = parse_var("KARD_LOG_FORMAT", "pretty")?;

        let generate_quota = QuotaConfig {
            ceiling: parse_var("KARD_GENERATE_LIMIT", "5")?,
            window: Duration::from_secs(parse_var("KARD_GENERATE_WINDOW_SECS", "86400")?),
        };
        let rate_limit = QuotaConfig {
            ceiling: parse_var("KARD_RATE_LIMIT_MAX", "100")?,
            window: Duration::from_secs(parse_var("KARD_RATE_LIMIT_WINDOW_SECS", "900")?),
        };
        let prune_interval = Duration::from_secs(parse_var("KARD_PRUNE_INTERVAL_SECS", "300")?);
        if prune_interval.is_zero() {
            return Err(ConfigError {
                var: "KARD_PRUNE_INTERVAL_SECS",
                message: "must be greater than zero".to_string(),
            });
        }

        let openai_api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let openai_base_url = env::var("KARD_OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let openai_model =
            env::var("KARD_OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Ok(Self {
            bind_addr,
            log_level,
            log_format,
            generate_quota,
            rate_limit,
            prune_interval,
            openai_api_key,
            openai_base_url,
            openai_model,
        })
    }
}

fn parse_var<T>(var: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    raw.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        message: format!("'{}': {}", raw, e),
    })
}
