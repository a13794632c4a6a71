use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use dotenv::dotenv;
use tracing::warn;

/// Runtime configuration, sourced from the environment with per-field
/// defaults. Missing optional vars fall back; only the bot token has no
/// usable default (an empty token puts the transport in degraded mode).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    // Transport
    pub bot_token: String,
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,

    // Risk-scoring backend
    pub api_base: String,
    pub query_timeout: Duration,
    pub default_protocol: String,

    // Poller
    pub watch_list: Vec<String>,
    pub poll_interval: Duration,
    pub danger_threshold: u8,
    /// true = re-broadcast every cycle while the score stays above the
    /// threshold (original behavior); false = rising edge only
    pub repeat_alerts: bool,

    // Broadcaster
    pub broadcast_concurrency: usize,
    /// Drop a subscriber whose endpoint reports the bot as blocked
    pub unsubscribe_blocked: bool,
}

impl Config {
    pub fn new() -> Self {
        Self {
            bot_token: String::new(),
            proxy_host: None,
            proxy_port: None,
            api_base: "http://localhost:5001".to_string(),
            query_timeout: Duration::from_secs(5),
            default_protocol: "Jupiter".to_string(),
            watch_list: vec![
                "Jupiter".to_string(),
                "Orca".to_string(),
                "Raydium".to_string(),
                "Serum".to_string(),
            ],
            poll_interval: Duration::from_secs(300),
            danger_threshold: 80,
            repeat_alerts: true,
            broadcast_concurrency: 64,
            unsubscribe_blocked: false,
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = Config::new();

        Ok(Config {
            bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            proxy_host: env::var("TELEGRAM_PROXY_HOST").ok(),
            proxy_port: env::var("TELEGRAM_PROXY_PORT")
                .ok()
                .and_then(|v| v.parse().ok()),
            api_base: env::var("BACKEND_API_URL").unwrap_or(defaults.api_base),
            query_timeout: Duration::from_secs(
                env::var("QUERY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            ),
            default_protocol: env::var("DEFAULT_PROTOCOL").unwrap_or(defaults.default_protocol),
            watch_list: env::var("WATCH_LIST")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.watch_list),
            poll_interval: Duration::from_secs(
                env::var("POLL_INTERVAL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
            ),
            danger_threshold: env::var("DANGER_THRESHOLD")
                .unwrap_or_else(|_| "80".to_string())
                .parse()
                .unwrap_or(80),
            repeat_alerts: env::var("REPEAT_ALERTS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            broadcast_concurrency: env::var("BROADCAST_CONCURRENCY")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .unwrap_or(64),
            unsubscribe_blocked: env::var("UNSUBSCRIBE_BLOCKED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        })
    }

    /// Proxy URL for the transport client, if both host and port are set.
    pub fn proxy_url(&self) -> Option<String> {
        match (&self.proxy_host, self.proxy_port) {
            (Some(host), Some(port)) => Some(format!("http://{}:{}", host, port)),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration, falling back to defaults on error.
pub fn init_config() -> Arc<Config> {
    match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            warn!("failed to load config from environment: {}, using defaults", e);
            Arc::new(Config::new())
        }
    }
}
