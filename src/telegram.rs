// Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Third party imports
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

// Internal imports
use crate::config::Config;
use crate::error::DeliveryError;
use crate::messages;
use crate::registry::{SubscribeStatus, SubscriberRegistry, UnsubscribeStatus};
use crate::risk_client::RiskSource;
use crate::types::ChatEndpoint;

/// Long-poll window for getUpdates, seconds.
const UPDATE_POLL_SECS: u64 = 30;

/// The delivery primitive the broadcaster needs: send one text message to
/// one endpoint, asynchronously, possibly failing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    async fn send_message(&self, endpoint: ChatEndpoint, text: &str) -> Result<(), DeliveryError>;
}

// ==================== Bot API wire types ====================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

// ==================== Transport ====================

/// Telegram Bot API client over plain HTTPS, with optional outbound proxy.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            // Long polls must outlive the getUpdates window
            .timeout(Duration::from_secs(UPDATE_POLL_SECS + 10));

        if let Some(proxy_url) = config.proxy_url() {
            info!("using proxy: {}", proxy_url);
            builder = builder.proxy(reqwest::Proxy::all(&proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            api_base: format!("https://api.telegram.org/bot{}", config.bot_token),
        })
    }

    /// Probe the Bot API with getMe. A failure here is not fatal: the
    /// caller logs diagnostics and keeps the process running degraded so a
    /// transient network problem can recover.
    pub async fn probe(&self) -> Result<BotIdentity> {
        let response: ApiResponse<BotIdentity> = self
            .client
            .get(format!("{}/getMe", self.api_base))
            .send()
            .await
            .context("cannot reach api.telegram.org")?
            .json()
            .await
            .context("unexpected getMe response")?;

        if !response.ok {
            anyhow::bail!(
                "getMe rejected: {} ({})",
                response.description.unwrap_or_default(),
                response.error_code.unwrap_or_default()
            );
        }
        response.result.context("getMe returned no identity")
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response: ApiResponse<Vec<Update>> = self
            .client
            .get(format!("{}/getUpdates", self.api_base))
            .query(&[("offset", offset.to_string()), ("timeout", UPDATE_POLL_SECS.to_string())])
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            anyhow::bail!(
                "getUpdates rejected: {}",
                response.description.unwrap_or_default()
            );
        }
        Ok(response.result.unwrap_or_default())
    }
}

#[async_trait]
impl MessageTransport for TelegramTransport {
    async fn send_message(&self, endpoint: ChatEndpoint, text: &str) -> Result<(), DeliveryError> {
        let body = json!({
            "chat_id": endpoint.0,
            "text": text,
            "parse_mode": "Markdown",
        });

        let response = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let api: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        if api.ok {
            Ok(())
        } else {
            Err(DeliveryError::from_api_response(
                api.error_code.unwrap_or(0),
                api.description.as_deref().unwrap_or("unknown"),
                api.parameters.and_then(|p| p.retry_after),
            ))
        }
    }
}

// ==================== Command surface ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    About,
    Protocols,
    Risk(Option<String>),
    Subscribe,
    Unsubscribe,
}

/// Parse a message text into a bot command. Returns `None` for plain chat
/// messages and unrecognized commands.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut parts = text.trim().split_whitespace();
    let head = parts.next()?;
    if !head.starts_with('/') {
        return None;
    }
    // "/risk@SentinelBot" is the group-chat form
    let name = head[1..].split('@').next().unwrap_or_default();

    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "about" => Some(Command::About),
        "protocols" => Some(Command::Protocols),
        "risk" => Some(Command::Risk(parts.next().map(|s| s.to_string()))),
        "subscribe" => Some(Command::Subscribe),
        "unsubscribe" => Some(Command::Unsubscribe),
        _ => None,
    }
}

/// Thin glue between inbound commands and the engine: mutates the registry
/// for subscribe/unsubscribe and reuses the poller's query path for `/risk`.
pub struct CommandHandler {
    config: Arc<Config>,
    registry: Arc<SubscriberRegistry>,
    risk_source: Arc<dyn RiskSource>,
}

impl CommandHandler {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SubscriberRegistry>,
        risk_source: Arc<dyn RiskSource>,
    ) -> Self {
        Self {
            config,
            registry,
            risk_source,
        }
    }

    pub async fn reply_for(&self, endpoint: ChatEndpoint, text: &str) -> Option<String> {
        let command = parse_command(text)?;
        let reply = match command {
            Command::Start => messages::start_text(),
            Command::Help => messages::help_text(self.config.danger_threshold),
            Command::About => messages::about_text(),
            Command::Protocols => match self.risk_source.list_protocols().await {
                Ok(protocols) => messages::format_protocol_list(&protocols),
                Err(e) => {
                    warn!("protocol list fetch failed: {}", e);
                    "❌ Failed to fetch the protocol list".to_string()
                }
            },
            Command::Risk(protocol) => {
                let protocol = protocol.unwrap_or_else(|| self.config.default_protocol.clone());
                self.risk_reply(&protocol).await
            }
            Command::Subscribe => match self.registry.subscribe(endpoint) {
                SubscribeStatus::Added => {
                    info!("new subscriber: {}", endpoint);
                    messages::subscribed_text()
                }
                SubscribeStatus::AlreadySubscribed => messages::already_subscribed_text(),
            },
            Command::Unsubscribe => match self.registry.unsubscribe(endpoint) {
                UnsubscribeStatus::Removed => {
                    info!("subscriber left: {}", endpoint);
                    messages::unsubscribed_text()
                }
                UnsubscribeStatus::NotSubscribed => messages::not_subscribed_text(),
            },
        };
        Some(reply)
    }

    async fn risk_reply(&self, protocol: &str) -> String {
        match self.risk_source.query_risk(protocol).await {
            Ok(snapshot) => messages::format_risk_report(&snapshot),
            Err(e) => {
                warn!(protocol, "risk query failed: {}", e);
                messages::format_query_failure(protocol, &e)
            }
        }
    }
}

/// getUpdates long-poll loop dispatching commands until shutdown.
pub async fn run_command_loop(transport: Arc<TelegramTransport>, handler: Arc<CommandHandler>) {
    let mut offset = 0_i64;

    loop {
        let updates = match transport.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("getUpdates failed: {}, backing off", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text else { continue };
            let endpoint = ChatEndpoint(message.chat.id);

            if let Some(reply) = handler.reply_for(endpoint, &text).await {
                if let Err(e) = transport.send_message(endpoint, &reply).await {
                    error!("failed to reply to {}: {}", endpoint, e);
                }
            }
        }
    }
}

/// Operator guidance for a failed transport startup, mirroring the common
/// causes: no route to the Bot API, missing proxy, bad token.
pub fn log_startup_diagnostics(err: &anyhow::Error) {
    error!("bot startup failed: {:#}", err);
    error!("check the following:");
    error!("  1. network connectivity to api.telegram.org");
    error!("  2. proxy settings (TELEGRAM_PROXY_HOST / TELEGRAM_PROXY_PORT)");
    error!("  3. TELEGRAM_BOT_TOKEN validity (verify with @BotFather)");
    warn!("continuing in degraded mode; the transport may recover");
}
