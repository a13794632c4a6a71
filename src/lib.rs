// Public modules
pub mod broadcaster;
pub mod config;
pub mod error;
pub mod messages;
pub mod metric;
pub mod poller;
pub mod registry;
pub mod risk_client;
pub mod telegram;
pub mod types;

// Re-export core types
pub use broadcaster::{AlertBroadcaster, DeliveryOutcome};
pub use config::{init_config, Config};
pub use error::{DeliveryError, QueryError};
pub use poller::RiskPoller;
pub use registry::{SubscribeStatus, SubscriberRegistry, UnsubscribeStatus};
pub use risk_client::{HttpRiskClient, RiskSource};
pub use telegram::{CommandHandler, MessageTransport, TelegramTransport};
pub use types::{AlertEvent, ChatEndpoint, ProtocolInfo, RiskMetrics, RiskSnapshot};
