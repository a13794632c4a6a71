// Standard library imports
use std::fmt;

// Third party imports
use serde::{Deserialize, Serialize};

/// Opaque subscriber endpoint (Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatEndpoint(pub i64);

impl fmt::Display for ChatEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatEndpoint {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Alert level assigned by the scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertLevel::Low => "LOW",
            AlertLevel::Medium => "MEDIUM",
            AlertLevel::High => "HIGH",
            AlertLevel::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

/// On-chain metrics attached to a risk prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 24h trading volume in USD
    pub volume_24h: f64,
    /// Liquidity change over the window, as a fraction (-1.0..1.0)
    pub liquidity_change: f64,
    /// Number of whale-sized transfers observed
    pub whale_transfers: u32,
    /// Top-holder concentration, as a fraction (0.0..1.0)
    pub holder_concentration: f64,
}

/// One prediction from the risk-scoring service for one protocol.
///
/// Immutable once parsed; consumed for a threshold decision and message
/// formatting within a single poll cycle or command request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    /// Protocol name as known to the backend
    pub protocol: String,
    /// Risk score, 0-100, higher is more dangerous
    pub risk_score: u8,
    /// Alert level derived from the score
    pub alert_level: AlertLevel,
    /// Emoji matching the alert level
    pub alert_emoji: String,
    /// Sustainability score, 0-100
    pub sustainable_score: u8,
    /// Model confidence, 0.0-1.0
    pub confidence: f64,
    /// Backend timestamp (ISO-8601)
    pub timestamp: String,
    /// Raw on-chain metrics backing the prediction
    pub metrics: RiskMetrics,
}

/// Entry in the backend's supported-protocol list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub protocol_type: String,
    pub supported: bool,
}

/// Response envelope of `GET /api/protocols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolList {
    pub protocols: Vec<ProtocolInfo>,
    pub total: usize,
}

/// Transient "protocol P crossed the danger threshold at score S" event.
///
/// Constructed by the poller, consumed once by the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub protocol: String,
    pub risk_score: u8,
}

impl AlertEvent {
    pub fn new(protocol: impl Into<String>, risk_score: u8) -> Self {
        Self {
            protocol: protocol.into(),
            risk_score,
        }
    }
}
