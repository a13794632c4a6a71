//! Message formatting for the Telegram surface. Pure functions only: no
//! I/O here, so every template is testable without a transport.

use chrono::DateTime;

use crate::error::QueryError;
use crate::types::{AlertEvent, ProtocolInfo, RiskSnapshot};

/// Render the backend's ISO-8601 timestamp for display, passing it through
/// unchanged if it does not parse.
fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&chrono::Utc)
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}

/// Broadcast text for a danger-threshold crossing.
pub fn format_alert(event: &AlertEvent) -> String {
    format!(
        "🚨 *High risk alert!*\n\n\
         *Protocol:* {}\n\
         *Risk score:* {}/100\n\n\
         Check your positions and consider exiting!\n\n\
         Details: /risk {}",
        event.protocol, event.risk_score, event.protocol
    )
}

/// Full risk report for the on-demand `/risk` command.
pub fn format_risk_report(snap: &RiskSnapshot) -> String {
    let risk_desc = if snap.risk_score < 30 {
        "Low risk, relatively safe"
    } else if snap.risk_score < 70 {
        "Medium risk, use with caution"
    } else if snap.risk_score < 90 {
        "High risk, consider exiting"
    } else {
        "Extreme risk, exit immediately!"
    };

    let esg_desc = if snap.sustainable_score >= 85 {
        "🌟 Very green"
    } else if snap.sustainable_score >= 70 {
        "🌿 Fairly green"
    } else {
        "⚡ Moderate energy use"
    };

    let warning = if snap.risk_score > 70 {
        "\n\n⚠️ *Advice: reduce your position or exit*"
    } else {
        ""
    };

    format!(
        "{} *{} risk analysis*\n\n\
         *Risk score:* `{}/100`\n\
         *Alert level:* {}\n\
         *Assessment:* {}\n\n\
         *Green score:* `{}/100` {}\n\n\
         *On-chain metrics:*\n\
         • 24h volume: ${:.2}M\n\
         • Liquidity change: {:.1}%\n\
         • Whale transfers: {}\n\
         • Holder concentration: {:.1}%\n\n\
         *Updated:* {}{}",
        snap.alert_emoji,
        snap.protocol,
        snap.risk_score,
        snap.alert_level,
        risk_desc,
        snap.sustainable_score,
        esg_desc,
        snap.metrics.volume_24h / 1_000_000.0,
        snap.metrics.liquidity_change * 100.0,
        snap.metrics.whale_transfers,
        snap.metrics.holder_concentration * 100.0,
        format_timestamp(&snap.timestamp),
        warning
    )
}

/// Human-readable failure text for a `/risk` command, distinguishing a
/// backend rejection (unknown protocol) from an unreachable backend.
pub fn format_query_failure(protocol: &str, err: &QueryError) -> String {
    if err.is_backend_rejection() {
        format!(
            "❌ The backend rejected the query for *{}*.\n\n\
             The protocol name may be wrong. Try /protocols for the supported list.",
            protocol
        )
    } else {
        "❌ Query failed, please retry later.\n\n\
         Possible causes:\n\
         • Backend service is down\n\
         • Network connectivity problem"
            .to_string()
    }
}

pub fn format_protocol_list(protocols: &[ProtocolInfo]) -> String {
    let mut message = String::from("📋 *Supported DeFi protocols:*\n\n");
    for (index, p) in protocols.iter().enumerate() {
        let status = if p.supported { "✅" } else { "🔜" };
        message.push_str(&format!(
            "{}. {} *{}* - {}\n",
            index + 1,
            status,
            p.name,
            p.protocol_type
        ));
    }
    message.push_str("\nUse /risk <protocol> to query risk");
    message
}

pub fn start_text() -> String {
    "🧠 *Welcome to Prophet Sentinel!*\n\n\
     I am your DeFi risk sentinel, providing real-time on-chain risk predictions.\n\n\
     📌 *Commands:*\n\
     /risk <protocol> - query protocol risk\n\
     /protocols - list supported protocols\n\
     /subscribe - subscribe to high-risk alerts\n\
     /unsubscribe - cancel the subscription\n\
     /help - show help\n\n\
     💡 *Examples:*\n\
     /risk Jupiter\n\
     /risk Orca\n\n\
     Let's guard your DeFi assets! 🛡️"
        .to_string()
}

pub fn help_text(danger_threshold: u8) -> String {
    format!(
        "🔧 *Command help*\n\n\
         *Risk query:*\n\
         /risk <protocol> - query the risk score of a protocol\n\
         e.g. /risk Jupiter\n\n\
         *Protocol list:*\n\
         /protocols - show all supported DeFi protocols\n\n\
         *Alert subscription:*\n\
         /subscribe - subscribe to alerts (risk score > {} is pushed automatically)\n\
         /unsubscribe - cancel the subscription\n\n\
         *Other:*\n\
         /help - show this help\n\
         /about - about Prophet Sentinel\n\n\
         ⚡ *Risk levels:*\n\
         🟢 0-30: low risk\n\
         🟡 30-70: medium risk\n\
         🔴 70-100: high risk",
        danger_threshold
    )
}

pub fn about_text() -> String {
    "🧠 *Prophet Sentinel*\n\n\
     AI-driven DeFi risk prediction system\n\n\
     *Core features:*\n\
     • 🎯 Real-time risk prediction (0-100)\n\
     • 🌱 ESG green scoring\n\
     • 🔒 Privacy-preserving analysis\n\
     • ⚡ Instant alert push\n\n\
     Version: v1.0.0"
        .to_string()
}

pub fn subscribed_text() -> String {
    "✅ *Subscribed!*\n\n\
     I will notify you immediately when:\n\
     • a protocol's risk score crosses the danger threshold\n\
     • liquidity drops sharply\n\
     • unusual whale activity is detected\n\n\
     You can /unsubscribe at any time."
        .to_string()
}

pub fn already_subscribed_text() -> String {
    "⚠️ You are already subscribed to high-risk alerts".to_string()
}

pub fn unsubscribed_text() -> String {
    "✅ Alert subscription cancelled".to_string()
}

pub fn not_subscribed_text() -> String {
    "⚠️ You are not subscribed to alerts".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertLevel, RiskMetrics};

    fn sample_snapshot(risk_score: u8) -> RiskSnapshot {
        RiskSnapshot {
            protocol: "Jupiter".to_string(),
            risk_score,
            alert_level: AlertLevel::High,
            alert_emoji: "⚠️".to_string(),
            sustainable_score: 72,
            confidence: 0.85,
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
            metrics: RiskMetrics {
                volume_24h: 12_500_000.0,
                liquidity_change: -0.123,
                whale_transfers: 7,
                holder_concentration: 0.418,
            },
        }
    }

    #[test]
    fn test_format_alert() {
        let text = format_alert(&AlertEvent::new("Jupiter", 85));
        assert!(text.contains("*Protocol:* Jupiter"));
        assert!(text.contains("*Risk score:* 85/100"));
        assert!(text.contains("/risk Jupiter"));
    }

    #[test]
    fn test_format_risk_report_metrics() {
        let text = format_risk_report(&sample_snapshot(85));
        assert!(text.contains("`85/100`"));
        assert!(text.contains("24h volume: $12.50M"));
        assert!(text.contains("Liquidity change: -12.3%"));
        assert!(text.contains("Whale transfers: 7"));
        assert!(text.contains("Holder concentration: 41.8%"));
        assert!(text.contains("Advice: reduce your position"));
    }

    #[test]
    fn test_format_risk_report_no_warning_below_70() {
        let text = format_risk_report(&sample_snapshot(50));
        assert!(!text.contains("Advice"));
        assert!(text.contains("Medium risk"));
    }

    #[test]
    fn test_format_query_failure_distinguishes_rejection() {
        let rejection = QueryError::Backend {
            protocol: "Nope".to_string(),
            status: 404,
        };
        let unreachable = QueryError::Timeout {
            protocol: "Jupiter".to_string(),
        };
        assert!(format_query_failure("Nope", &rejection).contains("protocol name may be wrong"));
        assert!(format_query_failure("Jupiter", &unreachable).contains("Backend service is down"));
    }

    #[test]
    fn test_format_protocol_list() {
        let protocols = vec![
            ProtocolInfo {
                name: "Jupiter".to_string(),
                protocol_type: "DEX Aggregator".to_string(),
                supported: true,
            },
            ProtocolInfo {
                name: "Mango".to_string(),
                protocol_type: "Perps".to_string(),
                supported: false,
            },
        ];
        let text = format_protocol_list(&protocols);
        assert!(text.contains("1. ✅ *Jupiter* - DEX Aggregator"));
        assert!(text.contains("2. 🔜 *Mango* - Perps"));
    }

    #[test]
    fn test_help_text_embeds_threshold() {
        assert!(help_text(80).contains("risk score > 80"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2025-01-01T08:30:00+08:00"),
            "2025-01-01 00:30:00 UTC"
        );
        // Unparseable input passes through untouched
        assert_eq!(format_timestamp("soon"), "soon");
    }
}
