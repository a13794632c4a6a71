// Standard library imports
use std::sync::Arc;

// Third party imports
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

// Internal imports
use crate::config::Config;
use crate::error::DeliveryError;
use crate::messages::format_alert;
use crate::metric;
use crate::registry::SubscriberRegistry;
use crate::telegram::MessageTransport;
use crate::types::{AlertEvent, ChatEndpoint};

/// Result of one delivery attempt to one endpoint.
#[derive(Debug)]
pub struct DeliveryOutcome {
    pub endpoint: ChatEndpoint,
    pub result: Result<(), DeliveryError>,
}

/// Fans one alert out to every current subscriber.
///
/// Deliveries run in parallel, bounded by a semaphore; a failure for one
/// endpoint never prevents attempts to the others, and no failure here
/// propagates as a process-level error.
pub struct AlertBroadcaster {
    config: Arc<Config>,
    registry: Arc<SubscriberRegistry>,
    transport: Arc<dyn MessageTransport>,
    delivery_permits: Arc<Semaphore>,
}

impl AlertBroadcaster {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SubscriberRegistry>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let delivery_permits = Arc::new(Semaphore::new(config.broadcast_concurrency.max(1)));
        Self {
            config,
            registry,
            transport,
            delivery_permits,
        }
    }

    /// Deliver `event` to every endpoint in the current registry snapshot.
    /// An empty snapshot is a no-op.
    pub async fn broadcast(&self, event: &AlertEvent) -> Vec<DeliveryOutcome> {
        let endpoints = self.registry.snapshot();
        if endpoints.is_empty() {
            return Vec::new();
        }

        info!(
            protocol = %event.protocol,
            risk_score = event.risk_score,
            subscribers = endpoints.len(),
            "broadcasting alert"
        );
        let text = format_alert(event);

        let attempts = endpoints.into_iter().map(|endpoint| {
            let transport = Arc::clone(&self.transport);
            let permits = Arc::clone(&self.delivery_permits);
            let text = text.clone();
            async move {
                let _permit = permits.acquire().await.ok();
                let result = transport.send_message(endpoint, &text).await;
                DeliveryOutcome { endpoint, result }
            }
        });

        let outcomes = join_all(attempts).await;
        self.record_outcomes(&outcomes);
        outcomes
    }

    fn record_outcomes(&self, outcomes: &[DeliveryOutcome]) {
        for outcome in outcomes {
            match &outcome.result {
                Ok(()) => {
                    metrics::increment_counter!(metric::DELIVERIES_TOTAL, "status" => "delivered");
                }
                Err(e) => {
                    metrics::increment_counter!(metric::DELIVERIES_TOTAL, "status" => "failed");
                    warn!(endpoint = %outcome.endpoint, "alert delivery failed: {}", e);

                    // Policy hook: a blocked recipient can never be reached
                    // again, so the operator may opt in to dropping it.
                    if self.config.unsubscribe_blocked
                        && matches!(e, DeliveryError::Blocked)
                    {
                        self.registry.unsubscribe(outcome.endpoint);
                        info!(endpoint = %outcome.endpoint, "removed blocked subscriber");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::MockMessageTransport;

    fn broadcaster_with(
        transport: MockMessageTransport,
        config: Config,
    ) -> (AlertBroadcaster, Arc<SubscriberRegistry>) {
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = AlertBroadcaster::new(
            Arc::new(config),
            Arc::clone(&registry),
            Arc::new(transport),
        );
        (broadcaster, registry)
    }

    #[tokio::test]
    async fn test_empty_registry_is_noop() {
        let mut transport = MockMessageTransport::new();
        transport.expect_send_message().times(0);
        let (broadcaster, _) = broadcaster_with(transport, Config::new());

        let outcomes = broadcaster.broadcast(&AlertEvent::new("Jupiter", 85)).await;
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_fanout_isolation() {
        // Delivery to endpoint 2 fails; 1 and 3 must still be attempted.
        let mut transport = MockMessageTransport::new();
        transport
            .expect_send_message()
            .times(3)
            .returning(|endpoint, _| {
                if endpoint == ChatEndpoint(2) {
                    Err(DeliveryError::Transport("connection reset".to_string()))
                } else {
                    Ok(())
                }
            });
        let (broadcaster, registry) = broadcaster_with(transport, Config::new());
        registry.subscribe(ChatEndpoint(1));
        registry.subscribe(ChatEndpoint(2));
        registry.subscribe(ChatEndpoint(3));

        let outcomes = broadcaster.broadcast(&AlertEvent::new("Jupiter", 85)).await;
        assert_eq!(outcomes.len(), 3);
        let delivered = outcomes.iter().filter(|o| o.result.is_ok()).count();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        assert_eq!(delivered, 2);
        assert_eq!(failed, 1);
        // Failures never remove subscribers by default
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_blocked_policy_disabled_by_default() {
        let mut transport = MockMessageTransport::new();
        transport
            .expect_send_message()
            .returning(|_, _| Err(DeliveryError::Blocked));
        let (broadcaster, registry) = broadcaster_with(transport, Config::new());
        registry.subscribe(ChatEndpoint(9));

        broadcaster.broadcast(&AlertEvent::new("Orca", 92)).await;
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_policy_unsubscribes_when_enabled() {
        let mut transport = MockMessageTransport::new();
        transport
            .expect_send_message()
            .returning(|endpoint, _| {
                if endpoint == ChatEndpoint(9) {
                    Err(DeliveryError::Blocked)
                } else {
                    Ok(())
                }
            });
        let mut config = Config::new();
        config.unsubscribe_blocked = true;
        let (broadcaster, registry) = broadcaster_with(transport, config);
        registry.subscribe(ChatEndpoint(8));
        registry.subscribe(ChatEndpoint(9));

        broadcaster.broadcast(&AlertEvent::new("Orca", 92)).await;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(), vec![ChatEndpoint(8)]);
    }

    #[tokio::test]
    async fn test_two_subscribers_two_attempts() {
        let mut transport = MockMessageTransport::new();
        transport
            .expect_send_message()
            .times(2)
            .returning(|_, _| Ok(()));
        let (broadcaster, registry) = broadcaster_with(transport, Config::new());
        registry.subscribe(ChatEndpoint(1));
        registry.subscribe(ChatEndpoint(2));

        let outcomes = broadcaster.broadcast(&AlertEvent::new("Jupiter", 85)).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
    }
}
