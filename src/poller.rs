// Standard library imports
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

// Third party imports
use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

// Internal imports
use crate::broadcaster::AlertBroadcaster;
use crate::config::Config;
use crate::metric;
use crate::registry::SubscriberRegistry;
use crate::risk_client::RiskSource;
use crate::types::AlertEvent;

/// Timer-driven poller: every interval, query the risk backend for each
/// watch-listed protocol and hand threshold crossings to the broadcaster.
///
/// Two states, idle and polling, guarded by an atomic flag: a tick that
/// fires while a cycle is still in flight is dropped, never run
/// concurrently against the same watch-list.
pub struct RiskPoller {
    config: Arc<Config>,
    registry: Arc<SubscriberRegistry>,
    risk_source: Arc<dyn RiskSource>,
    broadcaster: Arc<AlertBroadcaster>,
    polling: AtomicBool,
    /// Protocols whose last observed score was above the threshold; used
    /// for rising-edge suppression when `repeat_alerts` is off.
    above_threshold: RwLock<HashSet<String>>,
}

impl RiskPoller {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SubscriberRegistry>,
        risk_source: Arc<dyn RiskSource>,
        broadcaster: Arc<AlertBroadcaster>,
    ) -> Self {
        Self {
            config,
            registry,
            risk_source,
            broadcaster,
            polling: AtomicBool::new(false),
            above_threshold: RwLock::new(HashSet::new()),
        }
    }

    /// Run poll cycles until the task is aborted.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so startup does not
        // fire a cycle before the transport is up.
        interval.tick().await;

        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            threshold = self.config.danger_threshold,
            watch_list = ?self.config.watch_list,
            "risk poller started"
        );

        loop {
            interval.tick().await;
            self.try_poll_cycle().await;
        }
    }

    /// Run one cycle unless another is already in flight, in which case
    /// the tick is dropped.
    pub async fn try_poll_cycle(&self) {
        if self.polling.swap(true, Ordering::SeqCst) {
            warn!("previous poll cycle still running, dropping tick");
            return;
        }
        self.poll_cycle().await;
        self.polling.store(false, Ordering::SeqCst);
    }

    /// One pass over the watch-list. Per-protocol queries run concurrently
    /// and fail independently; a cycle with zero successes is not an error.
    async fn poll_cycle(&self) {
        if self.registry.is_empty() {
            debug!("no subscribers, skipping poll cycle");
            return;
        }

        debug!("running scheduled risk check");

        let queries = self.config.watch_list.iter().map(|protocol| {
            let risk_source = Arc::clone(&self.risk_source);
            async move { (protocol.as_str(), risk_source.query_risk(protocol).await) }
        });

        let mut events = Vec::new();
        for (protocol, result) in join_all(queries).await {
            match result {
                Ok(snapshot) => {
                    if let Some(event) = self.evaluate(protocol, snapshot.risk_score) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    metrics::increment_counter!(
                        metric::QUERY_FAILURES_TOTAL,
                        "protocol" => protocol.to_string()
                    );
                    warn!(protocol, "risk check failed: {}", e);
                }
            }
        }

        for event in events {
            metrics::increment_counter!(metric::ALERTS_TOTAL);
            self.broadcaster.broadcast(&event).await;
        }

        metrics::increment_counter!(metric::POLL_CYCLES_TOTAL);
    }

    /// Threshold decision for one successful snapshot. Fires on a score
    /// strictly greater than the danger threshold; with `repeat_alerts`
    /// off, only on the transition from below to above, re-arming once the
    /// score drops back.
    fn evaluate(&self, protocol: &str, risk_score: u8) -> Option<AlertEvent> {
        let mut high = self.above_threshold.write().unwrap_or_else(|e| e.into_inner());
        if risk_score <= self.config.danger_threshold {
            high.remove(protocol);
            return None;
        }

        let was_above = !high.insert(protocol.to_string());
        drop(high);

        if was_above && !self.config.repeat_alerts {
            return None;
        }
        Some(AlertEvent::new(protocol, risk_score))
    }
}
