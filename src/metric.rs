//! Metric names and descriptions, registered once at startup. The binary
//! only wires the `metrics` facade; an exporter can be attached by the
//! embedding environment.

/// Alerts fired by the poller (threshold crossings).
pub const ALERTS_TOTAL: &str = "sentinel_alerts_total";

/// Per-endpoint delivery attempts, labelled by status.
pub const DELIVERIES_TOTAL: &str = "sentinel_deliveries_total";

/// Risk queries that failed, labelled by protocol.
pub const QUERY_FAILURES_TOTAL: &str = "sentinel_query_failures_total";

/// Completed poll cycles.
pub const POLL_CYCLES_TOTAL: &str = "sentinel_poll_cycles_total";

pub fn describe_metrics() {
    metrics::describe_counter!(ALERTS_TOTAL, "Total danger-threshold alerts fired");
    metrics::describe_counter!(DELIVERIES_TOTAL, "Total alert delivery attempts by status");
    metrics::describe_counter!(QUERY_FAILURES_TOTAL, "Total failed risk queries by protocol");
    metrics::describe_counter!(POLL_CYCLES_TOTAL, "Total completed poll cycles");
}
