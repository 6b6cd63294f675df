use std::net::SocketAddr;
use std::time::Instant;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: engine operations executed. Labels: op, status.
pub const OPERATIONS_TOTAL: &str = "campsite_operations_total";

/// Histogram: operation latency in seconds, lock wait included. Labels: op.
pub const OPERATION_DURATION_SECONDS: &str = "campsite_operation_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: reservations currently held in the index.
pub const RESERVATIONS_ACTIVE: &str = "campsite_reservations_active";

/// Gauge: free dates left in the calendar.
pub const FREE_DATES: &str = "campsite_free_dates";

/// Counter: reservations dropped by purge after their end date passed.
pub const PURGED_RESERVATIONS_TOTAL: &str = "campsite_purged_reservations_total";

/// Histogram: snapshot write duration in seconds.
pub const BACKUP_DURATION_SECONDS: &str = "campsite_backup_duration_seconds";

/// Counter: failed snapshot writes.
pub const BACKUP_FAILURES_TOTAL: &str = "campsite_backup_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::error!("failed to install Prometheus metrics exporter: {e}");
        return;
    }
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Record one finished engine operation.
pub fn record_operation(op: &'static str, status: &'static str, started: Instant) {
    metrics::counter!(OPERATIONS_TOTAL, "op" => op, "status" => status).increment(1);
    metrics::histogram!(OPERATION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}

/// Publish occupancy gauges.
pub fn record_occupancy(reservations: usize, free_dates: usize) {
    metrics::gauge!(RESERVATIONS_ACTIVE).set(reservations as f64);
    metrics::gauge!(FREE_DATES).set(free_dates as f64);
}
