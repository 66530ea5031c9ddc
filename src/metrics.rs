/// Prometheus metrics for the authn core
///
/// Counts account provisioning outcomes, lifecycle transitions, issued
/// sessions and backend probe failures.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Accounts successfully created
    pub static ref ACCOUNTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "authn_accounts_created_total",
        "Total number of accounts created"
    )
    .unwrap();

    /// Account creation attempts rejected with validation errors
    pub static ref ACCOUNT_VALIDATION_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "authn_account_validation_failures_total",
        "Total number of account creations rejected by validation"
    )
    .unwrap();

    /// Archive and delete transitions that changed state
    pub static ref ACCOUNT_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "authn_account_transitions_total",
        "Total number of account lifecycle transitions",
        &["transition"]
    )
    .unwrap();

    /// Sessions issued
    pub static ref SESSIONS_ISSUED_TOTAL: IntCounter = register_int_counter!(
        "authn_sessions_issued_total",
        "Total number of sessions issued"
    )
    .unwrap();

    /// Failed liveness probes by backend
    pub static ref HEALTH_PROBE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "authn_health_probe_failures_total",
        "Total number of failed backend liveness probes",
        &["backend"]
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn render_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert metrics to string: {}", e))
}

/// Record an archive or delete that changed account state
pub fn record_transition(transition: &str) {
    ACCOUNT_TRANSITIONS_TOTAL
        .with_label_values(&[transition])
        .inc();
}

/// Record a failed backend liveness probe
pub fn record_probe_failure(backend: &str) {
    HEALTH_PROBE_FAILURES_TOTAL
        .with_label_values(&[backend])
        .inc();
}
