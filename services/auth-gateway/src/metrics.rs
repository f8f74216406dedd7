//! Prometheus metrics exposition
//!
//! - `auth_flows_started_total` (counter)
//! - `auth_flows_completed_total` (counter): label `outcome`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// The handle's `render()` method produces the Prometheus text exposition
/// format suitable for serving on a `/metrics` endpoint.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record that an authorization attempt was started.
pub fn record_flow_started() {
    metrics::counter!("auth_flows_started_total").increment(1);
}

/// Record a completed authorization attempt with its outcome.
pub fn record_flow_outcome(verified: bool) {
    let outcome = if verified { "verified" } else { "rejected" };
    metrics::counter!("auth_flows_completed_total", "outcome" => outcome).increment(1);
}
