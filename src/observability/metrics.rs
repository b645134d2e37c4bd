//! Metrics exposition.
//!
//! # Metrics
//! - `breakwater_command_events_total` (counter): outcomes by command, event
//! - `breakwater_command_latency_ms` (histogram): work function wall time
//! - `breakwater_circuit_transitions_total` (counter): open / closed by command

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::metrics::Outcome;

/// Install a process-wide Prometheus recorder and return its handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::debug!("Prometheus recorder installed");
    Ok(handle)
}

pub fn record_event(command_key: &str, outcome: Outcome) {
    ::metrics::counter!(
        "breakwater_command_events_total",
        "command" => command_key.to_string(),
        "event" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_latency(command_key: &str, millis: i64) {
    ::metrics::histogram!(
        "breakwater_command_latency_ms",
        "command" => command_key.to_string()
    )
    .record(millis.max(0) as f64);
}

pub fn record_circuit_transition(command_key: &str, state: &'static str) {
    ::metrics::counter!(
        "breakwater_circuit_transitions_total",
        "command" => command_key.to_string(),
        "state" => state
    )
    .increment(1);
}
