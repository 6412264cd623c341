//! Prometheus export for engine metrics.
//!
//! [`PrometheusEngineMetrics`] forwards the engine's extraction and check
//! observations to the `metrics` facade; the installed Prometheus recorder
//! renders them at `/metrics`.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use plagcheck::{EngineError, EngineMetrics};

/// Engine observer that records through the `metrics` macros.
#[derive(Debug, Default)]
pub struct PrometheusEngineMetrics;

impl EngineMetrics for PrometheusEngineMetrics {
    fn record_extraction(&self, latency: Duration, result: Result<(), EngineError>) {
        let outcome = outcome_label(&result);
        counter!("plagcheck_extractions_total", "outcome" => outcome).increment(1);
        histogram!("plagcheck_extraction_seconds").record(latency.as_secs_f64());
    }

    fn record_check(&self, latency: Duration, result: Result<(), EngineError>) {
        let outcome = outcome_label(&result);
        counter!("plagcheck_checks_total", "outcome" => outcome).increment(1);
        histogram!("plagcheck_check_seconds").record(latency.as_secs_f64());
    }

    fn record_comparisons(&self, count: usize) {
        histogram!("plagcheck_check_comparisons").record(count as f64);
    }
}

fn outcome_label(result: &Result<(), EngineError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(err) => err.code(),
    }
}

/// Install the global Prometheus recorder and route engine metrics to it.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    plagcheck::set_engine_metrics(Some(Arc::new(PrometheusEngineMetrics)));
    Ok(handle)
}
