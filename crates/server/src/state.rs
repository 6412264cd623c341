use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use metrics_exporter_prometheus::PrometheusHandle;
use plagcheck::{InMemoryStore, PlagiarismChecker};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Submission lifecycle and plagiarism checks
    pub checker: PlagiarismChecker,

    /// Renders `/metrics`; `None` when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state over an in-memory submission store
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = config
            .pipeline()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let checker = PlagiarismChecker::new(pipeline, Arc::new(InMemoryStore::new()))?;
        Ok(Self::with_checker(config, checker))
    }

    pub fn with_checker(config: ServerConfig, checker: PlagiarismChecker) -> Self {
        Self {
            config: Arc::new(config),
            checker,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub checks_in_flight: usize,
}
