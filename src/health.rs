use chrono::{DateTime, Utc};

use crate::models::EndpointMetrics;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Raised when an endpoint fails at or beyond the consecutive-failure threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhealthyEndpoint {
    pub endpoint: String,
    pub consecutive_failures: u32,
}

/// Per-endpoint request bookkeeping. Metrics are cumulative for the life of
/// the process and never reset.
///
/// `average_response_time` is the arithmetic mean over every request ever
/// made, updated in O(1). Early samples keep their weight forever, so a long
/// running tracker reacts more slowly to recent latency changes.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    failure_threshold: u32,
    endpoints: Vec<EndpointMetrics>,
}

impl HealthTracker {
    pub fn new<S: AsRef<str>>(endpoints: &[S], failure_threshold: u32) -> Self {
        Self {
            failure_threshold,
            endpoints: endpoints
                .iter()
                .map(|e| EndpointMetrics::new(e.as_ref()))
                .collect(),
        }
    }

    pub fn record_outcome(
        &mut self,
        endpoint: &str,
        success: bool,
        latency_ms: f64,
    ) -> Option<UnhealthyEndpoint> {
        self.record_outcome_at(endpoint, success, latency_ms, Utc::now())
    }

    pub fn record_outcome_at(
        &mut self,
        endpoint: &str,
        success: bool,
        latency_ms: f64,
        now: DateTime<Utc>,
    ) -> Option<UnhealthyEndpoint> {
        let threshold = self.failure_threshold;
        let metrics = self.entry(endpoint);
        metrics.total_requests += 1;

        let mut event = None;
        if success {
            metrics.consecutive_failures = 0;
            metrics.last_success_time = Some(now);
            metrics.is_healthy = true;
        } else {
            metrics.failed_requests += 1;
            metrics.consecutive_failures += 1;
            if metrics.consecutive_failures >= threshold {
                metrics.is_healthy = false;
                event = Some(UnhealthyEndpoint {
                    endpoint: metrics.endpoint.clone(),
                    consecutive_failures: metrics.consecutive_failures,
                });
            }
        }

        let n = metrics.total_requests as f64;
        metrics.average_response_time =
            (metrics.average_response_time * (n - 1.0) + latency_ms) / n;

        event
    }

    pub fn get(&self, endpoint: &str) -> Option<&EndpointMetrics> {
        self.endpoints.iter().find(|m| m.endpoint == endpoint)
    }

    pub fn metrics(&self) -> &[EndpointMetrics] {
        &self.endpoints
    }

    pub fn snapshot(&self) -> Vec<EndpointMetrics> {
        self.endpoints.clone()
    }

    fn entry(&mut self, endpoint: &str) -> &mut EndpointMetrics {
        let idx = match self.endpoints.iter().position(|m| m.endpoint == endpoint) {
            Some(idx) => idx,
            None => {
                tracing::debug!("tracking previously unknown endpoint {}", endpoint);
                self.endpoints.push(EndpointMetrics::new(endpoint));
                self.endpoints.len() - 1
            }
        };
        &mut self.endpoints[idx]
    }
}
