use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerts::AlertManager;
use crate::config::{AlertThresholds, Config};
use crate::health::HealthTracker;
use crate::models::{
    Alert, EndpointMetrics, NetworkHealth, SampleResult, Topology, TopologyLink, TopologyNode,
};

pub const MAX_HISTORY: usize = 1000;

/// Everything the monitor mutates. Owned by exactly one task; see `monitor`.
#[derive(Debug)]
pub struct MonitorState {
    endpoints: Vec<String>,
    pub health: HealthTracker,
    pub network: NetworkHealth,
    pub alerts: AlertManager,
    history: VecDeque<SampleResult>,
    pub thresholds: AlertThresholds,
    pub tx_sample_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceView {
    pub rpc_metrics: Vec<EndpointMetrics>,
    pub network_health: NetworkHealth,
    pub recent_alerts: Vec<Alert>,
}

/// Sent to a dashboard when it first connects.
#[derive(Debug, Clone, Serialize)]
pub struct InitialView {
    pub historical_data: Vec<SampleResult>,
    pub alerts: Vec<Alert>,
    pub rpc_metrics: Vec<EndpointMetrics>,
    pub network_health: NetworkHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportView {
    pub export_date: DateTime<Utc>,
    pub historical_data: Vec<SampleResult>,
    pub alerts: Vec<Alert>,
    pub rpc_metrics: Vec<EndpointMetrics>,
    pub network_health: NetworkHealth,
}

impl MonitorState {
    pub fn new(config: &Config) -> Self {
        Self {
            endpoints: config.rpc_urls.clone(),
            health: HealthTracker::new(&config.rpc_urls, config.thresholds.consecutive_failures),
            network: NetworkHealth::default(),
            alerts: AlertManager::default(),
            history: VecDeque::new(),
            thresholds: config.thresholds,
            tx_sample_size: config.tx_sample_size,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Counts a finished round. A round succeeds when it scored above zero.
    pub fn record_check(&mut self, total_score: u8, at: DateTime<Utc>) {
        self.network.total_checks += 1;
        if total_score > 0 {
            self.network.successful_checks += 1;
        }
        self.network.last_check = Some(at);
    }

    pub fn push_history(&mut self, result: SampleResult) {
        self.history.push_front(result);
        self.history.truncate(MAX_HISTORY);
    }

    /// Newest first.
    pub fn history(&self, limit: usize) -> Vec<SampleResult> {
        self.history.iter().take(limit).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn performance(&self) -> PerformanceView {
        PerformanceView {
            rpc_metrics: self.health.snapshot(),
            network_health: self.network.clone(),
            recent_alerts: self.alerts.list(false, 10),
        }
    }

    pub fn initial_view(&self) -> InitialView {
        InitialView {
            historical_data: self.history(50),
            alerts: self.alerts.list(false, 20),
            rpc_metrics: self.health.snapshot(),
            network_health: self.network.clone(),
        }
    }

    pub fn export(&self) -> ExportView {
        ExportView {
            export_date: Utc::now(),
            historical_data: self.history(MAX_HISTORY),
            alerts: self.alerts.all(),
            rpc_metrics: self.health.snapshot(),
            network_health: self.network.clone(),
        }
    }

    pub fn topology(&self) -> Topology {
        let nodes: Vec<TopologyNode> = self
            .health
            .metrics()
            .iter()
            .enumerate()
            .map(|(id, m)| TopologyNode {
                id,
                label: m.endpoint.clone(),
                status: if m.is_healthy { "healthy" } else { "unhealthy" },
                response_time: m.average_response_time,
                success_rate: m.success_rate(),
            })
            .collect();

        let connections = if nodes.len() > 1 {
            (0..nodes.len())
                .map(|i| TopologyLink {
                    from: i,
                    to: (i + 1) % nodes.len(),
                    status: "active",
                })
                .collect()
        } else {
            Vec::new()
        };

        Topology { nodes, connections }
    }
}
