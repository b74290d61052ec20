use std::collections::VecDeque;

use chrono::Utc;
use uuid::Uuid;

use crate::config::AlertThresholds;
use crate::health::UnhealthyEndpoint;
use crate::models::{Alert, AlertKind, Severity};
use crate::scorer::DaScore;

pub const MAX_ALERTS: usize = 100;

/// Factor levels below which a round raises a warning.
const RPC_HEALTH_FLOOR: u8 = 10;
const RESPONSE_TIME_FLOOR: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
}

/// Newest-first alert log, capped at `capacity`.
#[derive(Debug)]
pub struct AlertManager {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(MAX_ALERTS)
    }
}

impl AlertManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn raise(&mut self, draft: AlertDraft) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            kind: draft.kind,
            message: draft.message,
            severity: draft.severity,
            timestamp: Utc::now(),
            acknowledged: false,
        };

        match alert.severity {
            Severity::Critical => tracing::error!("ALERT [CRITICAL]: {}", alert.message),
            Severity::Warning => tracing::warn!("ALERT [WARNING]: {}", alert.message),
            Severity::Info => tracing::info!("ALERT [INFO]: {}", alert.message),
        }

        self.alerts.push_front(alert.clone());
        self.alerts.truncate(self.capacity);
        alert
    }

    /// Returns false when no alert has this id.
    pub fn acknowledge(&mut self, id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn list(&self, unacknowledged_only: bool, limit: usize) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| !unacknowledged_only || !a.acknowledged)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

pub fn endpoint_alert(event: &UnhealthyEndpoint) -> AlertDraft {
    AlertDraft {
        kind: AlertKind::RpcFailure,
        message: format!(
            "RPC {} has {} consecutive failures",
            event.endpoint, event.consecutive_failures
        ),
        severity: Severity::Critical,
    }
}

/// Threshold checks run once per round against its score.
pub fn round_alerts(score: &DaScore, thresholds: &AlertThresholds) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    if score.total <= thresholds.critical_score {
        drafts.push(AlertDraft {
            kind: AlertKind::LowDaScore,
            message: format!("Critical DA score: {}/100 (Grade: {})", score.total, score.grade),
            severity: Severity::Critical,
        });
    } else if score.total <= thresholds.low_score {
        drafts.push(AlertDraft {
            kind: AlertKind::LowDaScore,
            message: format!("Low DA score: {}/100 (Grade: {})", score.total, score.grade),
            severity: Severity::Warning,
        });
    }

    let breakdown = score.factors.breakdown();
    if score.factors.rpc_health < RPC_HEALTH_FLOOR {
        drafts.push(AlertDraft {
            kind: AlertKind::RpcHealth,
            message: format!("Poor RPC health: {}", breakdown.rpc_health),
            severity: Severity::Warning,
        });
    }
    if score.factors.response_time < RESPONSE_TIME_FLOOR {
        drafts.push(AlertDraft {
            kind: AlertKind::HighLatency,
            message: format!("High response time detected: {}", breakdown.response_time),
            severity: Severity::Warning,
        });
    }

    drafts
}
