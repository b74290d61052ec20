use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scorer::{Grade, ScoreBreakdown, ScoreFactors};

/// Latest block as reported by one endpoint at one sampling instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    /// Seconds since the epoch. `None` when the endpoint reported zero.
    pub timestamp: Option<u64>,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub transactions: Vec<String>,
    pub size: u64,
    pub miner: Option<String>,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub gas_price: Option<String>,
    pub gas: u64,
    pub block_number: Option<u64>,
    pub transaction_index: Option<u64>,
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointMetrics {
    pub endpoint: String,
    pub average_response_time: f64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub consecutive_failures: u32,
    pub last_success_time: Option<DateTime<Utc>>,
    pub is_healthy: bool,
}

impl EndpointMetrics {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            average_response_time: 0.0,
            total_requests: 0,
            failed_requests: 0,
            consecutive_failures: 0,
            last_success_time: None,
            is_healthy: true,
        }
    }

    /// Percentage of successful requests, rounded to one decimal. Zero before any request.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        let ok = (self.total_requests - self.failed_requests) as f64;
        (ok / self.total_requests as f64 * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkHealth {
    pub total_checks: u64,
    pub successful_checks: u64,
    pub last_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub endpoint: String,
    pub success: bool,
    pub block: Option<BlockSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Match,
    Mismatch,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxEndpointReport {
    pub endpoint: String,
    pub status: TxStatus,
    pub transaction: Option<TransactionSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxReport {
    pub tx_hash: String,
    pub consistent: bool,
    pub endpoints: Vec<TxEndpointReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundPerformance {
    pub total_sample_time_ms: u64,
    pub rpc_metrics: Vec<EndpointMetrics>,
}

/// Outcome of one sampling round.
#[derive(Debug, Clone, Serialize)]
pub struct SampleResult {
    pub timestamp: DateTime<Utc>,
    pub da_score: u8,
    pub grade: Grade,
    pub factors: ScoreFactors,
    pub breakdown: ScoreBreakdown,
    pub blocks: Vec<BlockReport>,
    pub sampled_txs: Vec<String>,
    pub tx_details: Vec<TxReport>,
    pub blocks_consistent: bool,
    pub performance: RoundPerformance,
    pub network_health: NetworkHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    RpcFailure,
    LowDaScore,
    RpcHealth,
    HighLatency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopologyNode {
    pub id: usize,
    pub label: String,
    pub status: &'static str,
    pub response_time: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopologyLink {
    pub from: usize,
    pub to: usize,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    pub nodes: Vec<TopologyNode>,
    pub connections: Vec<TopologyLink>,
}
