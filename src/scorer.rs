//! Data-availability score: a 0-100 composite built from seven factors.
//!
//! | factor              | range  |
//! |---------------------|--------|
//! | block consistency   | 0..25  |
//! | tx consistency      | 0..20  |
//! | rpc health          | 0..20  |
//! | response time       | 0..15  |
//! | network reliability | 0..10  |
//! | data freshness      | 0..5   |
//! | error penalty       | -5..0  |
//!
//! The scorer is a pure function of its inputs and the supplied clock.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::consistency::{block_majority, blocks_consistent, tx_consistent};
use crate::models::{BlockSnapshot, EndpointMetrics, NetworkHealth, TransactionSnapshot};

pub const MAX_BLOCK_CONSISTENCY: u8 = 25;
pub const MAX_TX_CONSISTENCY: u8 = 20;
pub const MAX_RPC_HEALTH: u8 = 20;
pub const MAX_RESPONSE_TIME: u8 = 15;
pub const MAX_NETWORK_RELIABILITY: u8 = 10;
pub const MAX_DATA_FRESHNESS: u8 = 5;
pub const MAX_ERROR_PENALTY: i8 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreFactors {
    pub block_consistency: u8,
    pub tx_consistency: u8,
    pub rpc_health: u8,
    pub response_time: u8,
    pub network_reliability: u8,
    pub data_freshness: u8,
    pub error_penalty: i8,
}

impl ScoreFactors {
    pub fn sum(&self) -> i32 {
        self.block_consistency as i32
            + self.tx_consistency as i32
            + self.rpc_health as i32
            + self.response_time as i32
            + self.network_reliability as i32
            + self.data_freshness as i32
            + self.error_penalty as i32
    }

    pub fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            block_consistency: format!("{}/{}", self.block_consistency, MAX_BLOCK_CONSISTENCY),
            tx_consistency: format!("{}/{}", self.tx_consistency, MAX_TX_CONSISTENCY),
            rpc_health: format!("{}/{}", self.rpc_health, MAX_RPC_HEALTH),
            response_time: format!("{}/{}", self.response_time, MAX_RESPONSE_TIME),
            network_reliability: format!(
                "{}/{}",
                self.network_reliability, MAX_NETWORK_RELIABILITY
            ),
            data_freshness: format!("{}/{}", self.data_freshness, MAX_DATA_FRESHNESS),
            error_penalty: format!("{}/0", self.error_penalty),
        }
    }
}

/// Human-readable "points/max" rendering of each factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub block_consistency: String,
    pub tx_consistency: String,
    pub rpc_health: String,
    pub response_time: String,
    pub network_reliability: String,
    pub data_freshness: String,
    pub error_penalty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(total: u8) -> Self {
        match total {
            90.. => Grade::APlus,
            80..=89 => Grade::A,
            70..=79 => Grade::B,
            60..=69 => Grade::C,
            50..=59 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaScore {
    pub total: u8,
    pub factors: ScoreFactors,
    pub grade: Grade,
}

pub fn score(
    blocks: &[Option<BlockSnapshot>],
    tx_results: &[Vec<Option<TransactionSnapshot>>],
    metrics: &[EndpointMetrics],
    network: &NetworkHealth,
    now: DateTime<Utc>,
) -> DaScore {
    let factors = ScoreFactors {
        block_consistency: block_consistency_factor(blocks),
        tx_consistency: tx_consistency_factor(tx_results),
        rpc_health: rpc_health_factor(metrics),
        response_time: response_time_factor(metrics),
        network_reliability: network_reliability_factor(network),
        data_freshness: data_freshness_factor(blocks, now),
        error_penalty: error_penalty_factor(metrics),
    };
    let total = factors.sum().clamp(0, 100) as u8;
    DaScore {
        total,
        factors,
        grade: Grade::from_score(total),
    }
}

fn scaled(max: u8, part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    (max as usize * part / whole) as u8
}

fn block_consistency_factor(blocks: &[Option<BlockSnapshot>]) -> u8 {
    if blocks_consistent(blocks) {
        return MAX_BLOCK_CONSISTENCY;
    }
    let (majority, present) = block_majority(blocks);
    scaled(MAX_BLOCK_CONSISTENCY, majority, present)
}

fn tx_consistency_factor(tx_results: &[Vec<Option<TransactionSnapshot>>]) -> u8 {
    if tx_results.is_empty() {
        return MAX_TX_CONSISTENCY;
    }
    let consistent = tx_results.iter().filter(|set| tx_consistent(set)).count();
    scaled(MAX_TX_CONSISTENCY, consistent, tx_results.len())
}

fn rpc_health_factor(metrics: &[EndpointMetrics]) -> u8 {
    let healthy = metrics.iter().filter(|m| m.is_healthy).count();
    scaled(MAX_RPC_HEALTH, healthy, metrics.len())
}

fn response_time_factor(metrics: &[EndpointMetrics]) -> u8 {
    if metrics.is_empty() {
        return 0;
    }
    let avg = metrics.iter().map(|m| m.average_response_time).sum::<f64>() / metrics.len() as f64;
    match avg {
        a if a < 500.0 => 15,
        a if a < 1000.0 => 12,
        a if a < 2000.0 => 8,
        a if a < 5000.0 => 4,
        _ => 0,
    }
}

fn network_reliability_factor(network: &NetworkHealth) -> u8 {
    scaled(
        MAX_NETWORK_RELIABILITY,
        network.successful_checks as usize,
        network.total_checks as usize,
    )
}

fn data_freshness_factor(blocks: &[Option<BlockSnapshot>], now: DateTime<Utc>) -> u8 {
    let Some(latest) = blocks.iter().flatten().filter_map(|b| b.timestamp).max() else {
        return 0;
    };
    let latest_ms = i64::try_from(latest).unwrap_or(i64::MAX).saturating_mul(1000);
    let age_ms = now.timestamp_millis().saturating_sub(latest_ms);
    match age_ms {
        a if a < 30_000 => 5,
        a if a < 60_000 => 4,
        a if a < 300_000 => 2,
        _ => 0,
    }
}

/// `floor(-5 * failed / total)` over cumulative counters.
fn error_penalty_factor(metrics: &[EndpointMetrics]) -> i8 {
    let total: u64 = metrics.iter().map(|m| m.total_requests).sum();
    if total == 0 {
        return 0;
    }
    let failed: u64 = metrics.iter().map(|m| m.failed_requests).sum::<u64>().min(total);
    // floor(-x) == -ceil(x)
    let ceil = (5 * failed + total - 1) / total;
    -(ceil as i8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn block(hash: &str, ts: Option<u64>) -> Option<BlockSnapshot> {
        Some(BlockSnapshot {
            number: 100,
            hash: hash.to_string(),
            parent_hash: "0x99".to_string(),
            timestamp: ts,
            gas_used: 0,
            gas_limit: 0,
            transactions: Vec::new(),
            size: 0,
            miner: None,
            difficulty: "0".to_string(),
        })
    }

    fn tx(hash: &str) -> Option<TransactionSnapshot> {
        Some(TransactionSnapshot {
            hash: hash.to_string(),
            from: "0xf".to_string(),
            to: None,
            value: "0".to_string(),
            gas_price: None,
            gas: 0,
            block_number: None,
            transaction_index: None,
            nonce: 0,
        })
    }

    fn healthy(url: &str, avg: f64) -> EndpointMetrics {
        EndpointMetrics {
            average_response_time: avg,
            total_requests: 1,
            ..EndpointMetrics::new(url)
        }
    }

    fn network(total: u64, ok: u64) -> NetworkHealth {
        NetworkHealth {
            total_checks: total,
            successful_checks: ok,
            last_check: None,
        }
    }

    #[test]
    fn perfect_round_tops_out_at_95() {
        let ts = Some(now().timestamp() as u64);
        let blocks = vec![block("0xA", ts), block("0xA", ts)];
        let metrics = vec![healthy("a", 200.0), healthy("b", 200.0)];

        let s = score(&blocks, &[], &metrics, &network(1, 1), now());
        assert_eq!(
            s.factors,
            ScoreFactors {
                block_consistency: 25,
                tx_consistency: 20,
                rpc_health: 20,
                response_time: 15,
                network_reliability: 10,
                data_freshness: 5,
                error_penalty: 0,
            }
        );
        // the factor maxima sum to 95, so 100 is never reached
        assert_eq!(s.total, 95);
        assert_eq!(s.grade, Grade::APlus);
    }

    #[test]
    fn no_blocks_zeroes_consistency_and_freshness() {
        let s = score(&[None, None], &[], &[], &NetworkHealth::default(), now());
        assert_eq!(s.factors.block_consistency, 0);
        assert_eq!(s.factors.data_freshness, 0);
        assert_eq!(s.factors.tx_consistency, 20);
        assert_eq!(s.factors.rpc_health, 0);
        assert_eq!(s.factors.response_time, 0);
        assert_eq!(s.factors.network_reliability, 0);
        assert_eq!(s.total, 20);
        assert_eq!(s.grade, Grade::F);
    }

    #[test]
    fn partial_block_agreement_floors() {
        let blocks = vec![block("0xA", None), block("0xA", None), block("0xB", None)];
        let s = score(&blocks, &[], &[], &NetworkHealth::default(), now());
        assert_eq!(s.factors.block_consistency, 16);
    }

    #[test]
    fn tx_factor_counts_consistent_sets() {
        let results = vec![
            vec![tx("0x1"), tx("0x1")],
            vec![None, None],
            vec![tx("0x3"), None],
        ];
        let s = score(&[], &results, &[], &NetworkHealth::default(), now());
        assert_eq!(s.factors.tx_consistency, 13);
    }

    #[test]
    fn one_of_two_healthy_halves_rpc_health() {
        let mut down = healthy("b", 5000.0);
        down.is_healthy = false;
        let metrics = vec![healthy("a", 100.0), down];
        let s = score(&[], &[], &metrics, &NetworkHealth::default(), now());
        assert_eq!(s.factors.rpc_health, 10);
    }

    #[test]
    fn response_time_tiers() {
        let cases = [
            (499.0, 15),
            (500.0, 12),
            (999.0, 12),
            (1000.0, 8),
            (1999.0, 8),
            (2000.0, 4),
            (4999.0, 4),
            (5000.0, 0),
        ];
        for (avg, expected) in cases {
            assert_eq!(response_time_factor(&[healthy("a", avg)]), expected, "avg {avg}");
        }
        // mean of means
        assert_eq!(
            response_time_factor(&[healthy("a", 100.0), healthy("b", 1100.0)]),
            12
        );
    }

    #[test]
    fn freshness_tiers() {
        let at = |age: i64| {
            let ts = Some((now().timestamp() - age) as u64);
            data_freshness_factor(&[block("0xA", ts)], now())
        };
        assert_eq!(at(0), 5);
        assert_eq!(at(29), 5);
        assert_eq!(at(30), 4);
        assert_eq!(at(59), 4);
        assert_eq!(at(60), 2);
        assert_eq!(at(299), 2);
        assert_eq!(at(300), 0);
        assert_eq!(data_freshness_factor(&[block("0xA", None)], now()), 0);
    }

    #[test]
    fn freshness_uses_newest_block() {
        let old = Some((now().timestamp() - 1000) as u64);
        let fresh = Some((now().timestamp() - 10) as u64);
        let blocks = vec![block("0xA", old), None, block("0xB", fresh)];
        assert_eq!(data_freshness_factor(&blocks, now()), 5);
    }

    #[test]
    fn error_penalty_floors_towards_minus_five() {
        let with = |total: u64, failed: u64| {
            let m = EndpointMetrics {
                total_requests: total,
                failed_requests: failed,
                ..EndpointMetrics::new("a")
            };
            error_penalty_factor(&[m])
        };
        assert_eq!(with(0, 0), 0);
        assert_eq!(with(10, 0), 0);
        assert_eq!(with(10, 1), -1);
        assert_eq!(with(10, 4), -2);
        assert_eq!(with(10, 10), -5);
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_score(100), Grade::APlus);
        assert_eq!(Grade::from_score(90), Grade::APlus);
        assert_eq!(Grade::from_score(89), Grade::A);
        assert_eq!(Grade::from_score(80), Grade::A);
        assert_eq!(Grade::from_score(79), Grade::B);
        assert_eq!(Grade::from_score(70), Grade::B);
        assert_eq!(Grade::from_score(69), Grade::C);
        assert_eq!(Grade::from_score(60), Grade::C);
        assert_eq!(Grade::from_score(59), Grade::D);
        assert_eq!(Grade::from_score(50), Grade::D);
        assert_eq!(Grade::from_score(49), Grade::F);
        assert_eq!(Grade::from_score(0), Grade::F);
        assert_eq!(serde_json::to_value(Grade::APlus).unwrap(), "A+");
    }

    #[test]
    fn total_is_clamped_at_zero() {
        let m = EndpointMetrics {
            total_requests: 4,
            failed_requests: 4,
            is_healthy: false,
            average_response_time: 9000.0,
            ..EndpointMetrics::new("a")
        };
        let results = vec![vec![None]];
        let s = score(&[None], &results, &[m], &network(3, 0), now());
        assert_eq!(s.factors.sum(), -5);
        assert_eq!(s.total, 0);
        assert_eq!(s.grade, Grade::F);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let ts = Some(now().timestamp() as u64 - 45);
        let blocks = vec![block("0xA", ts), block("0xB", ts), None];
        let results = vec![vec![tx("0x1"), None, tx("0x1")]];
        let metrics = vec![healthy("a", 700.0), healthy("b", 300.0)];
        let net = network(7, 5);
        let first = score(&blocks, &results, &metrics, &net, now());
        let second = score(&blocks, &results, &metrics, &net, now());
        assert_eq!(first, second);
        assert_eq!(Grade::from_score(first.total), first.grade);
    }

    #[test]
    fn breakdown_renders_points_over_max() {
        let s = score(&[], &[], &[], &NetworkHealth::default(), now());
        let b = s.factors.breakdown();
        assert_eq!(b.tx_consistency, "20/20");
        assert_eq!(b.error_penalty, "0/0");
    }
}
