use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use futures_util::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::alerts::{endpoint_alert, round_alerts};
use crate::consistency::{blocks_consistent, classify_tx, tx_consistent};
use crate::eth::{ChainSource, RpcError};
use crate::models::{
    Alert, BlockReport, BlockSnapshot, RoundPerformance, SampleResult, TransactionSnapshot,
    TxEndpointReport, TxReport,
};
use crate::scorer;
use crate::state::MonitorState;

/// What one round produced: the result plus every alert raised along the way.
#[derive(Debug, Clone)]
pub struct RoundOutput {
    pub result: SampleResult,
    pub alerts: Vec<Alert>,
}

/// Runs one complete sampling round against `state`.
///
/// Blocks are fetched from every endpoint at once, then up to
/// `tx_sample_size` transactions from the first endpoint's block are fetched
/// from every endpoint at once. Failed calls become absent snapshots and are
/// never retried within the round.
pub async fn run_round<S: ChainSource>(source: &S, state: &mut MonitorState) -> RoundOutput {
    let started = Instant::now();
    let endpoints = state.endpoints().to_vec();
    let mut alerts = Vec::new();

    let block_calls = endpoints.iter().map(move |e| timed(source.latest_block(e)));
    let block_outcomes = join_all(block_calls).await;
    let blocks: Vec<Option<BlockSnapshot>> =
        record_outcomes(state, &endpoints, block_outcomes, &mut alerts);

    let sampled = match blocks.first() {
        Some(Some(first)) => pick_sample(
            &first.transactions,
            state.tx_sample_size,
            &mut rand::thread_rng(),
        ),
        _ => Vec::new(),
    };

    let tx_calls = sampled.iter().map(|hash| {
        let per_endpoint = endpoints
            .iter()
            .map(move |e| timed(source.transaction(e, hash)));
        join_all(per_endpoint)
    });
    let tx_outcomes = join_all(tx_calls).await;
    let mut tx_results: Vec<Vec<Option<TransactionSnapshot>>> = Vec::with_capacity(sampled.len());
    for outcomes in tx_outcomes {
        tx_results.push(record_outcomes(state, &endpoints, outcomes, &mut alerts));
    }

    let now = Utc::now();
    let da = scorer::score(&blocks, &tx_results, state.health.metrics(), &state.network, now);

    let result = SampleResult {
        timestamp: now,
        da_score: da.total,
        grade: da.grade,
        factors: da.factors,
        breakdown: da.factors.breakdown(),
        blocks_consistent: blocks_consistent(&blocks),
        blocks: endpoints
            .iter()
            .zip(&blocks)
            .map(|(endpoint, block)| BlockReport {
                endpoint: endpoint.clone(),
                success: block.is_some(),
                block: block.clone(),
            })
            .collect(),
        tx_details: sampled
            .iter()
            .zip(&tx_results)
            .map(|(hash, txs)| tx_report(hash, &endpoints, txs))
            .collect(),
        sampled_txs: sampled,
        performance: RoundPerformance {
            total_sample_time_ms: started.elapsed().as_millis() as u64,
            rpc_metrics: state.health.snapshot(),
        },
        network_health: state.network.clone(),
    };

    state.record_check(da.total, now);
    state.push_history(result.clone());

    for draft in round_alerts(&da, &state.thresholds) {
        alerts.push(state.alerts.raise(draft));
    }

    tracing::info!(
        score = result.da_score,
        grade = %result.grade,
        blocks_consistent = result.blocks_consistent,
        sampled = result.sampled_txs.len(),
        elapsed_ms = result.performance.total_sample_time_ms,
        "DA health sample"
    );

    RoundOutput { result, alerts }
}

/// Up to `max` distinct hashes chosen uniformly from `hashes`.
pub fn pick_sample<R: Rng + ?Sized>(hashes: &[String], max: usize, rng: &mut R) -> Vec<String> {
    hashes.choose_multiple(rng, max).cloned().collect()
}

async fn timed<T, F>(call: F) -> (Result<T, RpcError>, f64)
where
    F: Future<Output = Result<T, RpcError>>,
{
    let start = Instant::now();
    let outcome = call.await;
    (outcome, start.elapsed().as_secs_f64() * 1000.0)
}

/// Feeds call outcomes to the health tracker in endpoint order.
fn record_outcomes<T>(
    state: &mut MonitorState,
    endpoints: &[String],
    outcomes: Vec<(Result<T, RpcError>, f64)>,
    alerts: &mut Vec<Alert>,
) -> Vec<Option<T>> {
    endpoints
        .iter()
        .zip(outcomes)
        .map(|(endpoint, (outcome, latency_ms))| {
            if let Err(e) = &outcome {
                tracing::debug!("RPC error {}: {}", endpoint, e);
            }
            if let Some(event) = state.health.record_outcome(endpoint, outcome.is_ok(), latency_ms) {
                alerts.push(state.alerts.raise(endpoint_alert(&event)));
            }
            outcome.ok()
        })
        .collect()
}

fn tx_report(hash: &str, endpoints: &[String], txs: &[Option<TransactionSnapshot>]) -> TxReport {
    TxReport {
        tx_hash: hash.to_string(),
        consistent: tx_consistent(txs),
        endpoints: endpoints
            .iter()
            .zip(txs)
            .map(|(endpoint, tx)| TxEndpointReport {
                endpoint: endpoint.clone(),
                status: classify_tx(hash, tx.as_ref()),
                transaction: tx.clone(),
            })
            .collect(),
    }
}
