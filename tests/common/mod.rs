#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use da_watchdog::models::{BlockSnapshot, TransactionSnapshot};
use da_watchdog::{ChainSource, RpcError};

/// In-memory chain: anything not configured behaves like a timed-out call.
#[derive(Clone, Default)]
pub struct FakeChain {
    inner: Arc<Mutex<FakeData>>,
}

#[derive(Default)]
struct FakeData {
    blocks: HashMap<String, BlockSnapshot>,
    txs: HashMap<(String, String), TransactionSnapshot>,
}

impl FakeChain {
    pub fn set_block(&self, endpoint: &str, block: Option<BlockSnapshot>) {
        let mut data = self.inner.lock().unwrap();
        match block {
            Some(block) => data.blocks.insert(endpoint.to_string(), block),
            None => data.blocks.remove(endpoint),
        };
    }

    /// Serve `tx` when `endpoint` is asked for `requested`.
    pub fn set_tx(&self, endpoint: &str, requested: &str, tx: TransactionSnapshot) {
        self.inner
            .lock()
            .unwrap()
            .txs
            .insert((endpoint.to_string(), requested.to_string()), tx);
    }
}

impl ChainSource for FakeChain {
    async fn latest_block(&self, endpoint: &str) -> Result<BlockSnapshot, RpcError> {
        let data = self.inner.lock().unwrap();
        data.blocks
            .get(endpoint)
            .cloned()
            .ok_or(RpcError::Timeout(5000))
    }

    async fn transaction(&self, endpoint: &str, hash: &str) -> Result<TransactionSnapshot, RpcError> {
        let data = self.inner.lock().unwrap();
        data.txs
            .get(&(endpoint.to_string(), hash.to_string()))
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("transaction {}", hash)))
    }
}

pub fn block(hash: &str, txs: &[&str]) -> BlockSnapshot {
    BlockSnapshot {
        number: 1_000,
        hash: hash.to_string(),
        parent_hash: "0x0999".to_string(),
        timestamp: Some(Utc::now().timestamp() as u64),
        gas_used: 21_000,
        gas_limit: 8_000_000,
        transactions: txs.iter().map(|t| t.to_string()).collect(),
        size: 512,
        miner: Some("0x0000000000000000000000000000000000000001".to_string()),
        difficulty: "1".to_string(),
    }
}

pub fn tx(hash: &str) -> TransactionSnapshot {
    TransactionSnapshot {
        hash: hash.to_string(),
        from: "0x00000000000000000000000000000000000000aa".to_string(),
        to: Some("0x00000000000000000000000000000000000000bb".to_string()),
        value: "1000000000000000000".to_string(),
        gas_price: Some("25000000000".to_string()),
        gas: 21_000,
        block_number: Some(1_000),
        transaction_index: Some(0),
        nonce: 1,
    }
}
