use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers_core::types::{Block, BlockNumber, Transaction, H160, H256, U256};
use ethers_providers::{Http, Middleware, Provider};
use url::Url;

use crate::models::{BlockSnapshot, TransactionSnapshot};

#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed response: {0}")]
    Malformed(&'static str),
    #[error("unknown endpoint {0}")]
    UnknownEndpoint(String),
}

/// Where the sampler reads chain data from. One call is one JSON-RPC request
/// against one endpoint.
pub trait ChainSource: Send + Sync + 'static {
    fn latest_block(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<BlockSnapshot, RpcError>> + Send;

    fn transaction(
        &self,
        endpoint: &str,
        hash: &str,
    ) -> impl Future<Output = Result<TransactionSnapshot, RpcError>> + Send;
}

/// JSON-RPC client over every configured endpoint, each call bounded by `timeout`.
#[derive(Clone)]
pub struct EthClient {
    providers: HashMap<String, Provider<Http>>,
    timeout: Duration,
}

impl EthClient {
    pub fn new<S: AsRef<str>>(rpc_urls: &[S], timeout: Duration) -> Result<Self> {
        // `bounded` owns the per-call deadline, so reqwest gets none of its own
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .context("failed to build reqwest client")?;

        let mut providers = HashMap::new();
        for rpc_url in rpc_urls {
            let rpc_url = rpc_url.as_ref();
            let url = Url::parse(rpc_url)
                .with_context(|| format!("invalid RPC endpoint url {}", rpc_url))?;
            let transport = Http::new_with_client(url, client.clone());
            providers.insert(rpc_url.to_string(), Provider::new(transport));
        }
        Ok(Self { providers, timeout })
    }

    fn provider(&self, endpoint: &str) -> Result<&Provider<Http>, RpcError> {
        self.providers
            .get(endpoint)
            .ok_or_else(|| RpcError::UnknownEndpoint(endpoint.to_string()))
    }

    async fn bounded<T, E, F>(&self, call: F) -> Result<T, RpcError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RpcError::Provider(e.to_string())),
            Err(_) => Err(RpcError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

impl ChainSource for EthClient {
    async fn latest_block(&self, endpoint: &str) -> Result<BlockSnapshot, RpcError> {
        let provider = self.provider(endpoint)?;
        let block = self
            .bounded(provider.get_block_with_txs(BlockNumber::Latest))
            .await?
            .ok_or_else(|| RpcError::NotFound("latest block".to_string()))?;
        normalize_block(block)
    }

    async fn transaction(&self, endpoint: &str, hash: &str) -> Result<TransactionSnapshot, RpcError> {
        let provider = self.provider(endpoint)?;
        let tx_hash: H256 = hash.parse().map_err(|_| RpcError::Malformed("transaction hash"))?;
        let tx = self
            .bounded(provider.get_transaction(tx_hash))
            .await?
            .ok_or_else(|| RpcError::NotFound(format!("transaction {}", hash)))?;
        Ok(normalize_tx(tx))
    }
}

fn normalize_block(block: Block<Transaction>) -> Result<BlockSnapshot, RpcError> {
    let number = block.number.ok_or(RpcError::Malformed("block number"))?;
    let hash = block.hash.ok_or(RpcError::Malformed("block hash"))?;
    let timestamp = block.timestamp.low_u64();

    Ok(BlockSnapshot {
        number: number.as_u64(),
        hash: hash_to_lower_hex(hash),
        parent_hash: hash_to_lower_hex(block.parent_hash),
        timestamp: (timestamp > 0).then_some(timestamp),
        gas_used: u256_to_u64_lossy(block.gas_used),
        gas_limit: u256_to_u64_lossy(block.gas_limit),
        transactions: block
            .transactions
            .iter()
            .map(|tx| hash_to_lower_hex(tx.hash))
            .collect(),
        size: block.size.map(u256_to_u64_lossy).unwrap_or(0),
        miner: block.author.map(address_to_lower_hex),
        difficulty: block.difficulty.to_string(),
    })
}

fn normalize_tx(tx: Transaction) -> TransactionSnapshot {
    TransactionSnapshot {
        hash: hash_to_lower_hex(tx.hash),
        from: address_to_lower_hex(tx.from),
        to: tx.to.map(address_to_lower_hex),
        value: tx.value.to_string(),
        gas_price: tx.gas_price.map(|v| v.to_string()),
        gas: u256_to_u64_lossy(tx.gas),
        block_number: tx.block_number.map(|n| n.as_u64()),
        transaction_index: tx.transaction_index.map(|i| i.as_u64()),
        nonce: u256_to_u64_lossy(tx.nonce),
    }
}

fn hash_to_lower_hex(hash: H256) -> String {
    format!("0x{:x}", hash)
}

fn address_to_lower_hex(addr: H160) -> String {
    format!("0x{:x}", addr)
}

fn u256_to_u64_opt(value: U256) -> Option<u64> {
    let as_u128: u128 = value.try_into().ok()?;
    u64::try_from(as_u128).ok()
}

fn u256_to_u64_lossy(value: U256) -> u64 {
    u256_to_u64_opt(value).unwrap_or(u64::MAX)
}
