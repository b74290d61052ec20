use std::collections::{HashMap, HashSet};

use crate::models::{BlockSnapshot, TransactionSnapshot, TxStatus};

/// True iff the endpoints that answered all agree on one block hash.
/// No answers at all counts as inconsistent.
pub fn blocks_consistent(blocks: &[Option<BlockSnapshot>]) -> bool {
    let hashes: HashSet<&str> = blocks.iter().flatten().map(|b| b.hash.as_str()).collect();
    hashes.len() == 1
}

/// True iff at least one endpoint returned the transaction and every returned
/// copy carries the same hash.
pub fn tx_consistent(txs: &[Option<TransactionSnapshot>]) -> bool {
    let hashes: HashSet<&str> = txs.iter().flatten().map(|t| t.hash.as_str()).collect();
    hashes.len() == 1
}

/// Size of the largest group of present blocks sharing a hash, and the number present.
pub fn block_majority(blocks: &[Option<BlockSnapshot>]) -> (usize, usize) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut present = 0;
    for block in blocks.iter().flatten() {
        present += 1;
        *counts.entry(block.hash.as_str()).or_insert(0) += 1;
    }
    let majority = counts.values().copied().max().unwrap_or(0);
    (majority, present)
}

/// Classifies each endpoint's answer for a sampled transaction hash.
pub fn classify_tx(expected_hash: &str, tx: Option<&TransactionSnapshot>) -> TxStatus {
    match tx {
        None => TxStatus::Missing,
        Some(t) if t.hash == expected_hash => TxStatus::Match,
        Some(_) => TxStatus::Mismatch,
    }
}
