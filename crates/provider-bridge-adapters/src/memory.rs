use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{keccak256, Address, Bytes, B256};
use serde_json::Value;

use provider_bridge_core::{
    to_quantity, BlockTag, BridgeError, ChainRpcPort, LogCriteria, Request,
};

/// A deterministic chain that answers the fallback calls filters depend on.
/// Blocks are mined explicitly, so tests control exactly when chain activity happens.
#[derive(Debug, Clone)]
pub struct InMemoryChainAdapter {
    state: Arc<Mutex<ChainState>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

#[derive(Debug)]
struct ChainState {
    blocks: Vec<MinedBlock>,
    canned: HashMap<String, Value>,
    failures: HashMap<String, BridgeError>,
    calls: Vec<String>,
}

#[derive(Debug)]
struct MinedBlock {
    number: u64,
    hash: B256,
    transactions: Vec<B256>,
    logs: Vec<(ChainLog, B256)>,
}

impl MinedBlock {
    fn genesis() -> Self {
        Self {
            number: 0,
            hash: block_hash(0),
            transactions: Vec::new(),
            logs: Vec::new(),
        }
    }

    fn to_json(&self) -> Value {
        serde_json::json!({
            "number": to_quantity(self.number),
            "hash": self.hash,
            "parentHash": self.number.checked_sub(1).map(block_hash).unwrap_or(B256::ZERO),
            "transactions": self.transactions,
        })
    }

    fn log_json(&self, index: usize, log: &ChainLog, tx_hash: B256) -> Value {
        serde_json::json!({
            "address": log.address,
            "topics": log.topics,
            "data": log.data,
            "blockNumber": to_quantity(self.number),
            "blockHash": self.hash,
            "transactionHash": tx_hash,
            "logIndex": to_quantity(index as u64),
            "removed": false,
        })
    }
}

impl Default for InMemoryChainAdapter {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                blocks: vec![MinedBlock::genesis()],
                canned: HashMap::new(),
                failures: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }
}

impl InMemoryChainAdapter {
    fn lock(&self) -> Result<MutexGuard<'_, ChainState>, BridgeError> {
        self.state
            .lock()
            .map_err(|e| BridgeError::Internal(format!("chain lock poisoned: {e}")))
    }

    pub fn head(&self) -> Result<u64, BridgeError> {
        Ok(self.lock()?.blocks.len() as u64 - 1)
    }

    /// Mines one block holding `transactions`; each log is attributed to the
    /// first transaction, or to a synthetic one when the block has none.
    pub fn mine_block(
        &self,
        transactions: Vec<B256>,
        logs: Vec<ChainLog>,
    ) -> Result<u64, BridgeError> {
        let mut g = self.lock()?;
        let number = g.blocks.len() as u64;
        let tx_hash = transactions
            .first()
            .copied()
            .unwrap_or_else(|| keccak256(format!("synthetic-tx-{number}")));
        g.blocks.push(MinedBlock {
            number,
            hash: block_hash(number),
            transactions,
            logs: logs.into_iter().map(|log| (log, tx_hash)).collect(),
        });
        Ok(number)
    }

    pub fn mine_empty_blocks(&self, count: u64) -> Result<u64, BridgeError> {
        let mut head = self.head()?;
        for _ in 0..count {
            head = self.mine_block(Vec::new(), Vec::new())?;
        }
        Ok(head)
    }

    pub fn block_hash(&self, number: u64) -> Result<Option<B256>, BridgeError> {
        let g = self.lock()?;
        Ok(g.blocks.get(number as usize).map(|b| b.hash))
    }

    /// Fixed answer for a method the chain does not model.
    pub fn set_result(&self, method: &str, result: Value) -> Result<(), BridgeError> {
        self.lock()?.canned.insert(method.to_owned(), result);
        Ok(())
    }

    /// Makes every call to `method` fail with `error` until cleared.
    pub fn fail_method(&self, method: &str, error: BridgeError) -> Result<(), BridgeError> {
        self.lock()?.failures.insert(method.to_owned(), error);
        Ok(())
    }

    pub fn clear_failure(&self, method: &str) -> Result<(), BridgeError> {
        self.lock()?.failures.remove(method);
        Ok(())
    }

    /// Method names in call order.
    pub fn calls(&self) -> Result<Vec<String>, BridgeError> {
        Ok(self.lock()?.calls.clone())
    }
}

fn get_logs(state: &ChainState, filter: &Value) -> Result<Value, BridgeError> {
    let criteria = LogCriteria::from_param(filter)?;
    let head = state.blocks.len() as u64 - 1;
    let from = resolve(criteria.from_block, head);
    let to = resolve(criteria.to_block, head).min(head);
    let mut out = Vec::new();
    if from > to {
        return Ok(Value::Array(out));
    }
    for block in &state.blocks[from as usize..=to as usize] {
        for (index, (log, tx_hash)) in block.logs.iter().enumerate() {
            if matches(&criteria, log) {
                out.push(block.log_json(index, log, *tx_hash));
            }
        }
    }
    Ok(Value::Array(out))
}

impl ChainRpcPort for InMemoryChainAdapter {
    async fn call(&self, request: &Request) -> Result<Value, BridgeError> {
        let mut g = self.lock()?;
        g.calls.push(request.method.clone());
        if let Some(err) = g.failures.get(&request.method) {
            return Err(err.clone());
        }
        match request.method.as_str() {
            "eth_blockNumber" => Ok(to_quantity(g.blocks.len() as u64 - 1)),
            "eth_getBlockByNumber" => {
                let head = g.blocks.len() as u64 - 1;
                let number = resolve(BlockTag::parse(request.params.first())?, head);
                Ok(g.blocks
                    .get(number as usize)
                    .map(MinedBlock::to_json)
                    .unwrap_or(Value::Null))
            }
            "eth_getLogs" => get_logs(&g, &request.param(0)),
            method => g.canned.get(method).cloned().ok_or_else(|| BridgeError::Rpc {
                code: -32601,
                message: format!("the method {method} does not exist/is not available"),
            }),
        }
    }
}

fn resolve(tag: BlockTag, head: u64) -> u64 {
    match tag {
        BlockTag::Latest | BlockTag::Pending => head,
        BlockTag::Earliest => 0,
        BlockTag::Number(n) => n,
    }
}

fn matches(criteria: &LogCriteria, log: &ChainLog) -> bool {
    if !criteria.addresses.is_empty() && !criteria.addresses.contains(&log.address) {
        return false;
    }
    criteria
        .topics
        .iter()
        .enumerate()
        .all(|(position, slot)| match slot {
            None => true,
            Some(alternatives) => log
                .topics
                .get(position)
                .is_some_and(|topic| alternatives.contains(topic)),
        })
}

fn block_hash(number: u64) -> B256 {
    keccak256(number.to_be_bytes())
}
