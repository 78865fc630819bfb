//! Support for polling based filters.
//!
//! Filters live entirely inside the bridge. Change queries are answered by the
//! chain-RPC fallback (`eth_blockNumber`, `eth_getBlockByNumber`, `eth_getLogs`);
//! the host signer is never involved.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, B256};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::domain::Request;
use crate::ports::{BridgeError, ChainRpcPort};
use crate::state_machine::{filter_transition, FilterAction, FilterStatus};

/// Topic positions a log filter may constrain.
pub const MAX_TOPICS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Log,
    Block,
    PendingTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Earliest,
    Pending,
    Number(u64),
}

impl BlockTag {
    pub fn parse(value: Option<&Value>) -> Result<Self, BridgeError> {
        match value {
            None | Some(Value::Null) => Ok(BlockTag::Latest),
            Some(Value::String(s)) => match s.as_str() {
                "latest" => Ok(BlockTag::Latest),
                "earliest" => Ok(BlockTag::Earliest),
                "pending" => Ok(BlockTag::Pending),
                other => parse_quantity_str(other).map(BlockTag::Number),
            },
            Some(Value::Number(n)) => n
                .as_u64()
                .map(BlockTag::Number)
                .ok_or_else(|| BridgeError::InvalidParams(format!("invalid block number: {n}"))),
            Some(other) => Err(BridgeError::InvalidParams(format!(
                "invalid block tag: {other}"
            ))),
        }
    }

    fn resolve(self, head: u64) -> u64 {
        match self {
            BlockTag::Latest | BlockTag::Pending => head,
            BlockTag::Earliest => 0,
            BlockTag::Number(n) => n,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            BlockTag::Latest => Value::from("latest"),
            BlockTag::Earliest => Value::from("earliest"),
            BlockTag::Pending => Value::from("pending"),
            BlockTag::Number(n) => to_quantity(n),
        }
    }
}

/// Normalised `eth_newFilter` criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCriteria {
    pub from_block: BlockTag,
    pub to_block: BlockTag,
    pub addresses: Vec<Address>,
    /// One slot per topic position; `None` matches anything.
    pub topics: Vec<Option<Vec<B256>>>,
}

impl Default for LogCriteria {
    fn default() -> Self {
        Self {
            from_block: BlockTag::Latest,
            to_block: BlockTag::Latest,
            addresses: Vec::new(),
            topics: Vec::new(),
        }
    }
}

impl LogCriteria {
    pub fn from_param(value: &Value) -> Result<Self, BridgeError> {
        let obj = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            other => {
                return Err(BridgeError::InvalidParams(format!(
                    "filter criteria must be an object, got {other}"
                )))
            }
        };

        let addresses = match obj.get("address") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => vec![parse_address(s)?],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| {
                            BridgeError::InvalidParams("filter address must be a string".to_owned())
                        })
                        .and_then(parse_address)
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(BridgeError::InvalidParams(format!(
                    "invalid filter address: {other}"
                )))
            }
        };

        let topics = match obj.get("topics") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(slots)) => {
                if slots.len() > MAX_TOPICS {
                    return Err(BridgeError::InvalidParams(format!(
                        "at most {MAX_TOPICS} topic positions allowed, got {}",
                        slots.len()
                    )));
                }
                slots
                    .iter()
                    .map(parse_topic_slot)
                    .collect::<Result<Vec<_>, _>>()?
            }
            Some(other) => {
                return Err(BridgeError::InvalidParams(format!(
                    "invalid filter topics: {other}"
                )))
            }
        };

        Ok(Self {
            from_block: BlockTag::parse(obj.get("fromBlock"))?,
            to_block: BlockTag::parse(obj.get("toBlock"))?,
            addresses,
            topics,
        })
    }

    /// The `eth_getLogs` filter object for the given block range.
    pub fn logs_query(&self, from: BlockTag, to: BlockTag) -> Value {
        let mut obj = Map::new();
        obj.insert("fromBlock".to_owned(), from.to_value());
        obj.insert("toBlock".to_owned(), to.to_value());
        match self.addresses.as_slice() {
            [] => {}
            [single] => {
                obj.insert("address".to_owned(), Value::from(single.to_string()));
            }
            many => {
                obj.insert(
                    "address".to_owned(),
                    Value::from(many.iter().map(|a| a.to_string()).collect::<Vec<_>>()),
                );
            }
        }
        if !self.topics.is_empty() {
            let slots = self
                .topics
                .iter()
                .map(|slot| match slot.as_deref() {
                    None => Value::Null,
                    Some([single]) => Value::from(single.to_string()),
                    Some(alternatives) => Value::from(
                        alternatives
                            .iter()
                            .map(|t| t.to_string())
                            .collect::<Vec<_>>(),
                    ),
                })
                .collect::<Vec<_>>();
            obj.insert("topics".to_owned(), Value::Array(slots));
        }
        Value::Object(obj)
    }
}

#[derive(Debug, Clone)]
struct FilterRecord {
    kind: FilterKind,
    criteria: Option<LogCriteria>,
    /// Highest block already reported to the page. `None` before anything was seen.
    last_seen: Option<u64>,
    status: FilterStatus,
}

impl FilterRecord {
    /// Claims every block after the cursor up to `head` and moves the cursor
    /// there. Returns `None` when the chain has not moved.
    fn claim(&mut self, head: u64) -> Result<Option<(u64, u64)>, BridgeError> {
        let (status, _) = filter_transition(self.status, FilterAction::Poll)?;
        self.status = status;
        let start = self.last_seen.map_or(0, |n| n.saturating_add(1));
        if head < start {
            return Ok(None);
        }
        self.last_seen = Some(head);
        Ok(Some((start, head)))
    }

    /// Gives a claimed range back after a failed fetch, unless a later poll
    /// already moved past it.
    fn rewind(&mut self, (start, end): (u64, u64)) {
        if self.last_seen == Some(end) {
            self.last_seen = start.checked_sub(1);
        }
    }
}

#[derive(Debug, Default)]
pub struct FilterManager {
    table: Mutex<FilterTable>,
}

#[derive(Debug, Default)]
struct FilterTable {
    last_issued: u64,
    filters: HashMap<u64, FilterRecord>,
}

impl FilterManager {
    pub async fn new_filter<R: ChainRpcPort>(
        &self,
        rpc: &R,
        params: &[Value],
    ) -> Result<Value, BridgeError> {
        let criteria = LogCriteria::from_param(params.first().unwrap_or(&Value::Null))?;
        let head = block_number(rpc).await?;
        let last_seen = match criteria.from_block {
            BlockTag::Number(n) => n.checked_sub(1),
            BlockTag::Earliest => None,
            BlockTag::Latest | BlockTag::Pending => Some(head),
        };
        self.install(FilterKind::Log, Some(criteria), last_seen)
    }

    pub async fn new_block_filter<R: ChainRpcPort>(&self, rpc: &R) -> Result<Value, BridgeError> {
        let head = block_number(rpc).await?;
        self.install(FilterKind::Block, None, Some(head))
    }

    pub async fn new_pending_transaction_filter<R: ChainRpcPort>(
        &self,
        rpc: &R,
    ) -> Result<Value, BridgeError> {
        let head = block_number(rpc).await?;
        self.install(FilterKind::PendingTransaction, None, Some(head))
    }

    fn install(
        &self,
        kind: FilterKind,
        criteria: Option<LogCriteria>,
        last_seen: Option<u64>,
    ) -> Result<Value, BridgeError> {
        let mut g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("filter table", e))?;
        g.last_issued = g.last_issued.saturating_add(1);
        let key = g.last_issued;
        g.filters.insert(
            key,
            FilterRecord {
                kind,
                criteria,
                last_seen,
                status: FilterStatus::Installed,
            },
        );
        let id = format_filter_id(key);
        debug!(target: "bridge::filter", "installed {:?} filter {} at {:?}", kind, id, last_seen);
        Ok(Value::from(id))
    }

    /// Returns `true` if the filter existed.
    pub fn uninstall_filter(&self, id: &Value) -> Result<bool, BridgeError> {
        let Some(key) = parse_filter_id(id) else {
            return Ok(false);
        };
        let removed = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("filter table", e))?
            .filters
            .remove(&key);
        match removed {
            Some(record) => {
                filter_transition(record.status, FilterAction::Uninstall)?;
                debug!(target: "bridge::filter", "uninstalled filter {}", format_filter_id(key));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Items newer than the filter's cursor; advances the cursor past them.
    pub async fn get_filter_changes<R: ChainRpcPort>(
        &self,
        rpc: &R,
        id: &Value,
    ) -> Result<Value, BridgeError> {
        let key = self.lookup(id)?;
        let head = block_number(rpc).await?;

        let (kind, criteria, claimed) = {
            let mut g = self
                .table
                .lock()
                .map_err(|e| BridgeError::poisoned("filter table", e))?;
            let record = g.filters.get_mut(&key).ok_or_else(|| not_found(id))?;
            let claimed = record.claim(head)?;
            (record.kind, record.criteria.clone(), claimed)
        };

        let Some(range) = claimed else {
            trace!(target: "bridge::filter", "no new blocks for filter {}", id);
            return Ok(Value::Array(Vec::new()));
        };

        let fetched = match kind {
            FilterKind::Block => block_hashes(rpc, range).await,
            FilterKind::PendingTransaction => transaction_hashes(rpc, range).await,
            FilterKind::Log => match criteria {
                Some(criteria) => logs_in_range(rpc, &criteria, range).await,
                None => Err(BridgeError::Internal("log filter without criteria".to_owned())),
            },
        };

        match fetched {
            Ok(items) => Ok(Value::Array(items)),
            Err(e) => {
                warn!(target: "bridge::filter", "filter {} poll failed: {}", id, e);
                if let Err(rewind) = self.rewind_claim(key, range) {
                    warn!(target: "bridge::filter", "filter {} keeps its cursor: {}", id, rewind);
                }
                Err(e)
            }
        }
    }

    fn rewind_claim(&self, key: u64, range: (u64, u64)) -> Result<(), BridgeError> {
        let mut g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("filter table", e))?;
        if let Some(record) = g.filters.get_mut(&key) {
            record.rewind(range);
        }
        Ok(())
    }

    /// Every log matching the filter's original criteria. Leaves the cursor alone.
    pub async fn get_filter_logs<R: ChainRpcPort>(
        &self,
        rpc: &R,
        id: &Value,
    ) -> Result<Value, BridgeError> {
        let key = self.lookup(id)?;
        let criteria = {
            let g = self
                .table
                .lock()
                .map_err(|e| BridgeError::poisoned("filter table", e))?;
            let record = g.filters.get(&key).ok_or_else(|| not_found(id))?;
            match (&record.kind, &record.criteria) {
                (FilterKind::Log, Some(criteria)) => criteria.clone(),
                (kind, _) => {
                    return Err(BridgeError::InvalidParams(format!(
                        "filter {id} is a {kind:?} filter, not a log filter"
                    )))
                }
            }
        };
        let query = criteria.logs_query(criteria.from_block, criteria.to_block);
        let logs = rpc
            .call(&Request::new(None, "eth_getLogs", vec![query]))
            .await?;
        expect_array(logs, "eth_getLogs").map(Value::Array)
    }

    /// Highest block the filter has reported, for diagnostics.
    pub fn last_seen(&self, id: &Value) -> Result<Option<u64>, BridgeError> {
        let key = self.lookup(id)?;
        let g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("filter table", e))?;
        g.filters
            .get(&key)
            .map(|record| record.last_seen)
            .ok_or_else(|| not_found(id))
    }

    pub fn len(&self) -> Result<usize, BridgeError> {
        let g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("filter table", e))?;
        Ok(g.filters.len())
    }

    pub fn is_empty(&self) -> Result<bool, BridgeError> {
        Ok(self.len()? == 0)
    }

    fn lookup(&self, id: &Value) -> Result<u64, BridgeError> {
        let key = parse_filter_id(id).ok_or_else(|| not_found(id))?;
        let g = self
            .table
            .lock()
            .map_err(|e| BridgeError::poisoned("filter table", e))?;
        if g.filters.contains_key(&key) {
            Ok(key)
        } else {
            Err(not_found(id))
        }
    }
}

async fn block_number<R: ChainRpcPort>(rpc: &R) -> Result<u64, BridgeError> {
    let head = rpc
        .call(&Request::new(None, "eth_blockNumber", Vec::new()))
        .await?;
    parse_quantity(&head)
}

async fn fetch_block<R: ChainRpcPort>(rpc: &R, number: u64) -> Result<Value, BridgeError> {
    rpc.call(&Request::new(
        None,
        "eth_getBlockByNumber",
        vec![to_quantity(number), Value::Bool(false)],
    ))
    .await
}

async fn block_hashes<R: ChainRpcPort>(
    rpc: &R,
    (start, end): (u64, u64),
) -> Result<Vec<Value>, BridgeError> {
    let mut hashes = Vec::new();
    for number in start..=end {
        let block = fetch_block(rpc, number).await?;
        if let Some(hash) = block.get("hash").filter(|h| !h.is_null()) {
            hashes.push(hash.clone());
        }
    }
    Ok(hashes)
}

async fn transaction_hashes<R: ChainRpcPort>(
    rpc: &R,
    (start, end): (u64, u64),
) -> Result<Vec<Value>, BridgeError> {
    let mut hashes = Vec::new();
    for number in start..=end {
        let block = fetch_block(rpc, number).await?;
        let Some(txs) = block.get("transactions").and_then(Value::as_array) else {
            continue;
        };
        for tx in txs {
            match tx {
                Value::Object(obj) => hashes.extend(obj.get("hash").cloned()),
                other => hashes.push(other.clone()),
            }
        }
    }
    Ok(hashes)
}

async fn logs_in_range<R: ChainRpcPort>(
    rpc: &R,
    criteria: &LogCriteria,
    (start, end): (u64, u64),
) -> Result<Vec<Value>, BridgeError> {
    let from = start.max(criteria.from_block.resolve(start));
    let to = end.min(criteria.to_block.resolve(end));
    if from > to {
        return Ok(Vec::new());
    }
    let query = criteria.logs_query(BlockTag::Number(from), BlockTag::Number(to));
    let logs = rpc
        .call(&Request::new(None, "eth_getLogs", vec![query]))
        .await?;
    expect_array(logs, "eth_getLogs")
}

fn expect_array(value: Value, method: &str) -> Result<Vec<Value>, BridgeError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(BridgeError::Transport(format!(
            "{method}: array expected, got {other}"
        ))),
    }
}

fn not_found(id: &Value) -> BridgeError {
    BridgeError::FilterNotFound(match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn format_filter_id(key: u64) -> String {
    format!("{key:#x}")
}

/// Only the `0x` form the manager hands out names a filter.
fn parse_filter_id(id: &Value) -> Option<u64> {
    let hex = id.as_str()?.strip_prefix("0x")?;
    u64::from_str_radix(hex, 16).ok()
}

fn parse_address(raw: &str) -> Result<Address, BridgeError> {
    raw.parse()
        .map_err(|e| BridgeError::InvalidParams(format!("invalid filter address {raw}: {e}")))
}

fn parse_topic(raw: &str) -> Result<B256, BridgeError> {
    raw.parse()
        .map_err(|e| BridgeError::InvalidParams(format!("invalid topic {raw}: {e}")))
}

fn parse_topic_slot(slot: &Value) -> Result<Option<Vec<B256>>, BridgeError> {
    match slot {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(vec![parse_topic(s)?])),
        Value::Array(alternatives) if alternatives.is_empty() => Ok(None),
        Value::Array(alternatives) => alternatives
            .iter()
            .map(|alt| {
                alt.as_str()
                    .ok_or_else(|| BridgeError::InvalidParams("topic must be a string".to_owned()))
                    .and_then(parse_topic)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(BridgeError::InvalidParams(format!("invalid topic slot: {other}"))),
    }
}

pub fn to_quantity(n: u64) -> Value {
    Value::from(format!("{n:#x}"))
}

/// Accepts a JSON number or a `0x`-prefixed hex / decimal string.
pub fn parse_quantity(value: &Value) -> Result<u64, BridgeError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| BridgeError::InvalidParams(format!("quantity expected, got {value}")))?;
    parse_quantity_str(s)
}

pub fn parse_quantity_str(raw: &str) -> Result<u64, BridgeError> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| BridgeError::InvalidParams(format!("invalid hex quantity {raw}: {e}")))
    } else {
        raw.parse()
            .map_err(|e| BridgeError::InvalidParams(format!("invalid quantity {raw}: {e}")))
    }
}
