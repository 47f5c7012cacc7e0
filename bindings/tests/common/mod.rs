//! An in-memory node for exercising the bindings end to end.
#![allow(dead_code)] // each test binary uses its own subset

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, TxHash, B256};
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::rpc::types::{BlockId, Filter, Log, TransactionRequest};
use alloy::sol_types::SolEvent;
use alloy::transports::{RpcError, TransportErrorKind};
use futures::channel::mpsc;
use futures::StreamExt as _;
use serde_json::value::RawValue;
use sovereign_ger_bindings::{ContractBackend, Error, LogSubscription, Result};

pub const CONTRACT: Address = Address::repeat_byte(0xc0);

/// Answers calls from a table keyed by selector, keeps an append-only log
/// history and fans new logs out to the live feeds whose filter matches.
#[derive(Default)]
pub struct FakeNode {
    state: Mutex<State>,
    released: Arc<AtomicUsize>,
}

#[derive(Default)]
struct State {
    returns: HashMap<[u8; 4], Bytes>,
    reverts: HashMap<[u8; 4], Bytes>,
    unreachable: bool,
    nonces: HashMap<Address, u64>,
    sent: Vec<TransactionRequest>,
    logs: Vec<Log>,
    feeds: Vec<(Filter, mpsc::UnboundedSender<Result<Log>>)>,
    subscriptions: u8,
}

impl FakeNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Answer calls to `selector` with `data`.
    pub fn on_call(&self, selector: [u8; 4], data: impl Into<Bytes>) {
        self.state().returns.insert(selector, data.into());
    }

    /// Revert calls and estimations of `selector` with `data`.
    pub fn on_call_revert(&self, selector: [u8; 4], data: impl Into<Bytes>) {
        self.state().reverts.insert(selector, data.into());
    }

    /// Fail every request at the transport level.
    pub fn set_unreachable(&self) {
        self.state().unreachable = true;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state().sent.clone()
    }

    /// Appends a log to the history and pushes it to matching live feeds.
    pub fn emit(&self, log: Log) {
        let mut state = self.state();
        state.feeds.retain(|(filter, feed)| {
            !matches(filter, &log) || feed.unbounded_send(Ok(log.clone())).is_ok()
        });
        state.logs.push(log);
    }

    /// Fails every live feed with a transport error.
    pub fn fail_feeds(&self) {
        for (_, feed) in self.state().feeds.drain(..) {
            let _ = feed.unbounded_send(Err(Error::SubscriptionDropped(
                "websocket closed".to_string(),
            )));
        }
    }

    /// Ends every live feed without an error.
    pub fn close_feeds(&self) {
        self.state().feeds.clear();
    }

    /// Number of live feeds released by their consumers.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<()> {
        if self.state().unreachable {
            return Err(Error::Transport(TransportErrorKind::custom_str(
                "connection refused",
            )));
        }
        Ok(())
    }

    fn execute(&self, tx: &TransactionRequest) -> Result<Option<Bytes>> {
        self.check_reachable()?;
        let input = tx.input.input().cloned().unwrap_or_default();
        let Some(selector) = input.get(..4).and_then(|s| <[u8; 4]>::try_from(s).ok()) else {
            return Ok(None);
        };
        let state = self.state();
        if let Some(data) = state.reverts.get(&selector) {
            return Err(revert(data));
        }
        Ok(state.returns.get(&selector).cloned())
    }
}

impl ContractBackend for FakeNode {
    async fn call(&self, tx: TransactionRequest, _block: BlockId) -> Result<Bytes> {
        Ok(self.execute(&tx)?.unwrap_or_default())
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        self.execute(&tx)?;
        Ok(60_000)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.check_reachable()?;
        Ok(self.state().nonces.get(&address).copied().unwrap_or_default())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        self.check_reachable()?;
        let mut state = self.state();
        let from = tx.from.unwrap_or_default();
        *state.nonces.entry(from).or_default() += 1;
        state.sent.push(tx);
        Ok(TxHash::with_last_byte(state.sent.len() as u8))
    }

    async fn get_logs(&self, filter: Filter) -> Result<Vec<Log>> {
        self.check_reachable()?;
        let mut logs: Vec<_> = self
            .state()
            .logs
            .iter()
            .filter(|log| matches(&filter, log) && in_range(&filter, log))
            .cloned()
            .collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    async fn subscribe_logs(&self, filter: Filter) -> Result<LogSubscription> {
        self.check_reachable()?;
        let (tx, rx) = mpsc::unbounded();
        let mut state = self.state();
        state.subscriptions += 1;
        let id = B256::with_last_byte(state.subscriptions);
        state.feeds.push((filter, tx));

        let released = self.released.clone();
        Ok(LogSubscription::new(id, rx.boxed(), move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

fn matches(filter: &Filter, log: &Log) -> bool {
    let topics = log.topics();
    filter.address.matches(&log.address())
        && filter.topics.iter().enumerate().all(|(i, topic)| {
            topic.is_empty() || topics.get(i).is_some_and(|value| topic.matches(value))
        })
}

fn in_range(filter: &Filter, log: &Log) -> bool {
    let block = log.block_number.unwrap_or_default();
    filter.get_from_block().map_or(true, |from| block >= from)
        && filter.get_to_block().map_or(true, |to| block <= to)
}

/// What a node answers when execution reverts with `data`.
pub fn revert(data: &[u8]) -> Error {
    let raw = format!("\"{}\"", alloy::primitives::hex::encode_prefixed(data));
    Error::Transport(RpcError::ErrorResp(ErrorPayload {
        code: 3,
        message: "execution reverted".into(),
        data: Some(RawValue::from_string(raw).unwrap()),
    }))
}

/// A log of `event` emitted by `address` at `(block, index)`.
pub fn log_of(address: Address, event: &impl SolEvent, block: u64, index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address,
            data: event.encode_log_data(),
        },
        block_number: Some(block),
        log_index: Some(index),
        transaction_hash: Some(TxHash::with_last_byte(block as u8)),
        ..Default::default()
    }
}
