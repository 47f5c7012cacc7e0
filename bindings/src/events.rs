//! Decoding of the contract's event logs and construction of log filters.

use std::marker::PhantomData;

use alloy::primitives::{Address, BlockHash, TxHash, B256};
use alloy::rpc::types::{Filter, Log, Topic};
use alloy::sol_types::SolEvent;
use tracing::warn;

use crate::abi::{
    Initialized, SetGlobalExitRootRemover, SetGlobalExitRootUpdater, UpdateHashChainValue,
    UpdateRemovalHashChainValue,
};
use crate::error::{Error, Result};
use crate::options::{FilterOpts, WatchOpts};

/// One decoded log, together with where it was emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord<E> {
    pub event: E,
    pub log: Log,
}

impl<E> EventRecord<E> {
    pub fn address(&self) -> Address {
        self.log.address()
    }

    pub fn block_number(&self) -> Option<u64> {
        self.log.block_number
    }

    pub fn block_hash(&self) -> Option<BlockHash> {
        self.log.block_hash
    }

    pub fn transaction_hash(&self) -> Option<TxHash> {
        self.log.transaction_hash
    }

    pub fn transaction_index(&self) -> Option<u64> {
        self.log.transaction_index
    }

    pub fn log_index(&self) -> Option<u64> {
        self.log.log_index
    }

    /// Set when the log was dropped by a chain reorganisation.
    pub fn removed(&self) -> bool {
        self.log.removed
    }

    pub fn map<F>(self, f: impl FnOnce(E) -> F) -> EventRecord<F> {
        EventRecord {
            event: f(self.event),
            log: self.log,
        }
    }
}

/// Decodes `log` as event `E`.
///
/// Topic 0 must be the event's signature hash, and the indexed and
/// non-indexed fields must match the declared layout.
pub fn parse_log<E: SolEvent>(log: &Log) -> Result<E> {
    E::decode_log_data(log.data(), true).map_err(Error::decode(E::SIGNATURE))
}

/// Any event emitted by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalExitRootEvent {
    Initialized(Initialized),
    SetGlobalExitRootRemover(SetGlobalExitRootRemover),
    SetGlobalExitRootUpdater(SetGlobalExitRootUpdater),
    UpdateHashChainValue(UpdateHashChainValue),
    UpdateRemovalHashChainValue(UpdateRemovalHashChainValue),
}

impl GlobalExitRootEvent {
    pub const SIGNATURE_HASHES: [B256; 5] = [
        Initialized::SIGNATURE_HASH,
        SetGlobalExitRootRemover::SIGNATURE_HASH,
        SetGlobalExitRootUpdater::SIGNATURE_HASH,
        UpdateHashChainValue::SIGNATURE_HASH,
        UpdateRemovalHashChainValue::SIGNATURE_HASH,
    ];

    /// Decodes any of the contract's events, dispatching on topic 0.
    pub fn parse(log: &Log) -> Result<Self> {
        let Some(&topic0) = log.topics().first() else {
            return Err(Error::Decode {
                what: "contract event",
                source: alloy::sol_types::Error::Other("log without topics".into()).into(),
            });
        };

        if topic0 == Initialized::SIGNATURE_HASH {
            Ok(Self::Initialized(parse_log(log)?))
        } else if topic0 == SetGlobalExitRootRemover::SIGNATURE_HASH {
            Ok(Self::SetGlobalExitRootRemover(parse_log(log)?))
        } else if topic0 == SetGlobalExitRootUpdater::SIGNATURE_HASH {
            Ok(Self::SetGlobalExitRootUpdater(parse_log(log)?))
        } else if topic0 == UpdateHashChainValue::SIGNATURE_HASH {
            Ok(Self::UpdateHashChainValue(parse_log(log)?))
        } else if topic0 == UpdateRemovalHashChainValue::SIGNATURE_HASH {
            Ok(Self::UpdateRemovalHashChainValue(parse_log(log)?))
        } else {
            Err(Error::Decode {
                what: "contract event",
                source: alloy::sol_types::Error::Other(
                    format!("unknown event signature {topic0}").into(),
                )
                .into(),
            })
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized(_) => "Initialized",
            Self::SetGlobalExitRootRemover(_) => "SetGlobalExitRootRemover",
            Self::SetGlobalExitRootUpdater(_) => "SetGlobalExitRootUpdater",
            Self::UpdateHashChainValue(_) => "UpdateHashChainValue",
            Self::UpdateRemovalHashChainValue(_) => "UpdateRemovalHashChainValue",
        }
    }
}

/// An event type this binding can query and decode.
///
/// Implemented for each of the contract's events and for
/// [`GlobalExitRootEvent`], which matches all of them.
pub trait ContractEvent: Sized + Send + 'static {
    const NAME: &'static str;

    /// Values accepted for topic 0.
    fn signatures() -> Topic;

    fn parse(log: &Log) -> Result<Self>;
}

macro_rules! impl_contract_event {
    ($($event:ident),* $(,)?) => {
        $(
            impl ContractEvent for $event {
                const NAME: &'static str = stringify!($event);

                fn signatures() -> Topic {
                    $event::SIGNATURE_HASH.into()
                }

                fn parse(log: &Log) -> Result<Self> {
                    parse_log(log)
                }
            }
        )*
    };
}

impl_contract_event!(
    Initialized,
    SetGlobalExitRootRemover,
    SetGlobalExitRootUpdater,
    UpdateHashChainValue,
    UpdateRemovalHashChainValue,
);

impl ContractEvent for GlobalExitRootEvent {
    const NAME: &'static str = "GlobalExitRootEvent";

    fn signatures() -> Topic {
        Self::SIGNATURE_HASHES.to_vec().into()
    }

    fn parse(log: &Log) -> Result<Self> {
        GlobalExitRootEvent::parse(log)
    }
}

/// Values to match on each indexed field of an event.
///
/// An empty set matches any value, a non-empty set matches any of its
/// members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicFilter {
    topics: [Vec<B256>; 3],
}

impl TopicFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the accepted values of the `position`-th indexed field
    /// (0-based, not counting the signature topic).
    ///
    /// An event declares at most three indexed fields. Values for any other
    /// position are ignored.
    pub fn with(mut self, position: usize, values: impl IntoIterator<Item = B256>) -> Self {
        match self.topics.get_mut(position) {
            Some(topic) => *topic = values.into_iter().collect(),
            None => warn!("ignoring values for indexed field {position} of 3"),
        }
        self
    }

    pub fn with_addresses(self, position: usize, values: &[Address]) -> Self {
        self.with(position, values.iter().map(|address| address.into_word()))
    }

    pub fn is_empty(&self) -> bool {
        self.topics.iter().all(Vec::is_empty)
    }

    fn apply(&self, mut filter: Filter) -> Filter {
        for (position, values) in self.topics.iter().enumerate() {
            if values.is_empty() {
                continue;
            }
            let topic: Topic = values.clone().into();
            filter = match position {
                0 => filter.topic1(topic),
                1 => filter.topic2(topic),
                _ => filter.topic3(topic),
            };
        }
        filter
    }
}

/// Builds the log filter of a historical query for events `E`.
pub fn event_filter<E: ContractEvent>(address: Address, opts: &FilterOpts, topics: &TopicFilter) -> Filter {
    let filter = Filter::new()
        .address(address)
        .event_signature(E::signatures())
        .from_block(opts.from_block);
    let filter = match opts.to_block {
        Some(to_block) => filter.to_block(to_block),
        None => filter.to_block(alloy::rpc::types::BlockNumberOrTag::Latest),
    };
    topics.apply(filter)
}

/// Builds the log filter of a live subscription for events `E`.
pub fn watch_filter<E: ContractEvent>(address: Address, opts: &WatchOpts, topics: &TopicFilter) -> Filter {
    let mut filter = Filter::new()
        .address(address)
        .event_signature(E::signatures());
    if let Some(from_block) = opts.from_block {
        filter = filter.from_block(from_block);
    }
    topics.apply(filter)
}

/// Historical events, decoded lazily in the order the node returned them.
///
/// The logs are fetched up front; decoding happens on iteration. The first
/// decode failure is yielded once and ends the iteration; it stays available
/// through [`EventIterator::error`]. Query again to restart.
pub struct EventIterator<E> {
    logs: std::vec::IntoIter<Log>,
    failed: Option<String>,
    _event: PhantomData<fn() -> E>,
}

impl<E: ContractEvent> EventIterator<E> {
    pub fn new(logs: Vec<Log>) -> Self {
        Self {
            logs: logs.into_iter(),
            failed: None,
            _event: PhantomData,
        }
    }

    /// The error that ended iteration, if any.
    pub fn error(&self) -> Option<&str> {
        self.failed.as_deref()
    }

    /// Logs not decoded yet.
    pub fn remaining(&self) -> usize {
        if self.failed.is_some() {
            0
        } else {
            self.logs.len()
        }
    }
}

impl<E: ContractEvent> Iterator for EventIterator<E> {
    type Item = Result<EventRecord<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed.is_some() {
            return None;
        }
        let log = self.logs.next()?;
        match E::parse(&log) {
            Ok(event) => Some(Ok(EventRecord { event, log })),
            Err(e) => {
                self.failed = Some(e.to_string());
                Some(Err(e))
            }
        }
    }
}

impl<E: ContractEvent> std::iter::FusedIterator for EventIterator<E> {}
