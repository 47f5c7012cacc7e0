use std::sync::Arc;

use alloy::dyn_abi::{DynSolValue, FunctionExt as _, JsonAbiExt as _};
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use tokio::sync::mpsc;
use tracing::debug;

use crate::abi;
use crate::backend::ContractBackend;
use crate::descriptor::{descriptor, ContractDescriptor};
use crate::error::{Error, Result};
use crate::events::{
    self, ContractEvent, EventIterator, EventRecord, GlobalExitRootEvent, TopicFilter,
};
use crate::options::{with_timeout, CallOpts, FilterOpts, TransactOpts, WatchOpts};
use crate::watch::EventWatch;

/// A submitted transaction. Inclusion is not awaited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
    /// The request as submitted, with nonce and gas filled in.
    pub request: TransactionRequest,
}

/// Client of one deployed `GlobalExitRootManagerL2SovereignChain`.
///
/// Each operation is independent: the handle only reads its own address,
/// descriptor and backend, so it can be cloned and used concurrently.
#[derive(Debug)]
pub struct GlobalExitRootManager<B> {
    address: Address,
    backend: Arc<B>,
    descriptor: &'static ContractDescriptor,
}

impl<B> Clone for GlobalExitRootManager<B> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            backend: self.backend.clone(),
            descriptor: self.descriptor,
        }
    }
}

impl<B: ContractBackend> GlobalExitRootManager<B> {
    pub fn new(address: Address, backend: Arc<B>) -> Result<Self> {
        Ok(Self {
            address,
            backend,
            descriptor: descriptor()?,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn descriptor(&self) -> &'static ContractDescriptor {
        self.descriptor
    }

    // ============ READ OPERATIONS ============

    /// The bridge contract allowed to update exit roots. Fixed at deployment.
    pub async fn bridge_address(&self, opts: &CallOpts) -> Result<Address> {
        Ok(self.call(opts, abi::bridgeAddressCall {}).await?._0)
    }

    /// Timestamp at which `root` was inserted, zero if it is not present.
    pub async fn global_exit_root_map(&self, opts: &CallOpts, root: B256) -> Result<U256> {
        Ok(self
            .call(opts, abi::globalExitRootMapCall { _0: root })
            .await?
            ._0)
    }

    pub async fn global_exit_root_remover(&self, opts: &CallOpts) -> Result<Address> {
        Ok(self.call(opts, abi::globalExitRootRemoverCall {}).await?._0)
    }

    pub async fn global_exit_root_updater(&self, opts: &CallOpts) -> Result<Address> {
        Ok(self.call(opts, abi::globalExitRootUpdaterCall {}).await?._0)
    }

    /// Hash chain over every inserted global exit root.
    pub async fn inserted_ger_hash_chain(&self, opts: &CallOpts) -> Result<B256> {
        Ok(self.call(opts, abi::insertedGERHashChainCall {}).await?._0)
    }

    pub async fn last_rollup_exit_root(&self, opts: &CallOpts) -> Result<B256> {
        Ok(self.call(opts, abi::lastRollupExitRootCall {}).await?._0)
    }

    /// Hash chain over every removed global exit root.
    pub async fn removed_ger_hash_chain(&self, opts: &CallOpts) -> Result<B256> {
        Ok(self.call(opts, abi::removedGERHashChainCall {}).await?._0)
    }

    // ============ WRITE OPERATIONS ============

    /// Sets the updater and remover roles. Accepted once per deployment.
    pub async fn initialize(
        &self,
        opts: &TransactOpts,
        updater: Address,
        remover: Address,
    ) -> Result<PendingTransaction> {
        self.transact(opts, encode_initialize(updater, remover))
            .await
    }

    pub async fn insert_global_exit_root(
        &self,
        opts: &TransactOpts,
        root: B256,
    ) -> Result<PendingTransaction> {
        self.transact(
            opts,
            abi::insertGlobalExitRootCall { _newRoot: root }.abi_encode(),
        )
        .await
    }

    pub async fn remove_global_exit_roots(
        &self,
        opts: &TransactOpts,
        roots: &[B256],
    ) -> Result<PendingTransaction> {
        self.transact(
            opts,
            abi::removeGlobalExitRootsCall {
                gersToRemove: roots.to_vec(),
            }
            .abi_encode(),
        )
        .await
    }

    pub async fn set_global_exit_root_remover(
        &self,
        opts: &TransactOpts,
        remover: Address,
    ) -> Result<PendingTransaction> {
        self.transact(
            opts,
            abi::setGlobalExitRootRemoverCall {
                _globalExitRootRemover: remover,
            }
            .abi_encode(),
        )
        .await
    }

    pub async fn set_global_exit_root_updater(
        &self,
        opts: &TransactOpts,
        updater: Address,
    ) -> Result<PendingTransaction> {
        self.transact(
            opts,
            abi::setGlobalExitRootUpdaterCall {
                _globalExitRootUpdater: updater,
            }
            .abi_encode(),
        )
        .await
    }

    pub async fn update_exit_root(
        &self,
        opts: &TransactOpts,
        root: B256,
    ) -> Result<PendingTransaction> {
        self.transact(opts, abi::updateExitRootCall { newRoot: root }.abi_encode())
            .await
    }

    // ============ RAW OPERATIONS ============

    /// Calls `method` with dynamically typed arguments, checked against the
    /// interface schema before anything is sent. Return data that does not
    /// match the schema is an [`Error::Decode`].
    pub async fn call_raw(
        &self,
        opts: &CallOpts,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>> {
        let function = self.descriptor.function(method)?;
        let input = encode_input(method, function, args)?;
        let output = self.execute_call(opts, input).await?;
        function
            .abi_decode_output(&output, true)
            .map_err(Error::decode("raw call return data"))
    }

    /// Submits a transaction calling `method` with dynamically typed
    /// arguments, checked against the interface schema before anything is
    /// sent.
    pub async fn transact_raw(
        &self,
        opts: &TransactOpts,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<PendingTransaction> {
        let function = self.descriptor.function(method)?;
        let input = encode_input(method, function, args)?;
        self.transact(opts, input).await
    }

    // ============ EVENTS ============

    /// Historical events of type `E` in the block range of `opts`.
    pub async fn filter<E: ContractEvent>(
        &self,
        opts: &FilterOpts,
        topics: &TopicFilter,
    ) -> Result<EventIterator<E>> {
        let filter = events::event_filter::<E>(self.address, opts, topics);
        let logs = with_timeout(opts.timeout, self.backend.get_logs(filter)).await?;
        debug!("fetched {} {} logs", logs.len(), E::NAME);
        Ok(EventIterator::new(logs))
    }

    pub async fn filter_initialized(&self, opts: &FilterOpts) -> Result<EventIterator<abi::Initialized>> {
        self.filter(opts, &TopicFilter::new()).await
    }

    pub async fn filter_set_global_exit_root_remover(
        &self,
        opts: &FilterOpts,
        new_remover: &[Address],
    ) -> Result<EventIterator<abi::SetGlobalExitRootRemover>> {
        self.filter(opts, &TopicFilter::new().with_addresses(0, new_remover))
            .await
    }

    pub async fn filter_set_global_exit_root_updater(
        &self,
        opts: &FilterOpts,
        new_updater: &[Address],
    ) -> Result<EventIterator<abi::SetGlobalExitRootUpdater>> {
        self.filter(opts, &TopicFilter::new().with_addresses(0, new_updater))
            .await
    }

    pub async fn filter_update_hash_chain_value(
        &self,
        opts: &FilterOpts,
        new_global_exit_root: &[B256],
        new_hash_chain_value: &[B256],
    ) -> Result<EventIterator<abi::UpdateHashChainValue>> {
        let topics = TopicFilter::new()
            .with(0, new_global_exit_root.iter().copied())
            .with(1, new_hash_chain_value.iter().copied());
        self.filter(opts, &topics).await
    }

    pub async fn filter_update_removal_hash_chain_value(
        &self,
        opts: &FilterOpts,
        removed_global_exit_root: &[B256],
        new_removal_hash_chain_value: &[B256],
    ) -> Result<EventIterator<abi::UpdateRemovalHashChainValue>> {
        let topics = TopicFilter::new()
            .with(0, removed_global_exit_root.iter().copied())
            .with(1, new_removal_hash_chain_value.iter().copied());
        self.filter(opts, &topics).await
    }

    /// Every event of the contract in the block range of `opts`.
    pub async fn filter_all(&self, opts: &FilterOpts) -> Result<EventIterator<GlobalExitRootEvent>> {
        self.filter(opts, &TopicFilter::new()).await
    }

    /// Streams new events of type `E` into `sink` until cancelled.
    pub async fn watch<E: ContractEvent>(
        &self,
        opts: &WatchOpts,
        topics: &TopicFilter,
        sink: mpsc::Sender<EventRecord<E>>,
    ) -> Result<EventWatch> {
        let filter = events::watch_filter::<E>(self.address, opts, topics);
        let subscription = self.backend.subscribe_logs(filter).await?;
        Ok(EventWatch::spawn(subscription, sink))
    }

    pub async fn watch_initialized(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<EventRecord<abi::Initialized>>,
    ) -> Result<EventWatch> {
        self.watch(opts, &TopicFilter::new(), sink).await
    }

    pub async fn watch_set_global_exit_root_remover(
        &self,
        opts: &WatchOpts,
        new_remover: &[Address],
        sink: mpsc::Sender<EventRecord<abi::SetGlobalExitRootRemover>>,
    ) -> Result<EventWatch> {
        self.watch(opts, &TopicFilter::new().with_addresses(0, new_remover), sink)
            .await
    }

    pub async fn watch_set_global_exit_root_updater(
        &self,
        opts: &WatchOpts,
        new_updater: &[Address],
        sink: mpsc::Sender<EventRecord<abi::SetGlobalExitRootUpdater>>,
    ) -> Result<EventWatch> {
        self.watch(opts, &TopicFilter::new().with_addresses(0, new_updater), sink)
            .await
    }

    pub async fn watch_update_hash_chain_value(
        &self,
        opts: &WatchOpts,
        new_global_exit_root: &[B256],
        new_hash_chain_value: &[B256],
        sink: mpsc::Sender<EventRecord<abi::UpdateHashChainValue>>,
    ) -> Result<EventWatch> {
        let topics = TopicFilter::new()
            .with(0, new_global_exit_root.iter().copied())
            .with(1, new_hash_chain_value.iter().copied());
        self.watch(opts, &topics, sink).await
    }

    pub async fn watch_update_removal_hash_chain_value(
        &self,
        opts: &WatchOpts,
        removed_global_exit_root: &[B256],
        new_removal_hash_chain_value: &[B256],
        sink: mpsc::Sender<EventRecord<abi::UpdateRemovalHashChainValue>>,
    ) -> Result<EventWatch> {
        let topics = TopicFilter::new()
            .with(0, removed_global_exit_root.iter().copied())
            .with(1, new_removal_hash_chain_value.iter().copied());
        self.watch(opts, &topics, sink).await
    }

    pub async fn watch_all(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<EventRecord<GlobalExitRootEvent>>,
    ) -> Result<EventWatch> {
        self.watch(opts, &TopicFilter::new(), sink).await
    }

    // ============ PLUMBING ============

    async fn call<C: SolCall>(&self, opts: &CallOpts, call: C) -> Result<C::Return> {
        let output = self.execute_call(opts, call.abi_encode()).await?;
        C::abi_decode_returns(&output, true).map_err(Error::decode(C::SIGNATURE))
    }

    async fn execute_call(&self, opts: &CallOpts, input: Vec<u8>) -> Result<Bytes> {
        let mut tx = TransactionRequest::default()
            .to(self.address)
            .input(Bytes::from(input).into());
        tx.from = opts.from;

        with_timeout(opts.timeout, self.backend.call(tx, opts.block))
            .await
            .map_err(Error::classify)
    }

    async fn transact(&self, opts: &TransactOpts, input: Vec<u8>) -> Result<PendingTransaction> {
        let tx = TransactionRequest::default()
            .to(self.address)
            .input(Bytes::from(input).into());
        submit(self.backend.as_ref(), opts, tx).await
    }
}

/// Fills in nonce and gas limit where `opts` leaves them open, then submits.
pub(crate) async fn submit<B: ContractBackend>(
    backend: &B,
    opts: &TransactOpts,
    tx: TransactionRequest,
) -> Result<PendingTransaction> {
    with_timeout(opts.timeout, async {
        let mut tx = opts.apply(tx);
        if tx.nonce.is_none() {
            tx.nonce = Some(backend.transaction_count(opts.from).await?);
        }
        if tx.gas.is_none() {
            let gas = backend
                .estimate_gas(tx.clone())
                .await
                .map_err(Error::classify)?;
            tx.gas = Some(gas.into());
        }

        let hash = backend
            .send_transaction(tx.clone())
            .await
            .map_err(Error::classify)?;
        debug!("transaction {hash} submitted from {}", opts.from);
        Ok(PendingTransaction { hash, request: tx })
    })
    .await
}

fn encode_input(
    method: &str,
    function: &alloy::json_abi::Function,
    args: &[DynSolValue],
) -> Result<Vec<u8>> {
    function
        .abi_encode_input(args)
        .map_err(|e| Error::InvalidArguments {
            method: method.to_string(),
            reason: e.to_string(),
        })
}

/// Calldata of `initialize(updater, remover)`.
pub fn encode_initialize(updater: Address, remover: Address) -> Vec<u8> {
    abi::initializeCall {
        _globalExitRootUpdater: updater,
        _globalExitRootRemover: remover,
    }
    .abi_encode()
}
