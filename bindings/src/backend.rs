use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use alloy::primitives::{Address, Bytes, TxHash, B256};
use alloy::rpc::types::{BlockId, Filter, Log, TransactionRequest};
use alloy::{providers::Provider, transports::Transport};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt as _};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const MAX_NUMBER_OF_PARALLEL_REQUESTS: usize = 128;

/// Everything the binding needs from an execution node.
#[cfg_attr(test, mockall::automock)]
pub trait ContractBackend: Send + Sync {
    /// Read-only execution of `tx` against the state at `block`.
    fn call(
        &self,
        tx: TransactionRequest,
        block: BlockId,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    fn estimate_gas(&self, tx: TransactionRequest) -> impl Future<Output = Result<u64>> + Send;

    /// Nonce of the next transaction from `address`, pending ones included.
    fn transaction_count(&self, address: Address) -> impl Future<Output = Result<u64>> + Send;

    /// Submits `tx` without waiting for it to be included.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    fn get_logs(&self, filter: Filter) -> impl Future<Output = Result<Vec<Log>>> + Send;

    fn subscribe_logs(
        &self,
        filter: Filter,
    ) -> impl Future<Output = Result<LogSubscription>> + Send;
}

/// A live feed of logs matching a filter.
///
/// Holds a transport-level listener. The listener is released exactly once,
/// either by [`LogSubscription::unsubscribe`] or when the subscription is
/// dropped.
pub struct LogSubscription {
    id: B256,
    logs: BoxStream<'static, Result<Log>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LogSubscription {
    pub fn new(
        id: B256,
        logs: BoxStream<'static, Result<Log>>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            id,
            logs,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> B256 {
        self.id
    }

    /// Releases the underlying listener.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            debug!("releasing log subscription {}", self.id);
            release();
        }
    }
}

impl Stream for LogSubscription {
    type Item = Result<Log>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.logs.as_mut().poll_next(cx)
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSubscription")
            .field("id", &self.id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// [`ContractBackend`] over an alloy provider.
pub struct RpcBackend<ProviderT, TransportT> {
    provider: Arc<ProviderT>,
    // `Alloy` provider is using `Reqwest` http client under the hood. It has an unbounded
    // connection pool. We need to limit the number of parallel connections by ourselves, so we
    // use semaphore to count the number of parallel RPC requests happening at any moment.
    semaphore: Arc<Semaphore>,
    _phantom: std::marker::PhantomData<TransportT>,
}

impl<ProviderT, TransportT> RpcBackend<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    pub fn new(provider: ProviderT) -> Self {
        Self::with_max_parallel_requests(provider, MAX_NUMBER_OF_PARALLEL_REQUESTS)
    }

    pub fn with_max_parallel_requests(provider: ProviderT, max_parallel_requests: usize) -> Self {
        Self {
            provider: provider.into(),
            semaphore: Arc::new(Semaphore::new(max_parallel_requests.max(1))),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn provider(&self) -> &Arc<ProviderT> {
        &self.provider
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|e| Error::Backend(e.to_string()))
    }
}

impl<ProviderT, TransportT> ContractBackend for RpcBackend<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT> + 'static,
    TransportT: Transport + Clone,
{
    async fn call(&self, tx: TransactionRequest, block: BlockId) -> Result<Bytes> {
        let _permit = self.permit().await?;
        debug!("eth_call to {:?} at {block:?}", tx.to);
        Ok(self.provider.call(&tx).block(block).await?)
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        let _permit = self.permit().await?;
        let gas = self.provider.estimate_gas(&tx).await?;
        u64::try_from(gas).map_err(|_| Error::Backend(format!("gas estimate {gas} out of range")))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        let _permit = self.permit().await?;
        Ok(self
            .provider
            .get_transaction_count(address)
            .block_id(BlockId::pending())
            .await?)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let _permit = self.permit().await?;
        let pending = self.provider.send_transaction(tx).await?;
        let hash = *pending.tx_hash();
        debug!("submitted transaction {hash}");
        Ok(hash)
    }

    async fn get_logs(&self, filter: Filter) -> Result<Vec<Log>> {
        let _permit = self.permit().await?;
        Ok(self.provider.get_logs(&filter).await?)
    }

    async fn subscribe_logs(&self, filter: Filter) -> Result<LogSubscription> {
        let mut subscription = {
            let _permit = self.permit().await?;
            self.provider.subscribe_logs(&filter).await?
        };
        let id = *subscription.local_id();

        let logs = stream! {
            loop {
                match subscription.recv().await {
                    Ok(log) => yield Ok(log),
                    Err(e) => {
                        yield Err(Error::SubscriptionDropped(e.to_string()));
                        break;
                    }
                }
            }
        };

        // Only queues `eth_unsubscribe` on the pubsub service, fine to run from
        // `Drop` outside a runtime.
        let provider = self.provider.clone();
        Ok(LogSubscription::new(id, logs.boxed(), move || {
            if let Err(e) = provider.root().unsubscribe(id) {
                warn!("failed to unsubscribe from log subscription {id}: {e}");
            }
        }))
    }
}
