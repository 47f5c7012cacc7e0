//! Per-invocation configuration for calls, transactions and log queries.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::rpc::types::{BlockId, TransactionRequest};

use crate::error::{Error, Result};

/// Options for read-only calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOpts {
    /// Caller the call is executed as, if any.
    pub from: Option<Address>,
    /// State the call is executed against.
    pub block: BlockId,
    pub timeout: Option<Duration>,
}

impl Default for CallOpts {
    fn default() -> Self {
        Self {
            from: None,
            block: BlockId::latest(),
            timeout: None,
        }
    }
}

impl CallOpts {
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_block(mut self, block: impl Into<BlockId>) -> Self {
        self.block = block.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options for state-changing transactions.
///
/// Unset nonce and gas limit are filled from the node before submission.
/// Fee fields left unset are left to the node or the provider's fillers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactOpts {
    pub from: Address,
    pub nonce: Option<u64>,
    pub value: U256,
    pub gas_limit: Option<u64>,
    /// Legacy gas price. Mutually exclusive with the EIP-1559 fee fields.
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub timeout: Option<Duration>,
}

impl TransactOpts {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            ..Default::default()
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_eip1559_fees(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Applies the sender, value and fee settings to `tx`.
    pub(crate) fn apply(&self, mut tx: TransactionRequest) -> TransactionRequest {
        tx.from = Some(self.from);
        tx.value = Some(self.value);
        if let Some(nonce) = self.nonce {
            tx.nonce = Some(nonce);
        }
        if let Some(gas_limit) = self.gas_limit {
            tx.gas = Some(gas_limit.into());
        }
        if let Some(gas_price) = self.gas_price {
            tx.gas_price = Some(gas_price);
        }
        if let Some(max_fee_per_gas) = self.max_fee_per_gas {
            tx.max_fee_per_gas = Some(max_fee_per_gas);
        }
        if let Some(max_priority_fee_per_gas) = self.max_priority_fee_per_gas {
            tx.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        }
        tx
    }
}

/// Block range of a historical log query. Both bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOpts {
    pub from_block: u64,
    /// `None` queries up to the latest block.
    pub to_block: Option<u64>,
    pub timeout: Option<Duration>,
}

impl FilterOpts {
    pub fn range(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block: Some(to_block),
            timeout: None,
        }
    }

    pub fn from_block(from_block: u64) -> Self {
        Self {
            from_block,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options of a live log subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOpts {
    /// First block to deliver logs for. `None` starts at the head.
    pub from_block: Option<u64>,
}

impl WatchOpts {
    pub fn from_block(from_block: u64) -> Self {
        Self {
            from_block: Some(from_block),
        }
    }
}

/// Runs `fut`, failing with [`Error::Timeout`] once `timeout` elapses.
pub(crate) async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| Error::Timeout(timeout))?,
        None => fut.await,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transact_opts_apply() {
        let from = Address::repeat_byte(0x11);
        let tx = TransactOpts::new(from)
            .with_nonce(7)
            .with_gas_limit(100_000)
            .with_eip1559_fees(30, 2)
            .apply(TransactionRequest::default());

        assert_eq!(tx.from, Some(from));
        assert_eq!(tx.nonce, Some(7));
        assert_eq!(tx.value, Some(U256::ZERO));
        assert!(tx.gas.is_some());
        assert_eq!(tx.max_fee_per_gas, Some(30));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2));
        assert_eq!(tx.gas_price, None);
    }

    #[test]
    fn transact_opts_leave_unset_fields() {
        let tx = TransactOpts::new(Address::ZERO).apply(TransactionRequest::default());
        assert_eq!(tx.nonce, None);
        assert_eq!(tx.gas, None);
    }

    #[tokio::test]
    async fn timeout_elapses() {
        let res = with_timeout(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn no_timeout_passes_through() {
        assert_eq!(with_timeout(None, async { Ok(3) }).await.unwrap(), 3);
    }
}
