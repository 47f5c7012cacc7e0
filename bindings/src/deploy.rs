use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxKind};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolConstructor;
use tracing::info;

use crate::abi;
use crate::backend::ContractBackend;
use crate::contract::{submit, GlobalExitRootManager, PendingTransaction};
use crate::descriptor::descriptor;
use crate::error::Result;
use crate::options::TransactOpts;

/// A submitted contract creation.
#[derive(Debug)]
pub struct Deployment<B> {
    /// Where the contract will live once the creation is included.
    pub address: Address,
    pub transaction: PendingTransaction,
    /// Handle bound to `address`. Usable before the creation is included,
    /// though calls fail or return empty data until it is.
    pub contract: GlobalExitRootManager<B>,
}

/// Creation code followed by the encoded constructor arguments.
pub fn creation_code(bridge_address: Address) -> Result<Bytes> {
    let mut code = descriptor()?.bytecode().to_vec();
    code.extend(
        abi::constructorCall {
            _bridgeAddress: bridge_address,
        }
        .abi_encode(),
    );
    Ok(code.into())
}

/// Deploys a new instance bound to `bridge_address`.
///
/// The address follows from the sender and the nonce of the creation, so it
/// is known as soon as the transaction is submitted.
pub async fn deploy<B: ContractBackend>(
    backend: Arc<B>,
    opts: &TransactOpts,
    bridge_address: Address,
) -> Result<Deployment<B>> {
    let nonce = match opts.nonce {
        Some(nonce) => nonce,
        None => backend.transaction_count(opts.from).await?,
    };
    let opts = opts.clone().with_nonce(nonce);

    let mut tx = TransactionRequest::default().input(creation_code(bridge_address)?.into());
    tx.to = Some(TxKind::Create);
    let transaction = submit(backend.as_ref(), &opts, tx).await?;

    let address = opts.from.create(nonce);
    info!(
        "deploying {} at {address} in transaction {}",
        abi::CONTRACT_NAME,
        transaction.hash
    );
    Ok(Deployment {
        address,
        transaction,
        contract: GlobalExitRootManager::new(address, backend)?,
    })
}
