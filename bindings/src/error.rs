use std::time::Duration;

use alloy::primitives::hex;
use alloy::primitives::{Bytes, U256};
use alloy::sol_types::{Panic, Revert, SolError};
use alloy::transports::{RpcError, TransportError};
use thiserror::Error;

use crate::abi;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of a binding operation.
///
/// Variants fall in three categories: transport failures (`Transport`,
/// `SubscriptionDropped`, `Timeout`, `Backend`), decode failures (`Decode`)
/// and failures signaled by the contract itself (`Contract`, `Reverted`).
/// The remaining variants reject a request before it leaves the process.
#[derive(Debug, Error)]
pub enum Error {
    /// The node was unreachable or rejected the request.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A live log feed ended or fell behind.
    #[error("log subscription dropped: {0}")]
    SubscriptionDropped(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend is shut down: {0}")]
    Backend(String),

    /// Returned data or an emitted log does not match the schema, on the
    /// typed and the dynamically typed surface alike.
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: alloy::dyn_abi::Error,
    },

    /// The contract rejected the call with one of its declared errors.
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    /// The contract rejected the call with an undeclared reason.
    #[error("execution reverted: {0}")]
    Reverted(RevertReason),

    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    #[error("invalid arguments for `{method}`: {reason}")]
    InvalidArguments { method: String, reason: String },

    #[error("invalid contract descriptor: {0}")]
    Descriptor(String),
}

impl Error {
    pub(crate) fn decode<E>(what: &'static str) -> impl FnOnce(E) -> Self
    where
        E: Into<alloy::dyn_abi::Error>,
    {
        move |source| Error::Decode {
            what,
            source: source.into(),
        }
    }

    /// Reclassifies a node-side revert carrying return data into a contract
    /// error. Everything else is returned untouched.
    pub(crate) fn classify(self) -> Self {
        let data = match &self {
            Error::Transport(RpcError::ErrorResp(payload)) => payload
                .data
                .as_ref()
                .and_then(|raw| serde_json::from_str::<Bytes>(raw.get()).ok()),
            _ => None,
        };
        match data {
            Some(data) if !data.is_empty() => Error::from_revert_data(&data),
            _ => self,
        }
    }

    /// Decodes revert data returned by the contract.
    pub fn from_revert_data(data: &[u8]) -> Self {
        if let Some(err) = ContractError::from_revert_data(data) {
            return Error::Contract(err);
        }
        Error::Reverted(RevertReason::from_revert_data(data))
    }

    /// The declared contract error, if this is one.
    pub fn as_contract_error(&self) -> Option<ContractError> {
        match self {
            Error::Contract(err) => Some(*err),
            _ => None,
        }
    }
}

/// The errors declared by the contract's interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ContractError {
    #[error("global exit root already set")]
    GlobalExitRootAlreadySet,
    #[error("global exit root not found")]
    GlobalExitRootNotFound,
    #[error("caller is not an allowed contract")]
    OnlyAllowedContracts,
    #[error("caller is not the global exit root remover")]
    OnlyGlobalExitRootRemover,
    #[error("caller is not the global exit root updater")]
    OnlyGlobalExitRootUpdater,
}

impl ContractError {
    pub const ALL: [ContractError; 5] = [
        ContractError::GlobalExitRootAlreadySet,
        ContractError::GlobalExitRootNotFound,
        ContractError::OnlyAllowedContracts,
        ContractError::OnlyGlobalExitRootRemover,
        ContractError::OnlyGlobalExitRootUpdater,
    ];

    pub const fn selector(self) -> [u8; 4] {
        match self {
            ContractError::GlobalExitRootAlreadySet => abi::GlobalExitRootAlreadySet::SELECTOR,
            ContractError::GlobalExitRootNotFound => abi::GlobalExitRootNotFound::SELECTOR,
            ContractError::OnlyAllowedContracts => abi::OnlyAllowedContracts::SELECTOR,
            ContractError::OnlyGlobalExitRootRemover => abi::OnlyGlobalExitRootRemover::SELECTOR,
            ContractError::OnlyGlobalExitRootUpdater => abi::OnlyGlobalExitRootUpdater::SELECTOR,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ContractError::GlobalExitRootAlreadySet => "GlobalExitRootAlreadySet",
            ContractError::GlobalExitRootNotFound => "GlobalExitRootNotFound",
            ContractError::OnlyAllowedContracts => "OnlyAllowedContracts",
            ContractError::OnlyGlobalExitRootRemover => "OnlyGlobalExitRootRemover",
            ContractError::OnlyGlobalExitRootUpdater => "OnlyGlobalExitRootUpdater",
        }
    }

    /// Matches revert data against the declared error selectors. The
    /// declared errors carry no arguments, so the data must be exactly the
    /// selector.
    pub fn from_revert_data(data: &[u8]) -> Option<Self> {
        if data.len() != 4 {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|err| err.selector().as_slice() == data)
    }

    /// Whether the caller lacks the role the operation requires, as opposed
    /// to the contract state rejecting the operation.
    pub const fn is_access_denied(self) -> bool {
        matches!(
            self,
            ContractError::OnlyAllowedContracts
                | ContractError::OnlyGlobalExitRootRemover
                | ContractError::OnlyGlobalExitRootUpdater
        )
    }
}

/// Revert reasons not declared by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    /// `Error(string)`, e.g. raised by the initializer guard.
    Message(String),
    /// `Panic(uint256)`.
    Panic(U256),
    Raw(Bytes),
}

impl RevertReason {
    pub fn from_revert_data(data: &[u8]) -> Self {
        if let Ok(revert) = Revert::abi_decode(data, true) {
            return RevertReason::Message(revert.reason);
        }
        if let Ok(panic) = Panic::abi_decode(data, true) {
            return RevertReason::Panic(panic.code);
        }
        RevertReason::Raw(Bytes::copy_from_slice(data))
    }
}

impl std::fmt::Display for RevertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevertReason::Message(reason) => write!(f, "{reason}"),
            RevertReason::Panic(code) => write!(f, "panic code {code:#x}"),
            RevertReason::Raw(data) => write!(f, "{}", hex::encode_prefixed(data)),
        }
    }
}
