//! JSON rendering of contract state and events.

use alloy::primitives::{Address, TxHash, B256, U256};
use serde::Serialize;
use serde_json::{json, Value};
use sovereign_ger_bindings::{abi, EventRecord, GlobalExitRootEvent};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateReport {
    pub(crate) contract: Address,
    pub(crate) bridge_address: Address,
    pub(crate) global_exit_root_updater: Address,
    pub(crate) global_exit_root_remover: Address,
    #[serde(rename = "insertedGERHashChain")]
    pub(crate) inserted_ger_hash_chain: B256,
    #[serde(rename = "removedGERHashChain")]
    pub(crate) removed_ger_hash_chain: B256,
    pub(crate) last_rollup_exit_root: B256,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RootReport {
    pub(crate) global_exit_root: B256,
    /// Insertion timestamp, zero when the root is not in the map.
    pub(crate) timestamp: U256,
    pub(crate) inserted: bool,
}

/// One line of `logs` and `watch` output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventLine {
    pub(crate) event: &'static str,
    pub(crate) block_number: Option<u64>,
    pub(crate) transaction_hash: Option<TxHash>,
    pub(crate) log_index: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub(crate) removed: bool,
    pub(crate) args: Value,
}

impl EventLine {
    pub(crate) fn new<E: Render>(record: &EventRecord<E>) -> Self {
        Self {
            event: record.event.name(),
            block_number: record.block_number(),
            transaction_hash: record.transaction_hash(),
            log_index: record.log_index(),
            removed: record.removed(),
            args: record.event.args(),
        }
    }
}

/// Name and arguments of an event, keyed as in the contract's interface.
pub(crate) trait Render {
    fn name(&self) -> &'static str;
    fn args(&self) -> Value;
}

impl Render for abi::Initialized {
    fn name(&self) -> &'static str {
        "Initialized"
    }

    fn args(&self) -> Value {
        json!({ "version": self.version })
    }
}

impl Render for abi::SetGlobalExitRootRemover {
    fn name(&self) -> &'static str {
        "SetGlobalExitRootRemover"
    }

    fn args(&self) -> Value {
        json!({ "newGlobalExitRootRemover": self.newGlobalExitRootRemover })
    }
}

impl Render for abi::SetGlobalExitRootUpdater {
    fn name(&self) -> &'static str {
        "SetGlobalExitRootUpdater"
    }

    fn args(&self) -> Value {
        json!({ "newGlobalExitRootUpdater": self.newGlobalExitRootUpdater })
    }
}

impl Render for abi::UpdateHashChainValue {
    fn name(&self) -> &'static str {
        "UpdateHashChainValue"
    }

    fn args(&self) -> Value {
        json!({
            "newGlobalExitRoot": self.newGlobalExitRoot,
            "newHashChainValue": self.newHashChainValue,
        })
    }
}

impl Render for abi::UpdateRemovalHashChainValue {
    fn name(&self) -> &'static str {
        "UpdateRemovalHashChainValue"
    }

    fn args(&self) -> Value {
        json!({
            "removedGlobalExitRoot": self.removedGlobalExitRoot,
            "newRemovalHashChainValue": self.newRemovalHashChainValue,
        })
    }
}

impl Render for GlobalExitRootEvent {
    fn name(&self) -> &'static str {
        GlobalExitRootEvent::name(self)
    }

    fn args(&self) -> Value {
        match self {
            GlobalExitRootEvent::Initialized(e) => e.args(),
            GlobalExitRootEvent::SetGlobalExitRootRemover(e) => e.args(),
            GlobalExitRootEvent::SetGlobalExitRootUpdater(e) => e.args(),
            GlobalExitRootEvent::UpdateHashChainValue(e) => e.args(),
            GlobalExitRootEvent::UpdateRemovalHashChainValue(e) => e.args(),
        }
    }
}
