//! Client binding for the `GlobalExitRootManagerL2SovereignChain` contract,
//! the global exit root registry of sovereign chains in the unified bridge.
//!
//! The contract keeps a map from inserted global exit roots to their
//! insertion timestamp, two hash chains over inserted and removed roots, and
//! the roles allowed to change them. This crate lets you:
//! - read its state with typed view calls,
//! - submit its state-changing functions as transactions,
//! - query and decode its historical events,
//! - stream its live events into a channel,
//! - deploy new instances.
//!
//! Everything goes through a [`ContractBackend`]. [`RpcBackend`] implements
//! it over any alloy provider:
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//!
//! use alloy::providers::ProviderBuilder;
//! use sovereign_ger_bindings::{CallOpts, GlobalExitRootManager, RpcBackend};
//!
//! let provider = ProviderBuilder::new().on_builtin("http://localhost:8545").await?;
//! let manager = GlobalExitRootManager::new(
//!     "0xa40d5f56745a118d0906a34e69aec8c0db1cb8fa".parse()?,
//!     Arc::new(RpcBackend::new(provider)),
//! )?;
//! let root = manager.last_rollup_exit_root(&CallOpts::default()).await?;
//! # let _ = root;
//! # Ok(())
//! # }
//! ```
//!
//! # Non-Goals
//! - Waiting for inclusion. Writes return once the node accepted the
//!   transaction.
//! - Key management. Signing is left to the provider.

pub mod abi;
pub mod backend;
pub mod contract;
pub mod deploy;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod options;
pub mod watch;

pub use backend::{ContractBackend, LogSubscription, RpcBackend};
pub use contract::{encode_initialize, GlobalExitRootManager, PendingTransaction};
pub use deploy::{creation_code, deploy, Deployment};
pub use descriptor::{descriptor, ContractDescriptor};
pub use error::{ContractError, Error, Result, RevertReason};
pub use events::{
    parse_log, ContractEvent, EventIterator, EventRecord, GlobalExitRootEvent, TopicFilter,
};
pub use options::{CallOpts, FilterOpts, TransactOpts, WatchOpts};
pub use watch::{EventWatch, WatchEnd, MAX_PENDING_EVENTS};
