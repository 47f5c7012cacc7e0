use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use alloy::providers::ProviderBuilder;
use anyhow::Context as _;
use clap::Parser as _;
use serde::Serialize;
use sovereign_ger_bindings::{
    abi, CallOpts, ContractBackend, ContractEvent, FilterOpts, GlobalExitRootEvent,
    GlobalExitRootManager, RpcBackend, TopicFilter, WatchOpts,
};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::{Cli, Command, EventKind};
use crate::report::{EventLine, Render, RootReport, StateReport};

mod cli;
mod env;
mod logging;
mod report;

/// Information for the `--version` flag.
pub(crate) fn version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Picks the event type matching an [`EventKind`] and runs `$f` with it.
macro_rules! with_event_kind {
    ($kind:expr, $f:ident($($arg:expr),*)) => {
        match $kind {
            EventKind::All => $f::<GlobalExitRootEvent, _>($($arg),*).await,
            EventKind::Initialized => $f::<abi::Initialized, _>($($arg),*).await,
            EventKind::SetRemover => $f::<abi::SetGlobalExitRootRemover, _>($($arg),*).await,
            EventKind::SetUpdater => $f::<abi::SetGlobalExitRootUpdater, _>($($arg),*).await,
            EventKind::UpdateHashChain => $f::<abi::UpdateHashChainValue, _>($($arg),*).await,
            EventKind::UpdateRemovalHashChain => {
                $f::<abi::UpdateRemovalHashChainValue, _>($($arg),*).await
            }
        }
    };
}

impl Cli {
    /// Execute the cli command.
    pub(crate) async fn execute(self) -> anyhow::Result<()> {
        let provider = ProviderBuilder::new()
            .on_builtin(self.config.rpc_url.as_str())
            .await
            .with_context(|| format!("failed to connect to {}", self.config.rpc_url))?;
        let backend =
            RpcBackend::with_max_parallel_requests(provider, self.config.max_parallel_requests);
        let manager = GlobalExitRootManager::new(self.config.contract, Arc::new(backend))?;
        let timeout = self.config.timeout.map(Duration::from_secs);

        match self.command {
            Command::State { block } => {
                let report = read_state(&manager, &call_opts(block, timeout)).await?;
                print_pretty(&report)?;
            }
            Command::Root {
                global_exit_root,
                block,
            } => {
                let timestamp = manager
                    .global_exit_root_map(&call_opts(block, timeout), global_exit_root)
                    .await
                    .with_context(|| format!("failed to look up {global_exit_root}"))?;
                print_pretty(&RootReport {
                    global_exit_root,
                    timestamp,
                    inserted: !timestamp.is_zero(),
                })?;
            }
            Command::Logs {
                from_block,
                to_block,
                event,
            } => {
                let opts = FilterOpts {
                    from_block,
                    to_block,
                    timeout,
                };
                with_event_kind!(event, print_logs(&manager, &opts))?;
            }
            Command::Watch {
                from_block,
                event,
                buffer,
            } => {
                let opts = WatchOpts { from_block };
                with_event_kind!(event, follow(&manager, &opts, buffer))?;
            }
        }
        Ok(())
    }
}

fn call_opts(block: Option<u64>, timeout: Option<Duration>) -> CallOpts {
    let mut opts = CallOpts::default();
    if let Some(block) = block {
        opts = opts.with_block(block);
    }
    if let Some(timeout) = timeout {
        opts = opts.with_timeout(timeout);
    }
    opts
}

async fn read_state<B: ContractBackend>(
    manager: &GlobalExitRootManager<B>,
    opts: &CallOpts,
) -> anyhow::Result<StateReport> {
    let (
        bridge_address,
        global_exit_root_updater,
        global_exit_root_remover,
        inserted_ger_hash_chain,
        removed_ger_hash_chain,
        last_rollup_exit_root,
    ) = tokio::try_join!(
        manager.bridge_address(opts),
        manager.global_exit_root_updater(opts),
        manager.global_exit_root_remover(opts),
        manager.inserted_ger_hash_chain(opts),
        manager.removed_ger_hash_chain(opts),
        manager.last_rollup_exit_root(opts),
    )
    .with_context(|| format!("failed to read the state of {}", manager.address()))?;

    Ok(StateReport {
        contract: manager.address(),
        bridge_address,
        global_exit_root_updater,
        global_exit_root_remover,
        inserted_ger_hash_chain,
        removed_ger_hash_chain,
        last_rollup_exit_root,
    })
}

async fn print_logs<E, B>(manager: &GlobalExitRootManager<B>, opts: &FilterOpts) -> anyhow::Result<()>
where
    E: ContractEvent + Render,
    B: ContractBackend,
{
    let records = manager
        .filter::<E>(opts, &TopicFilter::new())
        .await
        .with_context(|| format!("failed to query {} logs", E::NAME))?;

    let mut printed = 0;
    for record in records {
        let record = record.context("node returned a malformed log")?;
        print_line(&EventLine::new(&record))?;
        printed += 1;
    }
    info!("printed {printed} {} events", E::NAME);
    Ok(())
}

async fn follow<E, B>(
    manager: &GlobalExitRootManager<B>,
    opts: &WatchOpts,
    buffer: usize,
) -> anyhow::Result<()>
where
    E: ContractEvent + Render,
    B: ContractBackend,
{
    let (tx, mut rx) = mpsc::channel(buffer.max(1));
    let watch = manager
        .watch::<E>(opts, &TopicFilter::new(), tx)
        .await
        .with_context(|| format!("failed to subscribe to {} logs", E::NAME))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for interrupts")?;
                info!("interrupted");
                break;
            }
            record = rx.recv() => match record {
                Some(record) => print_line(&EventLine::new(&record))?,
                None => break,
            },
        }
    }

    let end = watch.stop().await.context("watch failed")?;
    info!("watch ended: {end:?}");
    Ok(())
}

fn print_pretty(value: &impl Serialize) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_line(value: &impl Serialize) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = env::load_settings();
    logging::init();
    env::report(&settings);

    Cli::parse().execute().await
}
