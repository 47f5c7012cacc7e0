use alloy::primitives::{Address, B256};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use url::Url;

const DEFAULT_MAX_PARALLEL_REQUESTS: usize = 128;

/// Inspect and follow a sovereign chain's global exit root manager.
///
/// Logs go to stderr, filtered by `GERCTL_LOG` or `RUST_LOG`.
#[derive(Parser)]
#[command(version = crate::version(), propagate_version = true)]
pub(crate) struct Cli {
    #[clap(flatten)]
    pub(crate) config: NodeConfig,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct NodeConfig {
    /// The node RPC URL. `watch` needs a websocket endpoint.
    #[arg(short = 'u', long, env = "GERCTL_RPC_URL", value_hint = ValueHint::Url)]
    pub(crate) rpc_url: Url,
    /// Address of the GlobalExitRootManagerL2SovereignChain instance.
    #[arg(short = 'c', long, env = "GERCTL_CONTRACT")]
    pub(crate) contract: Address,
    /// Upper bound on concurrent requests to the node.
    #[arg(long, env = "GERCTL_MAX_PARALLEL_REQUESTS", default_value_t = DEFAULT_MAX_PARALLEL_REQUESTS)]
    pub(crate) max_parallel_requests: usize,
    /// Per-request timeout in seconds. Unbounded when not set.
    #[arg(long, env = "GERCTL_TIMEOUT")]
    pub(crate) timeout: Option<u64>,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Prints roles, hash chains and the last rollup exit root.
    State {
        /// Block to read the state at. Latest when not set.
        #[arg(short, long)]
        block: Option<u64>,
    },
    /// Prints the insertion timestamp of a global exit root, 0 if absent.
    Root {
        global_exit_root: B256,
        #[arg(short, long)]
        block: Option<u64>,
    },
    /// Prints past events, one JSON object per line.
    Logs {
        /// First block of the range (inclusive).
        #[arg(short = 's', long, default_value_t = 0)]
        from_block: u64,
        /// Last block of the range (inclusive). Latest when not set.
        #[arg(short = 'e', long)]
        to_block: Option<u64>,
        #[arg(long, value_enum, default_value = "all")]
        event: EventKind,
    },
    /// Follows new events until interrupted, one JSON object per line.
    Watch {
        /// Replay from this block before following the head.
        #[arg(short = 's', long)]
        from_block: Option<u64>,
        #[arg(long, value_enum, default_value = "all")]
        event: EventKind,
        /// Capacity of the delivery buffer.
        #[arg(long, default_value_t = 64)]
        buffer: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EventKind {
    All,
    Initialized,
    SetRemover,
    SetUpdater,
    UpdateHashChain,
    UpdateRemovalHashChain,
}
