use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};

/// Filter directives for stderr logging, `RUST_LOG` syntax.
const LOG_VAR: &str = "GERCTL_LOG";
const DEFAULT_DIRECTIVES: &str = "warn,gerctl=info,sovereign_ger_bindings=info";

/// `GERCTL_LOG`, then `RUST_LOG`, then the default directives.
fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Logs to stderr so that stdout carries only the JSON reports.
pub(crate) fn init() {
    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .compact()
                .with_filter(filter()),
        )
        .init();
}
