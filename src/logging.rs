use crate::config::LedgerConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// invocation payloads. `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_logging(config: &LedgerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    // try_init: a subscriber may already be installed (tests, embedding).
    let _ = if config.log_json {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_ansi(false);
        registry.with(layer).try_init()
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()
    };
}
