//! Diagnostic logging.
//!
//! Output goes to stderr so it never mixes with a host's stdout protocol.

use flow_config::BridgeConfig;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber described by `config`.
///
/// Returns `false` if a subscriber was already installed, by this call or by
/// the host process. An unparsable filter falls back to the default one.
pub fn init(config: &BridgeConfig) -> bool {
    let filter = EnvFilter::try_new(config.log_filter())
        .unwrap_or_else(|_| EnvFilter::new(flow_config::bridge::DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.log_ansi())
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
