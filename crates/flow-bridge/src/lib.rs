//! Flow Bridge
//!
//! Boundary layer that lets a host runtime without access to native memory
//! drive a native flow graph through a C ABI:
//!
//! - [`handle`]: type-erased, reference-counted registry of opaque handles
//! - [`error_channel`]: per-thread last-error record; panics never cross
//!   the boundary
//! - [`events`]: subscriptions that deliver native events to C callbacks
//!
//! The [`native`] module holds the graph objects these mechanisms expose, and
//! [`ffi`] is the exported `flow_*` surface.

pub mod error_channel;
pub mod errors;
pub mod events;
pub mod ffi;
pub mod handle;
pub mod logging;
pub mod native;

mod token;

pub use error_channel::{guarded, guarded_status, ErrorScope};
pub use errors::{BridgeError, BridgeResult, FlowError};
pub use events::{EventBridge, EventKind, RegistrationHandle, Subscription, UserData};
pub use flow_config::BridgeConfig;
pub use handle::{Handle, HandleRegistry};

use std::sync::OnceLock;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

/// Install the process configuration. Only the first call takes effect.
///
/// Returns `false` if a configuration was already active.
pub fn install_config(config: BridgeConfig) -> bool {
    CONFIG.set(config).is_ok()
}

/// Active configuration; built-in defaults until one is installed
pub fn config() -> &'static BridgeConfig {
    CONFIG.get_or_init(BridgeConfig::default)
}
