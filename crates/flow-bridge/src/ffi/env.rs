//! Execution environment exports.

use super::{into_handle, resolve};
use crate::error_channel::{guarded, guarded_status};
use crate::errors::{BridgeError, FlowError};
use crate::handle::{Handle, HandleRegistry};
use crate::native::Env;
use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

/// Create an environment with `max_threads` workers; 0 uses the configured
/// default. Negative counts and counts above `flow_config::MAX_THREADS` are
/// invalid arguments. Returns null on failure.
#[no_mangle]
pub extern "C" fn flow_env_create(max_threads: i32) -> *mut c_void {
    guarded("flow_env_create", ptr::null_mut(), || {
        let threads = usize::try_from(max_threads).map_err(|_| {
            BridgeError::InvalidArgument(format!(
                "max_threads must not be negative, got {}",
                max_threads
            ))
        })?;
        Ok(into_handle(Arc::new(Env::new(threads)?)))
    })
}

/// Release the caller's environment handle. Graphs created on it keep it alive.
#[no_mangle]
pub extern "C" fn flow_env_destroy(env: *mut c_void) {
    if let Some(handle) = Handle::from_raw(env) {
        HandleRegistry::global().release(handle);
    }
}

/// Block until all work queued on `env` has finished.
///
/// Called from one of `env`'s own workers it fails with `InvalidArgument`
/// instead of blocking forever.
#[no_mangle]
pub extern "C" fn flow_env_wait(env: *mut c_void) -> FlowError {
    guarded_status("flow_env_wait", || {
        resolve::<Env>(env, "env")?.wait()
    })
}
