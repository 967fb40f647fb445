//! C ABI surface.
//!
//! Every exported function is a thin adapter: it validates raw arguments,
//! resolves handles through the global registry, calls into [`crate::native`]
//! or [`crate::events`], and reports failure through [`crate::error_channel`].
//! Object results are always fresh handles owned by the caller.

pub mod data;
pub mod env;
pub mod errors;
pub mod events;
pub mod graph;
pub mod handles;
pub mod memory;
pub mod node;

use crate::error_channel::{guarded_status, to_c_message};
use crate::errors::{BridgeError, BridgeResult, FlowError};
use crate::handle::{Handle, HandleRegistry};
use flow_config::ConfigLoader;
use std::any::Any;
use std::ffi::{c_char, c_void, CStr};
use std::path::Path;
use std::sync::Arc;

/// Borrow a required C string argument.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> BridgeResult<&'a str> {
    if ptr.is_null() {
        return Err(BridgeError::null_argument(name));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument(format!("{} is not valid UTF-8", name)))
}

/// Hand a string to the caller; it must come back through `flow_free_string`
pub(crate) fn string_to_c(s: impl Into<String>) -> *mut c_char {
    to_c_message(s.into()).into_raw()
}

/// Resolve a handle argument to its native object
pub(crate) fn resolve<T: Any + Send + Sync>(raw: *mut c_void, name: &str) -> BridgeResult<Arc<T>> {
    let handle = Handle::from_raw(raw).ok_or_else(|| BridgeError::null_handle(name))?;
    HandleRegistry::global()
        .resolve::<T>(handle)
        .ok_or_else(|| BridgeError::unregistered(name))
}

/// Register a new handle for `value` in the global registry
pub(crate) fn into_handle<T: Any + Send + Sync>(value: Arc<T>) -> *mut c_void {
    HandleRegistry::global().register_shared(value).as_ptr()
}

/// Write through a required out-parameter
///
/// # Safety
/// `out` must be null or valid for a write of `T`.
pub(crate) unsafe fn write_out<T>(out: *mut T, name: &str, value: T) -> BridgeResult<()> {
    if out.is_null() {
        return Err(BridgeError::null_argument(name));
    }
    out.write(value);
    Ok(())
}

/// Hand `items` to the caller as a C array of `len()` elements; empty yields null.
///
/// Nothing is produced from `items` until the array is reserved. The array
/// must come back through the matching `flow_free_*_array` with its length.
pub(crate) fn into_c_array<T>(items: impl ExactSizeIterator<Item = T>) -> BridgeResult<(*mut T, usize)> {
    let count = items.len();
    if count == 0 {
        return Ok((std::ptr::null_mut(), 0));
    }
    let mut array = Vec::new();
    array.try_reserve_exact(count)?;
    array.extend(items);
    let count = array.len();
    Ok((Box::into_raw(array.into_boxed_slice()) as *mut T, count))
}

/// Write an array and its length through two required out-parameters
///
/// # Safety
/// `out` and `out_count` must be null or valid for writes.
pub(crate) unsafe fn write_array<T, F>(
    out: *mut *mut T,
    out_count: *mut usize,
    build: F,
) -> BridgeResult<()>
where
    F: FnOnce() -> BridgeResult<(*mut T, usize)>,
{
    if out.is_null() || out_count.is_null() {
        return Err(BridgeError::null_argument("output pointer"));
    }
    let (array, count) = build()?;
    write_out(out, "out", array)?;
    write_out(out_count, "out_count", count)
}

static VERSION_C: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Library version as a static NUL-terminated string. Never free it.
#[no_mangle]
pub extern "C" fn flow_version() -> *const c_char {
    VERSION_C.as_ptr() as *const c_char
}

/// Load configuration and install diagnostics logging.
///
/// With a null `config_path` the standard search is used (`FLOW_BRIDGE_CONFIG`,
/// then `flow-bridge.toml` upward from the working directory, then the global
/// file). Only the first successful call installs anything; later calls
/// succeed without changing the active configuration.
///
/// # Safety
/// `config_path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_initialize(config_path: *const c_char) -> FlowError {
    guarded_status("flow_initialize", || {
        let mut loader = ConfigLoader::new();
        let loaded = if config_path.is_null() {
            loader.load()
        } else {
            loader.load_from_file(Path::new(str_arg(config_path, "config_path")?))
        };
        let config =
            loaded.map_err(|e| BridgeError::InvalidArgument(format!("configuration: {}", e)))?;

        if !crate::install_config(config) {
            tracing::debug!("configuration already installed; keeping the active one");
        }
        crate::logging::init(crate::config());
        tracing::info!(version = crate::VERSION, "flow bridge initialized");
        Ok(())
    })
}
