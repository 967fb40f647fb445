//! Thread-local error channel.
//!
//! Each thread holds at most one `{code, message}` record describing the
//! most recent failure of a boundary call made on that thread. Panics never
//! cross the boundary: [`guarded`] catches them at the entry point and turns
//! them into an error record plus a sentinel return value.

use crate::errors::{BridgeError, BridgeResult, FlowError};
use std::any::Any;
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::panic::{self, AssertUnwindSafe};

/// Message installed when a scope unwinds without recording anything
pub const UNHANDLED_PANIC_MESSAGE: &str = "Unhandled panic occurred";

struct ErrorRecord {
    code: FlowError,
    message: CString,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<ErrorRecord>> = const { RefCell::new(None) };
}

/// Record an error for the calling thread, replacing any previous one
pub fn set_error(code: FlowError, message: impl Into<String>) {
    let message = to_c_message(message.into());
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(ErrorRecord { code, message }));
}

/// Record a bridge error for the calling thread
pub fn record(error: &BridgeError) {
    set_error(error.code(), error.to_string());
}

/// Last error message on this thread, without clearing it
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|r| r.message.to_string_lossy().into_owned())
    })
}

/// Last error code on this thread; `Success` when nothing is recorded
pub fn last_error_code() -> FlowError {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|r| r.code)
            .unwrap_or(FlowError::Success)
    })
}

/// Remove this thread's record
pub fn clear_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Pointer to this thread's message, or null.
///
/// Valid until the next set or clear on the same thread.
pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |r| r.message.as_ptr())
    })
}

pub(crate) fn to_c_message(message: String) -> CString {
    CString::new(message).unwrap_or_else(|e| {
        let sanitized: Vec<u8> = e
            .into_vec()
            .into_iter()
            .map(|b| if b == 0 { b' ' } else { b })
            .collect();
        CString::new(sanitized).unwrap_or_default()
    })
}

/// Scoped guard that guarantees a deterministic error state on unwind.
///
/// If the thread is panicking when the scope drops and nothing was recorded
/// through the scope, a generic `Unknown` error is installed.
pub struct ErrorScope {
    error_set: bool,
}

impl ErrorScope {
    pub fn new() -> Self {
        Self { error_set: false }
    }

    pub fn set_error(&mut self, code: FlowError, message: impl Into<String>) {
        set_error(code, message);
        self.error_set = true;
    }

    pub fn record(&mut self, error: &BridgeError) {
        record(error);
        self.error_set = true;
    }

    pub fn clear_error(&mut self) {
        clear_error();
        self.error_set = true;
    }
}

impl Default for ErrorScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ErrorScope {
    fn drop(&mut self) {
        if !self.error_set && std::thread::panicking() {
            set_error(FlowError::Unknown, UNHANDLED_PANIC_MESSAGE);
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        UNHANDLED_PANIC_MESSAGE.to_string()
    }
}

fn run_guarded<T, F>(operation: &'static str, f: F) -> Result<T, FlowError>
where
    F: FnOnce() -> BridgeResult<T>,
{
    let mut scope = ErrorScope::new();
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            tracing::debug!(operation, code = error.code().code(), "{}", error);
            scope.record(&error);
            Err(error.code())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(operation, "panic caught at boundary: {}", message);
            scope.set_error(FlowError::Unknown, message);
            Err(FlowError::Unknown)
        }
    }
}

/// Run a boundary operation, converting failures into the error channel.
///
/// `Ok(v)` is returned as is. An `Err` is recorded for the calling thread
/// and `sentinel` is returned. A panic is caught, recorded as `Unknown`,
/// and `sentinel` is returned.
pub fn guarded<T, F>(operation: &'static str, sentinel: T, f: F) -> T
where
    F: FnOnce() -> BridgeResult<T>,
{
    run_guarded(operation, f).unwrap_or(sentinel)
}

/// [`guarded`] for operations that report a status code
pub fn guarded_status<F>(operation: &'static str, f: F) -> FlowError
where
    F: FnOnce() -> BridgeResult<()>,
{
    match run_guarded(operation, f) {
        Ok(()) => FlowError::Success,
        Err(code) => code,
    }
}
