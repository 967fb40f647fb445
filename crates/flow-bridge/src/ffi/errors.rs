//! Error channel exports. These never touch the slot except where stated.

use crate::error_channel;
use crate::errors::FlowError;
use std::ffi::{c_char, CStr};

/// Message of the calling thread's last error, or null.
///
/// The pointer stays valid until the next error is set or cleared on this
/// thread. Do not free it.
#[no_mangle]
pub extern "C" fn flow_get_last_error() -> *const c_char {
    error_channel::last_error_ptr()
}

/// Code of the calling thread's last error; `Success` when none
#[no_mangle]
pub extern "C" fn flow_get_last_error_code() -> FlowError {
    error_channel::last_error_code()
}

#[no_mangle]
pub extern "C" fn flow_clear_error() {
    error_channel::clear_error();
}

/// Record an error for the calling thread.
///
/// Unrecognized codes are stored as `Unknown`; a null message becomes
/// "Unknown error".
///
/// # Safety
/// `message` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_set_error(code: i32, message: *const c_char) {
    let message = if message.is_null() {
        "Unknown error".to_string()
    } else {
        CStr::from_ptr(message).to_string_lossy().into_owned()
    };
    error_channel::set_error(FlowError::from_code(code), message);
}
