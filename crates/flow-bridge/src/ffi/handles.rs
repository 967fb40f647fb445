//! Handle lifetime exports. Invalid handles are silent no-ops.

use crate::handle::{Handle, HandleRegistry};
use std::ffi::c_void;

#[no_mangle]
pub extern "C" fn flow_is_valid_handle(handle: *mut c_void) -> bool {
    Handle::from_raw(handle).is_some_and(|h| HandleRegistry::global().is_valid(h))
}

#[no_mangle]
pub extern "C" fn flow_retain_handle(handle: *mut c_void) {
    if let Some(h) = Handle::from_raw(handle) {
        HandleRegistry::global().retain(h);
    }
}

/// Drop one reference; the object is destroyed when the last one goes
#[no_mangle]
pub extern "C" fn flow_release_handle(handle: *mut c_void) {
    if let Some(h) = Handle::from_raw(handle) {
        HandleRegistry::global().release(h);
    }
}

/// Current reference count, or 0 for an invalid handle
#[no_mangle]
pub extern "C" fn flow_get_ref_count(handle: *mut c_void) -> i32 {
    Handle::from_raw(handle).map_or(0, |h| HandleRegistry::global().ref_count(h))
}
