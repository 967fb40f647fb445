//! Frees for memory the library hands to the caller.

use super::graph::FlowConnectionInfo;
use std::ffi::{c_char, c_void, CString};
use std::ptr;

/// Free a string returned by this library. Null is ignored.
///
/// # Safety
/// `s` must be null or a string returned by a `flow_*` function that has
/// not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn flow_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Free a handle array. The handles themselves are not released.
///
/// # Safety
/// `array` must be null or an array returned by a `flow_*` function, and
/// `count` must be the length reported with it.
#[no_mangle]
pub unsafe extern "C" fn flow_free_handle_array(array: *mut *mut c_void, count: usize) {
    if !array.is_null() && count > 0 {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(array, count)));
    }
}

/// Free a string array and every string in it.
///
/// # Safety
/// `array` must be null or an array returned by a `flow_*` function, and
/// `count` must be the length reported with it.
#[no_mangle]
pub unsafe extern "C" fn flow_free_string_array(array: *mut *mut c_char, count: usize) {
    if array.is_null() || count == 0 {
        return;
    }
    let strings = Box::from_raw(ptr::slice_from_raw_parts_mut(array, count));
    for s in strings.iter() {
        flow_free_string(*s);
    }
}

/// Free a connection array and the strings of every entry.
///
/// # Safety
/// `connections` must be null or an array returned by
/// `flow_graph_get_connections`, and `count` must be the length reported
/// with it.
#[no_mangle]
pub unsafe extern "C" fn flow_free_connection_array(
    connections: *mut FlowConnectionInfo,
    count: usize,
) {
    if connections.is_null() || count == 0 {
        return;
    }
    let entries = Box::from_raw(ptr::slice_from_raw_parts_mut(connections, count));
    for entry in entries.iter() {
        for s in [
            entry.id,
            entry.source_node_id,
            entry.source_port_key,
            entry.target_node_id,
            entry.target_port_key,
        ] {
            flow_free_string(s);
        }
    }
}
