//! Node and connection exports.
//!
//! Strings returned here are owned by the caller and must be freed with
//! `flow_free_string`.

use super::{into_c_array, into_handle, resolve, str_arg, string_to_c, write_array};
use crate::error_channel::{guarded, guarded_status};
use crate::errors::{BridgeError, FlowError};
use crate::native::{Connection, Node, NodeData};
use std::ffi::{c_char, c_void};
use std::ptr;

#[no_mangle]
pub extern "C" fn flow_node_get_id(node: *mut c_void) -> *mut c_char {
    guarded("flow_node_get_id", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Node>(node, "node")?.id()))
    })
}

#[no_mangle]
pub extern "C" fn flow_node_get_name(node: *mut c_void) -> *mut c_char {
    guarded("flow_node_get_name", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Node>(node, "node")?.name()))
    })
}

#[no_mangle]
pub extern "C" fn flow_node_get_class(node: *mut c_void) -> *mut c_char {
    guarded("flow_node_get_class", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Node>(node, "node")?.class_id()))
    })
}

/// Run the node's computation on the calling thread
#[no_mangle]
pub extern "C" fn flow_node_compute(node: *mut c_void) -> FlowError {
    guarded_status("flow_node_compute", || {
        resolve::<Node>(node, "node")?.compute();
        Ok(())
    })
}

/// # Safety
/// `port_key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_node_set_input(
    node: *mut c_void,
    port_key: *const c_char,
    data: *mut c_void,
) -> FlowError {
    guarded_status("flow_node_set_input", || {
        let node = resolve::<Node>(node, "node")?;
        let key = str_arg(port_key, "port_key")?;
        node.set_input(key, resolve::<NodeData>(data, "data")?);
        Ok(())
    })
}

/// # Safety
/// `port_key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_node_set_output(
    node: *mut c_void,
    port_key: *const c_char,
    data: *mut c_void,
) -> FlowError {
    guarded_status("flow_node_set_output", || {
        let node = resolve::<Node>(node, "node")?;
        let key = str_arg(port_key, "port_key")?;
        node.set_output(key, resolve::<NodeData>(data, "data")?);
        Ok(())
    })
}

/// New handle to the value on an input port, or null with `PortNotFound`
///
/// # Safety
/// `port_key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_node_get_input(
    node: *mut c_void,
    port_key: *const c_char,
) -> *mut c_void {
    guarded("flow_node_get_input", ptr::null_mut(), || {
        let key = str_arg(port_key, "port_key")?;
        let data = resolve::<Node>(node, "node")?
            .input(key)
            .ok_or_else(|| BridgeError::PortNotFound(key.to_string()))?;
        Ok(into_handle(data))
    })
}

/// New handle to the value on an output port, or null with `PortNotFound`
///
/// # Safety
/// `port_key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_node_get_output(
    node: *mut c_void,
    port_key: *const c_char,
) -> *mut c_void {
    guarded("flow_node_get_output", ptr::null_mut(), || {
        let key = str_arg(port_key, "port_key")?;
        let data = resolve::<Node>(node, "node")?
            .output(key)
            .ok_or_else(|| BridgeError::PortNotFound(key.to_string()))?;
        Ok(into_handle(data))
    })
}

/// Keys of the input ports that hold a value, in key order.
///
/// Free the array with `flow_free_string_array(*out_keys, *out_count)`.
///
/// # Safety
/// `out_keys` and `out_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_node_get_input_port_keys(
    node: *mut c_void,
    out_keys: *mut *mut *mut c_char,
    out_count: *mut usize,
) -> FlowError {
    guarded_status("flow_node_get_input_port_keys", || {
        let node = resolve::<Node>(node, "node")?;
        write_array(out_keys, out_count, || {
            into_c_array(node.input_keys().into_iter().map(string_to_c))
        })
    })
}

/// Keys of the output ports that hold a value, in key order.
///
/// Free the array with `flow_free_string_array(*out_keys, *out_count)`.
///
/// # Safety
/// `out_keys` and `out_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_node_get_output_port_keys(
    node: *mut c_void,
    out_keys: *mut *mut *mut c_char,
    out_count: *mut usize,
) -> FlowError {
    guarded_status("flow_node_get_output_port_keys", || {
        let node = resolve::<Node>(node, "node")?;
        write_array(out_keys, out_count, || {
            into_c_array(node.output_keys().into_iter().map(string_to_c))
        })
    })
}

#[no_mangle]
pub extern "C" fn flow_connection_get_id(connection: *mut c_void) -> *mut c_char {
    guarded("flow_connection_get_id", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Connection>(connection, "connection")?.id()))
    })
}

#[no_mangle]
pub extern "C" fn flow_connection_get_start_node_id(connection: *mut c_void) -> *mut c_char {
    guarded("flow_connection_get_start_node_id", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Connection>(connection, "connection")?.source_node()))
    })
}

#[no_mangle]
pub extern "C" fn flow_connection_get_start_port(connection: *mut c_void) -> *mut c_char {
    guarded("flow_connection_get_start_port", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Connection>(connection, "connection")?.source_port()))
    })
}

#[no_mangle]
pub extern "C" fn flow_connection_get_end_node_id(connection: *mut c_void) -> *mut c_char {
    guarded("flow_connection_get_end_node_id", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Connection>(connection, "connection")?.target_node()))
    })
}

#[no_mangle]
pub extern "C" fn flow_connection_get_end_port(connection: *mut c_void) -> *mut c_char {
    guarded("flow_connection_get_end_port", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<Connection>(connection, "connection")?.target_port()))
    })
}
