//! Port value exports.

use super::{into_handle, resolve, str_arg, string_to_c, write_out};
use crate::error_channel::{guarded, guarded_status};
use crate::errors::{BridgeError, FlowError};
use crate::handle::{Handle, HandleRegistry};
use crate::native::NodeData;
use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

fn create(value: NodeData) -> *mut c_void {
    into_handle(Arc::new(value))
}

#[no_mangle]
pub extern "C" fn flow_data_create_int(value: i32) -> *mut c_void {
    create(NodeData::Int(value))
}

#[no_mangle]
pub extern "C" fn flow_data_create_double(value: f64) -> *mut c_void {
    create(NodeData::Double(value))
}

#[no_mangle]
pub extern "C" fn flow_data_create_bool(value: bool) -> *mut c_void {
    create(NodeData::Bool(value))
}

/// # Safety
/// `value` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_data_create_string(value: *const c_char) -> *mut c_void {
    guarded("flow_data_create_string", ptr::null_mut(), || {
        Ok(create(NodeData::Text(str_arg(value, "value")?.to_string())))
    })
}

/// # Safety
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_data_get_int(data: *mut c_void, out: *mut i32) -> FlowError {
    guarded_status("flow_data_get_int", || {
        let value = resolve::<NodeData>(data, "data")?.as_int()?;
        write_out(out, "out", value)
    })
}

/// # Safety
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_data_get_double(data: *mut c_void, out: *mut f64) -> FlowError {
    guarded_status("flow_data_get_double", || {
        let value = resolve::<NodeData>(data, "data")?.as_double()?;
        write_out(out, "out", value)
    })
}

/// # Safety
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_data_get_bool(data: *mut c_void, out: *mut bool) -> FlowError {
    guarded_status("flow_data_get_bool", || {
        let value = resolve::<NodeData>(data, "data")?.as_bool()?;
        write_out(out, "out", value)
    })
}

/// Copy of a string value; free it with `flow_free_string`
///
/// # Safety
/// `out` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_data_get_string(data: *mut c_void, out: *mut *mut c_char) -> FlowError {
    guarded_status("flow_data_get_string", || {
        let data = resolve::<NodeData>(data, "data")?;
        let value = data.as_str()?;
        if out.is_null() {
            return Err(BridgeError::null_argument("out"));
        }
        write_out(out, "out", string_to_c(value))
    })
}

/// Type name (`int`, `double`, `bool`, `string`); free it with `flow_free_string`
#[no_mangle]
pub extern "C" fn flow_data_get_type(data: *mut c_void) -> *mut c_char {
    guarded("flow_data_get_type", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<NodeData>(data, "data")?.type_name()))
    })
}

/// Display form of the value; free it with `flow_free_string`
#[no_mangle]
pub extern "C" fn flow_data_to_string(data: *mut c_void) -> *mut c_char {
    guarded("flow_data_to_string", ptr::null_mut(), || {
        Ok(string_to_c(resolve::<NodeData>(data, "data")?.to_string()))
    })
}

/// Release the caller's data handle
#[no_mangle]
pub extern "C" fn flow_data_destroy(data: *mut c_void) {
    if let Some(handle) = Handle::from_raw(data) {
        HandleRegistry::global().release(handle);
    }
}
