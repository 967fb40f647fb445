//! Event subscription exports.
//!
//! Each `flow_*_on_*` function returns a registration handle, or null with
//! the error recorded. A successful subscribe or unregister clears the
//! calling thread's error slot.

use crate::error_channel::{self, guarded, guarded_status};
use crate::errors::{BridgeError, BridgeResult, FlowError};
use crate::events::{
    ConnectionEventFn, ErrorEventFn, EventBridge, NodeDataEventFn, NodeEventFn,
    RegistrationHandle, Subscription, UserData,
};
use crate::handle::Handle;
use std::ffi::c_void;
use std::ptr;

fn subscribe(
    operation: &'static str,
    source: *mut c_void,
    source_name: &str,
    subscription: Option<Subscription>,
    user_data: *mut c_void,
) -> *mut c_void {
    guarded(operation, ptr::null_mut(), || {
        let source = Handle::from_raw(source).ok_or_else(|| BridgeError::null_handle(source_name))?;
        let subscription = subscription.ok_or_else(|| BridgeError::null_argument("callback"))?;
        let registration =
            EventBridge::global().subscribe(source, subscription, UserData::from_ptr(user_data))?;
        error_channel::clear_error();
        Ok(registration.as_ptr())
    })
}

#[no_mangle]
pub extern "C" fn flow_graph_on_node_added(
    graph: *mut c_void,
    callback: Option<NodeEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_graph_on_node_added",
        graph,
        "graph",
        callback.map(Subscription::NodeAdded),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_graph_on_node_removed(
    graph: *mut c_void,
    callback: Option<NodeEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_graph_on_node_removed",
        graph,
        "graph",
        callback.map(Subscription::NodeRemoved),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_graph_on_nodes_connected(
    graph: *mut c_void,
    callback: Option<ConnectionEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_graph_on_nodes_connected",
        graph,
        "graph",
        callback.map(Subscription::NodesConnected),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_graph_on_nodes_disconnected(
    graph: *mut c_void,
    callback: Option<ConnectionEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_graph_on_nodes_disconnected",
        graph,
        "graph",
        callback.map(Subscription::NodesDisconnected),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_graph_on_error(
    graph: *mut c_void,
    callback: Option<ErrorEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_graph_on_error",
        graph,
        "graph",
        callback.map(Subscription::GraphError),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_node_on_compute(
    node: *mut c_void,
    callback: Option<NodeEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_node_on_compute",
        node,
        "node",
        callback.map(Subscription::Compute),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_node_on_error(
    node: *mut c_void,
    callback: Option<ErrorEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_node_on_error",
        node,
        "node",
        callback.map(Subscription::NodeError),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_node_on_set_input(
    node: *mut c_void,
    callback: Option<NodeDataEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_node_on_set_input",
        node,
        "node",
        callback.map(Subscription::SetInput),
        user_data,
    )
}

#[no_mangle]
pub extern "C" fn flow_node_on_set_output(
    node: *mut c_void,
    callback: Option<NodeDataEventFn>,
    user_data: *mut c_void,
) -> *mut c_void {
    subscribe(
        "flow_node_on_set_output",
        node,
        "node",
        callback.map(Subscription::SetOutput),
        user_data,
    )
}

fn registration_arg(raw: *mut c_void) -> BridgeResult<RegistrationHandle> {
    RegistrationHandle::from_raw(raw).ok_or_else(|| BridgeError::null_argument("registration"))
}

/// Remove a subscription. Unknown or already removed registrations fail
/// with `InvalidArgument`.
#[no_mangle]
pub extern "C" fn flow_event_unregister(registration: *mut c_void) -> FlowError {
    guarded_status("flow_event_unregister", || {
        EventBridge::global().unsubscribe(registration_arg(registration)?)?;
        error_channel::clear_error();
        Ok(())
    })
}

#[no_mangle]
pub extern "C" fn flow_event_is_valid(registration: *mut c_void) -> bool {
    RegistrationHandle::from_raw(registration)
        .is_some_and(|r| EventBridge::global().is_registered(r))
}
