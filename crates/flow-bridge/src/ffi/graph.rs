//! Graph exports.

use super::{into_c_array, into_handle, resolve, str_arg, string_to_c, write_array};
use crate::error_channel::{self, guarded, guarded_status};
use crate::errors::{BridgeError, FlowError};
use crate::events::EventBridge;
use crate::handle::{Handle, HandleRegistry};
use crate::native::{Connection, Env, Graph};
use std::ffi::{c_char, c_void};
use std::ptr;
use std::sync::Arc;

#[no_mangle]
pub extern "C" fn flow_graph_create(env: *mut c_void) -> *mut c_void {
    guarded("flow_graph_create", ptr::null_mut(), || {
        let env = resolve::<Env>(env, "env")?;
        let graph = into_handle(Arc::new(Graph::new(env)));
        error_channel::clear_error();
        Ok(graph)
    })
}

/// Release the caller's graph handle. Once the graph is gone, subscriptions
/// bound on it are discarded; subscriptions on other sources are kept until
/// unregistered.
#[no_mangle]
pub extern "C" fn flow_graph_destroy(graph: *mut c_void) {
    let Some(handle) = Handle::from_raw(graph) else {
        return;
    };
    let registry = HandleRegistry::global();
    let source = registry.resolve::<Graph>(handle).map(|g| Arc::downgrade(&g));
    if registry.release(handle) {
        if let Some(source) = source {
            EventBridge::global().prune_graph(&source);
        }
    }
}

/// # Safety
/// `class_id` and `name` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_add_node(
    graph: *mut c_void,
    class_id: *const c_char,
    name: *const c_char,
) -> *mut c_void {
    guarded("flow_graph_add_node", ptr::null_mut(), || {
        let graph = resolve::<Graph>(graph, "graph")?;
        let node = graph.add_node(str_arg(class_id, "class_id")?, str_arg(name, "name")?)?;
        Ok(into_handle(node))
    })
}

/// # Safety
/// `node_id` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_remove_node(
    graph: *mut c_void,
    node_id: *const c_char,
) -> FlowError {
    guarded_status("flow_graph_remove_node", || {
        resolve::<Graph>(graph, "graph")?.remove_node(str_arg(node_id, "node_id")?)
    })
}

/// New handle to the node with `node_id`, or null
///
/// # Safety
/// `node_id` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_get_node(
    graph: *mut c_void,
    node_id: *const c_char,
) -> *mut c_void {
    guarded("flow_graph_get_node", ptr::null_mut(), || {
        let node_id = str_arg(node_id, "node_id")?;
        let node = resolve::<Graph>(graph, "graph")?
            .node(node_id)
            .ok_or_else(|| BridgeError::NodeNotFound(node_id.to_string()))?;
        Ok(into_handle(node))
    })
}

/// Fresh handles for every node.
///
/// On success `*out_nodes` holds `*out_count` handles, or null when the
/// graph is empty. Release each handle, then free the array with
/// `flow_free_handle_array(*out_nodes, *out_count)`.
///
/// # Safety
/// `out_nodes` and `out_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_get_nodes(
    graph: *mut c_void,
    out_nodes: *mut *mut *mut c_void,
    out_count: *mut usize,
) -> FlowError {
    guarded_status("flow_graph_get_nodes", || {
        let graph = resolve::<Graph>(graph, "graph")?;
        write_array(out_nodes, out_count, || {
            into_c_array(graph.nodes().into_iter().map(into_handle))
        })
    })
}

/// One connection as reported by `flow_graph_get_connections`
#[repr(C)]
#[derive(Debug)]
pub struct FlowConnectionInfo {
    pub id: *mut c_char,
    pub source_node_id: *mut c_char,
    pub source_port_key: *mut c_char,
    pub target_node_id: *mut c_char,
    pub target_port_key: *mut c_char,
}

impl FlowConnectionInfo {
    fn new(connection: &Connection) -> Self {
        Self {
            id: string_to_c(connection.id()),
            source_node_id: string_to_c(connection.source_node()),
            source_port_key: string_to_c(connection.source_port()),
            target_node_id: string_to_c(connection.target_node()),
            target_port_key: string_to_c(connection.target_port()),
        }
    }
}

/// Every connection in the graph, in creation order.
///
/// On success `*out_connections` holds `*out_count` entries, or null when
/// the graph has none. Free the whole array, strings included, with
/// `flow_free_connection_array(*out_connections, *out_count)`.
///
/// # Safety
/// `out_connections` and `out_count` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_get_connections(
    graph: *mut c_void,
    out_connections: *mut *mut FlowConnectionInfo,
    out_count: *mut usize,
) -> FlowError {
    guarded_status("flow_graph_get_connections", || {
        let graph = resolve::<Graph>(graph, "graph")?;
        write_array(out_connections, out_count, || {
            let connections = graph.connections();
            into_c_array(connections.iter().map(|c| FlowConnectionInfo::new(c)))
        })
    })
}

/// # Safety
/// All string arguments must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_connect_nodes(
    graph: *mut c_void,
    source_id: *const c_char,
    source_port: *const c_char,
    target_id: *const c_char,
    target_port: *const c_char,
) -> *mut c_void {
    guarded("flow_graph_connect_nodes", ptr::null_mut(), || {
        let graph = resolve::<Graph>(graph, "graph")?;
        let connection = graph.connect_nodes(
            str_arg(source_id, "source_id")?,
            str_arg(source_port, "source_port")?,
            str_arg(target_id, "target_id")?,
            str_arg(target_port, "target_port")?,
        )?;
        Ok(into_handle(connection))
    })
}

/// # Safety
/// `connection_id` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn flow_graph_disconnect_nodes(
    graph: *mut c_void,
    connection_id: *const c_char,
) -> FlowError {
    guarded_status("flow_graph_disconnect_nodes", || {
        resolve::<Graph>(graph, "graph")?.disconnect(str_arg(connection_id, "connection_id")?)
    })
}

/// Queue every node's computation. Use `flow_env_wait` to observe completion.
#[no_mangle]
pub extern "C" fn flow_graph_run(graph: *mut c_void) -> FlowError {
    guarded_status("flow_graph_run", || {
        resolve::<Graph>(graph, "graph")?.run();
        Ok(())
    })
}
