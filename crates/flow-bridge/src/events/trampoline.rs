//! Trampolines: closures bound on native event sources that convert each
//! payload into boundary-safe values before calling the caller's function.
//!
//! Object payloads become fresh registry handles owned by the receiver.
//! Text payloads become NUL-terminated strings that live only for the
//! duration of the call. A failure while converting is logged and the
//! delivery is dropped; nothing propagates into the dispatcher.

use super::{ConnectionEventFn, ErrorEventFn, EventKind, NodeDataEventFn, NodeEventFn, UserData};
use crate::error_channel::{panic_message, to_c_message};
use crate::handle::HandleRegistry;
use crate::native::{Connection, Node, PortEvent};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

fn deliver<F: FnOnce()>(kind: EventKind, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::warn!(
            event = kind.name(),
            "event delivery failed: {}",
            panic_message(payload.as_ref())
        );
    }
}

pub(super) fn node(
    registry: &'static HandleRegistry,
    kind: EventKind,
    callback: NodeEventFn,
    user_data: UserData,
) -> impl Fn(&Arc<Node>) + Send + Sync + 'static {
    move |node| {
        deliver(kind, || {
            let token = registry.register_shared(Arc::clone(node));
            // SAFETY: the caller guaranteed at subscribe time that `callback`
            // accepts a handle and its own user data and does not unwind.
            unsafe { callback(token.as_ptr(), user_data.as_ptr()) }
        })
    }
}

pub(super) fn connection(
    registry: &'static HandleRegistry,
    kind: EventKind,
    callback: ConnectionEventFn,
    user_data: UserData,
) -> impl Fn(&Arc<Connection>) + Send + Sync + 'static {
    move |connection| {
        deliver(kind, || {
            let token = registry.register_shared(Arc::clone(connection));
            // SAFETY: see `node`.
            unsafe { callback(token.as_ptr(), user_data.as_ptr()) }
        })
    }
}

pub(super) fn error(
    kind: EventKind,
    callback: ErrorEventFn,
    user_data: UserData,
) -> impl Fn(&String) + Send + Sync + 'static {
    move |message| {
        deliver(kind, || {
            let message = to_c_message(message.clone());
            // SAFETY: `message` outlives the call; the callee must copy it to keep it.
            unsafe { callback(message.as_ptr(), user_data.as_ptr()) }
        })
    }
}

pub(super) fn node_data(
    registry: &'static HandleRegistry,
    kind: EventKind,
    callback: NodeDataEventFn,
    user_data: UserData,
) -> impl Fn(&PortEvent) + Send + Sync + 'static {
    move |event| {
        deliver(kind, || {
            let key = to_c_message(event.key.clone());
            let node = registry.register_shared(Arc::clone(&event.node));
            let data = registry.register_shared(Arc::clone(&event.data));
            // SAFETY: see `node` and `error`.
            unsafe {
                callback(
                    node.as_ptr(),
                    key.as_ptr(),
                    data.as_ptr(),
                    user_data.as_ptr(),
                )
            }
        })
    }
}
