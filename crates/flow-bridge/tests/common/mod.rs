//! Shared helpers for tests that drive the C surface
#![allow(dead_code)]

use flow_bridge::ffi::env::{flow_env_create, flow_env_destroy};
use flow_bridge::ffi::graph::{flow_graph_add_node, flow_graph_create, flow_graph_destroy};
use flow_bridge::{Handle, HandleRegistry};
use std::ffi::{c_char, c_void, CStr, CString};
use std::sync::{Mutex, MutexGuard};

/// One callback invocation as seen by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub object: usize,
    pub text: Option<String>,
    pub data: usize,
    pub user_data: usize,
}

/// Collects callback invocations; passed to subscriptions as user data
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub fn user_data(&self) -> *mut c_void {
        self as *const Recorder as *mut c_void
    }

    pub fn calls(&self) -> MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap()
    }

    pub fn len(&self) -> usize {
        self.calls().len()
    }

    /// Release every handle delivered so far
    pub fn release_payloads(&self) {
        for call in self.calls().iter() {
            for raw in [call.object, call.data] {
                if let Some(handle) = Handle::from_raw(raw as *mut c_void) {
                    HandleRegistry::global().release(handle);
                }
            }
        }
    }

    fn push(&self, call: Call) {
        self.calls().push(call);
    }
}

unsafe fn recorder<'a>(user_data: *mut c_void) -> &'a Recorder {
    &*(user_data as *const Recorder)
}

unsafe fn copy_text(text: *const c_char) -> Option<String> {
    (!text.is_null()).then(|| CStr::from_ptr(text).to_string_lossy().into_owned())
}

pub unsafe extern "C" fn record_object(object: *mut c_void, user_data: *mut c_void) {
    recorder(user_data).push(Call {
        object: object as usize,
        text: None,
        data: 0,
        user_data: user_data as usize,
    });
}

pub unsafe extern "C" fn record_text(text: *const c_char, user_data: *mut c_void) {
    recorder(user_data).push(Call {
        object: 0,
        text: copy_text(text),
        data: 0,
        user_data: user_data as usize,
    });
}

pub unsafe extern "C" fn record_port(
    node: *mut c_void,
    key: *const c_char,
    data: *mut c_void,
    user_data: *mut c_void,
) {
    recorder(user_data).push(Call {
        object: node as usize,
        text: copy_text(key),
        data: data as usize,
        user_data: user_data as usize,
    });
}

/// Counts and immediately releases the delivered handle
pub unsafe extern "C" fn count_and_release(object: *mut c_void, user_data: *mut c_void) {
    if let Some(handle) = Handle::from_raw(object) {
        HandleRegistry::global().release(handle);
    }
    let counter = &*(user_data as *const std::sync::atomic::AtomicUsize);
    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
}

pub fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Environment plus graph created through the C surface
pub struct Fixture {
    pub env: *mut c_void,
    pub graph: *mut c_void,
}

impl Fixture {
    pub fn new() -> Self {
        let env = flow_env_create(2);
        assert!(!env.is_null());
        let graph = flow_graph_create(env);
        assert!(!graph.is_null());
        Self { env, graph }
    }

    pub fn add_node(&self, class_id: &str, name: &str) -> *mut c_void {
        let class_id = cstr(class_id);
        let name = cstr(name);
        let node = unsafe { flow_graph_add_node(self.graph, class_id.as_ptr(), name.as_ptr()) };
        assert!(!node.is_null());
        node
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        flow_graph_destroy(self.graph);
        flow_env_destroy(self.env);
    }
}
