//! Graph nodes and connections.

use crate::events::EventDispatcher;
use crate::native::data::NodeData;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

static NODE_SEQ: AtomicU64 = AtomicU64::new(1);
static CONNECTION_SEQ: AtomicU64 = AtomicU64::new(1);

type Ports = BTreeMap<String, Arc<NodeData>>;

/// Payload of a port write
#[derive(Debug, Clone)]
pub struct PortEvent {
    pub node: Arc<Node>,
    pub key: String,
    pub data: Arc<NodeData>,
}

/// A node in a flow graph
pub struct Node {
    id: String,
    class_id: String,
    name: String,
    this: Weak<Node>,
    inputs: Mutex<Ports>,
    outputs: Mutex<Ports>,
    on_compute: EventDispatcher<Arc<Node>>,
    on_error: EventDispatcher<String>,
    on_set_input: EventDispatcher<PortEvent>,
    on_set_output: EventDispatcher<PortEvent>,
}

impl Node {
    /// Create a detached node. Ids are unique within the process.
    pub fn new(class_id: &str, name: &str) -> Arc<Self> {
        let seq = NODE_SEQ.fetch_add(1, Ordering::Relaxed);
        Arc::new_cyclic(|this| Node {
            id: format!("{}-{}", class_id, seq),
            class_id: class_id.to_string(),
            name: name.to_string(),
            this: this.clone(),
            inputs: Mutex::new(BTreeMap::new()),
            outputs: Mutex::new(BTreeMap::new()),
            on_compute: EventDispatcher::new(),
            on_error: EventDispatcher::new(),
            on_set_input: EventDispatcher::new(),
            on_set_output: EventDispatcher::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_compute(&self) -> &EventDispatcher<Arc<Node>> {
        &self.on_compute
    }

    pub fn on_error(&self) -> &EventDispatcher<String> {
        &self.on_error
    }

    pub fn on_set_input(&self) -> &EventDispatcher<PortEvent> {
        &self.on_set_input
    }

    pub fn on_set_output(&self) -> &EventDispatcher<PortEvent> {
        &self.on_set_output
    }

    /// Run the node. Announces the computation to `on_compute` listeners.
    pub fn compute(&self) {
        if let Some(node) = self.this.upgrade() {
            tracing::trace!(node = %self.id, "node.compute");
            self.on_compute.broadcast(&node);
        }
    }

    pub fn set_input(&self, key: &str, data: Arc<NodeData>) {
        lock(&self.inputs).insert(key.to_string(), Arc::clone(&data));
        self.announce(&self.on_set_input, key, data);
    }

    pub fn set_output(&self, key: &str, data: Arc<NodeData>) {
        lock(&self.outputs).insert(key.to_string(), Arc::clone(&data));
        self.announce(&self.on_set_output, key, data);
    }

    pub fn input(&self, key: &str) -> Option<Arc<NodeData>> {
        lock(&self.inputs).get(key).cloned()
    }

    pub fn output(&self, key: &str) -> Option<Arc<NodeData>> {
        lock(&self.outputs).get(key).cloned()
    }

    /// Input port keys that currently hold a value
    pub fn input_keys(&self) -> Vec<String> {
        lock(&self.inputs).keys().cloned().collect()
    }

    /// Output port keys that currently hold a value
    pub fn output_keys(&self) -> Vec<String> {
        lock(&self.outputs).keys().cloned().collect()
    }

    /// Announce a failure to `on_error` listeners
    pub fn report_error(&self, message: &str) {
        tracing::debug!(node = %self.id, "node.error: {}", message);
        self.on_error.broadcast(&message.to_string());
    }

    fn announce(&self, dispatcher: &EventDispatcher<PortEvent>, key: &str, data: Arc<NodeData>) {
        if let Some(node) = self.this.upgrade() {
            dispatcher.broadcast(&PortEvent {
                node,
                key: key.to_string(),
                data,
            });
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("class_id", &self.class_id)
            .field("name", &self.name)
            .finish()
    }
}

fn lock(ports: &Mutex<Ports>) -> MutexGuard<'_, Ports> {
    ports.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A directed link from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    id: String,
    source_node: String,
    source_port: String,
    target_node: String,
    target_port: String,
}

impl Connection {
    pub fn new(source_node: &str, source_port: &str, target_node: &str, target_port: &str) -> Self {
        Self {
            id: format!("conn-{}", CONNECTION_SEQ.fetch_add(1, Ordering::Relaxed)),
            source_node: source_node.to_string(),
            source_port: source_port.to_string(),
            target_node: target_node.to_string(),
            target_port: target_port.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_node(&self) -> &str {
        &self.source_node
    }

    pub fn source_port(&self) -> &str {
        &self.source_port
    }

    pub fn target_node(&self) -> &str {
        &self.target_node
    }

    pub fn target_port(&self) -> &str {
        &self.target_port
    }

    /// True if the connection touches `node_id` on either end
    pub fn involves(&self, node_id: &str) -> bool {
        self.source_node == node_id || self.target_node == node_id
    }

    pub(crate) fn links(&self, other: &Connection) -> bool {
        self.source_node == other.source_node
            && self.source_port == other.source_port
            && self.target_node == other.target_node
            && self.target_port == other.target_port
    }
}
