//! Flow graphs: nodes, the connections between them, and their events.
//!
//! Mutations happen under the graph's own locks; events are broadcast only
//! after those locks are released, so a listener may call back into the
//! graph that fired it.

use crate::error_channel::panic_message;
use crate::errors::{BridgeError, BridgeResult};
use crate::events::EventDispatcher;
use crate::native::env::Env;
use crate::native::node::{Connection, Node};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Topology {
    nodes: BTreeMap<String, Arc<Node>>,
    connections: Vec<Arc<Connection>>,
}

/// A graph of nodes bound to an execution environment
pub struct Graph {
    env: Arc<Env>,
    topology: Mutex<Topology>,
    on_node_added: EventDispatcher<Arc<Node>>,
    on_node_removed: EventDispatcher<Arc<Node>>,
    on_nodes_connected: EventDispatcher<Arc<Connection>>,
    on_nodes_disconnected: EventDispatcher<Arc<Connection>>,
    on_error: Arc<EventDispatcher<String>>,
}

impl Graph {
    pub fn new(env: Arc<Env>) -> Self {
        Self {
            env,
            topology: Mutex::new(Topology::default()),
            on_node_added: EventDispatcher::new(),
            on_node_removed: EventDispatcher::new(),
            on_nodes_connected: EventDispatcher::new(),
            on_nodes_disconnected: EventDispatcher::new(),
            on_error: Arc::new(EventDispatcher::new()),
        }
    }

    fn topology(&self) -> MutexGuard<'_, Topology> {
        self.topology.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn on_node_added(&self) -> &EventDispatcher<Arc<Node>> {
        &self.on_node_added
    }

    pub fn on_node_removed(&self) -> &EventDispatcher<Arc<Node>> {
        &self.on_node_removed
    }

    pub fn on_nodes_connected(&self) -> &EventDispatcher<Arc<Connection>> {
        &self.on_nodes_connected
    }

    pub fn on_nodes_disconnected(&self) -> &EventDispatcher<Arc<Connection>> {
        &self.on_nodes_disconnected
    }

    pub fn on_error(&self) -> &EventDispatcher<String> {
        &self.on_error
    }

    /// Create a node and add it to the graph
    pub fn add_node(&self, class_id: &str, name: &str) -> BridgeResult<Arc<Node>> {
        if class_id.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "class id must not be empty".to_string(),
            ));
        }
        let node = Node::new(class_id, name);
        self.topology()
            .nodes
            .insert(node.id().to_string(), Arc::clone(&node));

        tracing::debug!(node = node.id(), "graph.add_node");
        self.on_node_added.broadcast(&node);
        Ok(node)
    }

    /// Remove a node, dropping and announcing its connections first
    pub fn remove_node(&self, node_id: &str) -> BridgeResult<()> {
        let (node, dropped) = {
            let mut topology = self.topology();
            let node = topology
                .nodes
                .remove(node_id)
                .ok_or_else(|| BridgeError::NodeNotFound(node_id.to_string()))?;
            let (dropped, kept) = topology
                .connections
                .drain(..)
                .partition::<Vec<_>, _>(|c| c.involves(node_id));
            topology.connections = kept;
            (node, dropped)
        };

        for connection in &dropped {
            self.on_nodes_disconnected.broadcast(connection);
        }
        tracing::debug!(node = node_id, links = dropped.len(), "graph.remove_node");
        self.on_node_removed.broadcast(&node);
        Ok(())
    }

    pub fn node(&self, node_id: &str) -> Option<Arc<Node>> {
        self.topology().nodes.get(node_id).cloned()
    }

    /// Every node, ordered by id
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.topology().nodes.values().cloned().collect()
    }

    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.topology().connections.clone()
    }

    /// Link `source.source_port` to `target.target_port`
    pub fn connect_nodes(
        &self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> BridgeResult<Arc<Connection>> {
        if source_port.is_empty() || target_port.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "port key must not be empty".to_string(),
            ));
        }

        let connection = {
            let mut topology = self.topology();
            for id in [source, target] {
                if !topology.nodes.contains_key(id) {
                    return Err(BridgeError::NodeNotFound(id.to_string()));
                }
            }
            if source == target {
                return Err(BridgeError::ConnectionFailed(format!(
                    "node {} cannot connect to itself",
                    source
                )));
            }

            let connection = Connection::new(source, source_port, target, target_port);
            if topology.connections.iter().any(|c| c.links(&connection)) {
                return Err(BridgeError::ConnectionFailed(format!(
                    "{}.{} is already connected to {}.{}",
                    source, source_port, target, target_port
                )));
            }
            topology.connections.try_reserve(1)?;
            let connection = Arc::new(connection);
            topology.connections.push(Arc::clone(&connection));
            connection
        };

        tracing::debug!(connection = connection.id(), "graph.connect");
        self.on_nodes_connected.broadcast(&connection);
        Ok(connection)
    }

    /// Remove the connection with `connection_id`
    pub fn disconnect(&self, connection_id: &str) -> BridgeResult<()> {
        let connection = {
            let mut topology = self.topology();
            let index = topology
                .connections
                .iter()
                .position(|c| c.id() == connection_id)
                .ok_or_else(|| BridgeError::ConnectionNotFound(connection_id.to_string()))?;
            topology.connections.remove(index)
        };

        tracing::debug!(connection = connection_id, "graph.disconnect");
        self.on_nodes_disconnected.broadcast(&connection);
        Ok(())
    }

    /// Schedule every node's computation on the environment.
    ///
    /// Returns once the work is queued; use [`Env::wait`] to observe completion.
    /// A computation that panics is reported on the node's and the graph's
    /// `on_error` sources.
    pub fn run(&self) {
        let nodes = self.nodes();
        tracing::debug!(nodes = nodes.len(), "graph.run");
        for node in nodes {
            let graph_errors = Arc::clone(&self.on_error);
            self.env.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| node.compute()));
                if let Err(payload) = outcome {
                    let message = format!(
                        "Computation failed in {}: {}",
                        node.id(),
                        panic_message(payload.as_ref())
                    );
                    node.report_error(&message);
                    graph_errors.broadcast(&message);
                }
            });
        }
    }

    /// Announce a failure to `on_error` listeners
    pub fn report_error(&self, message: &str) {
        tracing::debug!("graph.error: {}", message);
        self.on_error.broadcast(&message.to_string());
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topology = self.topology();
        f.debug_struct("Graph")
            .field("nodes", &topology.nodes.len())
            .field("connections", &topology.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BindingId;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn graph() -> Graph {
        Graph::new(Arc::new(Env::new(2).unwrap()))
    }

    #[test]
    fn test_add_and_lookup() {
        let graph = graph();
        let a = graph.add_node("source", "a").unwrap();
        let b = graph.add_node("sink", "b").unwrap();

        assert_eq!(graph.node(a.id()).unwrap().name(), "a");
        assert_eq!(graph.nodes().len(), 2);
        assert!(graph.node("missing").is_none());
        assert!(graph.node(b.id()).is_some());
    }

    #[test]
    fn test_connect_errors() {
        let graph = graph();
        let a = graph.add_node("source", "a").unwrap();
        let b = graph.add_node("sink", "b").unwrap();

        assert!(matches!(
            graph.connect_nodes(a.id(), "out", "ghost", "in"),
            Err(BridgeError::NodeNotFound(_))
        ));
        assert!(matches!(
            graph.connect_nodes(a.id(), "out", a.id(), "in"),
            Err(BridgeError::ConnectionFailed(_))
        ));
        graph.connect_nodes(a.id(), "out", b.id(), "in").unwrap();
        assert!(matches!(
            graph.connect_nodes(a.id(), "out", b.id(), "in"),
            Err(BridgeError::ConnectionFailed(_))
        ));
        assert!(matches!(
            graph.disconnect("conn-unknown"),
            Err(BridgeError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_remove_node_announces_disconnections_first() {
        let graph = graph();
        let a = graph.add_node("source", "a").unwrap();
        let b = graph.add_node("sink", "b").unwrap();
        graph.connect_nodes(a.id(), "out", b.id(), "in").unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&order);
        graph
            .on_nodes_disconnected()
            .bind(BindingId::fresh(), move |c: &Arc<Connection>| {
                log.lock().unwrap().push(format!("disconnected {}", c.target_node()));
            });
        let log = Arc::clone(&order);
        graph
            .on_node_removed()
            .bind(BindingId::fresh(), move |n: &Arc<Node>| {
                log.lock().unwrap().push(format!("removed {}", n.id()));
            });

        graph.remove_node(b.id()).unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                format!("disconnected {}", b.id()),
                format!("removed {}", b.id())
            ]
        );
        assert!(graph.connections().is_empty());
    }

    #[test]
    fn test_listener_may_reenter_graph() {
        let graph = Arc::new(graph());
        let weak = Arc::downgrade(&graph);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        graph
            .on_node_added()
            .bind(BindingId::fresh(), move |_: &Arc<Node>| {
                if let Some(g) = weak.upgrade() {
                    counter.store(g.nodes().len(), Ordering::SeqCst);
                }
            });

        graph.add_node("source", "a").unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_computes_every_node() {
        let graph = graph();
        let hits = Arc::new(AtomicUsize::new(0));
        for name in ["a", "b", "c"] {
            let node = graph.add_node("op", name).unwrap();
            let counter = Arc::clone(&hits);
            node.on_compute().bind(BindingId::fresh(), move |_: &Arc<Node>| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        graph.run();
        graph.env().wait().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failed_computation_is_reported() {
        let graph = graph();
        let node = graph.add_node("op", "broken").unwrap();
        node.on_compute()
            .bind(BindingId::fresh(), |_: &Arc<Node>| panic!("division by zero"));

        let node_errors = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&node_errors);
        node.on_error().bind(BindingId::fresh(), move |m: &String| {
            log.lock().unwrap().push(m.clone());
        });
        let graph_errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&graph_errors);
        graph.on_error().bind(BindingId::fresh(), move |_: &String| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        graph.run();
        graph.env().wait().unwrap();

        let messages = node_errors.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with("division by zero"));
        assert_eq!(graph_errors.load(Ordering::SeqCst), 1);
    }
}
