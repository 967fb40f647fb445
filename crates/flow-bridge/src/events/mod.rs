//! Event bridge.
//!
//! Lets a caller subscribe a C function pointer plus opaque user data to a
//! native event source. Each subscription is tracked by a registration
//! record and bound on the source under a [`BindingId`] that is never
//! reused, so unsubscribing can only ever detach its own closure.
//!
//! Lock order is registration set, then event source. Firing takes only the
//! source's lock, and only long enough to snapshot its listeners.

pub mod dispatcher;
mod trampoline;

pub use dispatcher::{BindingId, EventDispatcher};

use crate::errors::{BridgeError, BridgeResult};
use crate::handle::{Handle, HandleRegistry};
use crate::native::{Graph, Node};
use crate::token;
use std::collections::HashMap;
use std::ffi::{c_char, c_void};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

/// `(node, user_data)`
pub type NodeEventFn = unsafe extern "C" fn(node: *mut c_void, user_data: *mut c_void);

/// `(connection, user_data)`
pub type ConnectionEventFn = unsafe extern "C" fn(connection: *mut c_void, user_data: *mut c_void);

/// `(message, user_data)`; `message` is valid only during the call
pub type ErrorEventFn = unsafe extern "C" fn(message: *const c_char, user_data: *mut c_void);

/// `(node, port_key, data, user_data)`; `port_key` is valid only during the call
pub type NodeDataEventFn = unsafe extern "C" fn(
    node: *mut c_void,
    port_key: *const c_char,
    data: *mut c_void,
    user_data: *mut c_void,
);

/// Kind of object that owns an event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Graph,
    Node,
}

/// Every event a caller can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GraphNodeAdded,
    GraphNodeRemoved,
    GraphNodesConnected,
    GraphNodesDisconnected,
    GraphError,
    NodeCompute,
    NodeError,
    NodeSetInput,
    NodeSetOutput,
}

impl EventKind {
    pub fn source(self) -> SourceKind {
        match self {
            EventKind::GraphNodeAdded
            | EventKind::GraphNodeRemoved
            | EventKind::GraphNodesConnected
            | EventKind::GraphNodesDisconnected
            | EventKind::GraphError => SourceKind::Graph,
            EventKind::NodeCompute
            | EventKind::NodeError
            | EventKind::NodeSetInput
            | EventKind::NodeSetOutput => SourceKind::Node,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::GraphNodeAdded => "graph.node_added",
            EventKind::GraphNodeRemoved => "graph.node_removed",
            EventKind::GraphNodesConnected => "graph.nodes_connected",
            EventKind::GraphNodesDisconnected => "graph.nodes_disconnected",
            EventKind::GraphError => "graph.error",
            EventKind::NodeCompute => "node.compute",
            EventKind::NodeError => "node.error",
            EventKind::NodeSetInput => "node.set_input",
            EventKind::NodeSetOutput => "node.set_output",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event paired with a callback of the matching signature
#[derive(Debug, Clone, Copy)]
pub enum Subscription {
    NodeAdded(NodeEventFn),
    NodeRemoved(NodeEventFn),
    NodesConnected(ConnectionEventFn),
    NodesDisconnected(ConnectionEventFn),
    GraphError(ErrorEventFn),
    Compute(NodeEventFn),
    NodeError(ErrorEventFn),
    SetInput(NodeDataEventFn),
    SetOutput(NodeDataEventFn),
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        match self {
            Subscription::NodeAdded(_) => EventKind::GraphNodeAdded,
            Subscription::NodeRemoved(_) => EventKind::GraphNodeRemoved,
            Subscription::NodesConnected(_) => EventKind::GraphNodesConnected,
            Subscription::NodesDisconnected(_) => EventKind::GraphNodesDisconnected,
            Subscription::GraphError(_) => EventKind::GraphError,
            Subscription::Compute(_) => EventKind::NodeCompute,
            Subscription::NodeError(_) => EventKind::NodeError,
            Subscription::SetInput(_) => EventKind::NodeSetInput,
            Subscription::SetOutput(_) => EventKind::NodeSetOutput,
        }
    }
}

/// Caller's opaque context pointer, carried as an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserData(usize);

impl UserData {
    pub fn from_ptr(ptr: *mut c_void) -> Self {
        UserData(ptr as usize)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// Token naming one live subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationHandle(NonZeroUsize);

impl RegistrationHandle {
    /// Interpret a raw boundary value. Null yields `None`.
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(raw as usize).map(RegistrationHandle)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    fn fresh() -> Self {
        RegistrationHandle(token::next_token())
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

enum Target {
    Graph(Arc<Graph>),
    Node(Arc<Node>),
}

impl Target {
    fn downgrade(&self) -> Source {
        match self {
            Target::Graph(g) => Source::Graph(Arc::downgrade(g)),
            Target::Node(n) => Source::Node(Arc::downgrade(n)),
        }
    }
}

enum Source {
    Graph(Weak<Graph>),
    Node(Weak<Node>),
}

impl Source {
    fn is_alive(&self) -> bool {
        match self {
            Source::Graph(g) => g.strong_count() > 0,
            Source::Node(n) => n.strong_count() > 0,
        }
    }
}

struct Registration {
    kind: EventKind,
    source_handle: Handle,
    source: Source,
    binding: BindingId,
    user_data: UserData,
}

impl Registration {
    /// Detach the closure from the source. `false` if the source is gone.
    fn unbind(&self) -> bool {
        let id = self.binding;
        match &self.source {
            Source::Graph(graph) => graph.upgrade().is_some_and(|g| match self.kind {
                EventKind::GraphNodeAdded => g.on_node_added().unbind(id),
                EventKind::GraphNodeRemoved => g.on_node_removed().unbind(id),
                EventKind::GraphNodesConnected => g.on_nodes_connected().unbind(id),
                EventKind::GraphNodesDisconnected => g.on_nodes_disconnected().unbind(id),
                EventKind::GraphError => g.on_error().unbind(id),
                _ => false,
            }),
            Source::Node(node) => node.upgrade().is_some_and(|n| match self.kind {
                EventKind::NodeCompute => n.on_compute().unbind(id),
                EventKind::NodeError => n.on_error().unbind(id),
                EventKind::NodeSetInput => n.on_set_input().unbind(id),
                EventKind::NodeSetOutput => n.on_set_output().unbind(id),
                _ => false,
            }),
        }
    }
}

/// Registration bookkeeping for every live subscription
pub struct EventBridge {
    registry: &'static HandleRegistry,
    registrations: Mutex<HashMap<RegistrationHandle, Registration>>,
}

impl EventBridge {
    /// Bridge that hands out payload handles from `registry`
    pub fn new(registry: &'static HandleRegistry) -> Self {
        Self {
            registry,
            registrations: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide bridge used by the C surface
    pub fn global() -> &'static EventBridge {
        static BRIDGE: OnceLock<EventBridge> = OnceLock::new();
        BRIDGE.get_or_init(|| EventBridge::new(HandleRegistry::global()))
    }

    fn registrations(&self) -> MutexGuard<'_, HashMap<RegistrationHandle, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn target(&self, source: Handle, kind: EventKind) -> BridgeResult<Target> {
        match kind.source() {
            SourceKind::Graph => self
                .registry
                .resolve::<Graph>(source)
                .map(Target::Graph)
                .ok_or_else(|| BridgeError::unregistered("graph")),
            SourceKind::Node => self
                .registry
                .resolve::<Node>(source)
                .map(Target::Node)
                .ok_or_else(|| BridgeError::unregistered("node")),
        }
    }

    fn attach(
        &self,
        target: &Target,
        id: BindingId,
        subscription: Subscription,
        user_data: UserData,
    ) -> BridgeResult<()> {
        let registry = self.registry;
        let kind = subscription.kind();
        match (target, subscription) {
            (Target::Graph(g), Subscription::NodeAdded(cb)) => {
                g.on_node_added()
                    .bind(id, trampoline::node(registry, kind, cb, user_data));
            }
            (Target::Graph(g), Subscription::NodeRemoved(cb)) => {
                g.on_node_removed()
                    .bind(id, trampoline::node(registry, kind, cb, user_data));
            }
            (Target::Graph(g), Subscription::NodesConnected(cb)) => {
                g.on_nodes_connected()
                    .bind(id, trampoline::connection(registry, kind, cb, user_data));
            }
            (Target::Graph(g), Subscription::NodesDisconnected(cb)) => {
                g.on_nodes_disconnected()
                    .bind(id, trampoline::connection(registry, kind, cb, user_data));
            }
            (Target::Graph(g), Subscription::GraphError(cb)) => {
                g.on_error().bind(id, trampoline::error(kind, cb, user_data));
            }
            (Target::Node(n), Subscription::Compute(cb)) => {
                n.on_compute()
                    .bind(id, trampoline::node(registry, kind, cb, user_data));
            }
            (Target::Node(n), Subscription::NodeError(cb)) => {
                n.on_error().bind(id, trampoline::error(kind, cb, user_data));
            }
            (Target::Node(n), Subscription::SetInput(cb)) => {
                n.on_set_input()
                    .bind(id, trampoline::node_data(registry, kind, cb, user_data));
            }
            (Target::Node(n), Subscription::SetOutput(cb)) => {
                n.on_set_output()
                    .bind(id, trampoline::node_data(registry, kind, cb, user_data));
            }
            _ => {
                return Err(BridgeError::InvalidHandle(format!(
                    "source cannot emit {}",
                    kind
                )))
            }
        }
        Ok(())
    }

    /// Bind `subscription` on the object named by `source`.
    ///
    /// Fails with an invalid-handle error if `source` is not a live object of
    /// the kind the event belongs to.
    pub fn subscribe(
        &self,
        source: Handle,
        subscription: Subscription,
        user_data: UserData,
    ) -> BridgeResult<RegistrationHandle> {
        let kind = subscription.kind();
        let target = self.target(source, kind)?;
        let handle = RegistrationHandle::fresh();
        let binding = BindingId::fresh();

        let mut registrations = self.registrations();
        registrations.try_reserve(1)?;
        self.attach(&target, binding, subscription, user_data)?;
        registrations.insert(
            handle,
            Registration {
                kind,
                source_handle: source,
                source: target.downgrade(),
                binding,
                user_data,
            },
        );
        drop(registrations);

        tracing::debug!(
            event = kind.name(),
            %source,
            registration = %handle,
            %binding,
            "event.subscribe"
        );
        Ok(handle)
    }

    /// Remove a subscription and detach its closure from the source.
    ///
    /// Deliveries already past the source's snapshot may still complete.
    pub fn unsubscribe(&self, registration: RegistrationHandle) -> BridgeResult<()> {
        let mut registrations = self.registrations();
        let record = registrations
            .remove(&registration)
            .ok_or_else(|| BridgeError::InvalidArgument("Registration not found".to_string()))?;
        let unbound = record.unbind();
        drop(registrations);

        tracing::debug!(
            event = record.kind.name(),
            registration = %registration,
            unbound,
            "event.unsubscribe"
        );
        Ok(())
    }

    /// True while the registration's record is present
    pub fn is_registered(&self, registration: RegistrationHandle) -> bool {
        self.registrations().contains_key(&registration)
    }

    /// Event kind, source handle and user data of a live registration
    pub fn describe(&self, registration: RegistrationHandle) -> Option<(EventKind, Handle, UserData)> {
        self.registrations()
            .get(&registration)
            .map(|r| (r.kind, r.source_handle, r.user_data))
    }

    /// Drop every registration whose source object no longer exists.
    ///
    /// Returns the number of records removed.
    pub fn prune_detached(&self) -> usize {
        let mut registrations = self.registrations();
        let before = registrations.len();
        registrations.retain(|_, r| r.source.is_alive());
        let pruned = before - registrations.len();
        if pruned > 0 {
            tracing::debug!(pruned, "event.prune_detached");
        }
        pruned
    }

    /// Drop the registrations bound on `graph` once that graph is gone.
    ///
    /// Registrations on other sources are untouched, dead or not. Returns
    /// the number of records removed.
    pub fn prune_graph(&self, graph: &Weak<Graph>) -> usize {
        if graph.strong_count() > 0 {
            return 0;
        }
        let mut registrations = self.registrations();
        let before = registrations.len();
        registrations.retain(|_, r| !matches!(&r.source, Source::Graph(g) if g.ptr_eq(graph)));
        let pruned = before - registrations.len();
        drop(registrations);
        if pruned > 0 {
            tracing::debug!(pruned, "event.prune_graph");
        }
        pruned
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.registrations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("registrations", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Env;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HITS: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn count_node(node: *mut c_void, _user_data: *mut c_void) {
        HITS.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = Handle::from_raw(node) {
            HandleRegistry::global().release(handle);
        }
    }

    fn bridge() -> EventBridge {
        EventBridge::new(HandleRegistry::global())
    }

    #[test]
    fn test_subscribe_rejects_wrong_source_kind() {
        let bridge = bridge();
        let registry = HandleRegistry::global();
        let graph = registry.register(Graph::new(Arc::new(Env::new(1).unwrap())));

        let err = bridge
            .subscribe(graph, Subscription::Compute(count_node), UserData::from_ptr(std::ptr::null_mut()))
            .unwrap_err();

        assert_eq!(err, BridgeError::unregistered("node"));
        assert!(bridge.is_empty());
        registry.release(graph);
    }

    #[test]
    fn test_unsubscribe_twice_is_invalid_argument() {
        let bridge = bridge();
        let registry = HandleRegistry::global();
        let node = registry.register_shared(Node::new("op", "n"));

        let registration = bridge
            .subscribe(node, Subscription::Compute(count_node), UserData::from_ptr(std::ptr::null_mut()))
            .unwrap();
        assert!(bridge.is_registered(registration));
        bridge.unsubscribe(registration).unwrap();

        assert!(!bridge.is_registered(registration));
        assert_eq!(
            bridge.unsubscribe(registration).unwrap_err(),
            BridgeError::InvalidArgument("Registration not found".to_string())
        );
        registry.release(node);
    }

    #[test]
    fn test_prune_detached_drops_dead_sources() {
        let bridge = bridge();
        let registry = HandleRegistry::global();
        let node = registry.register_shared(Node::new("op", "n"));
        let registration = bridge
            .subscribe(node, Subscription::Compute(count_node), UserData::from_ptr(std::ptr::null_mut()))
            .unwrap();

        assert_eq!(bridge.prune_detached(), 0);
        registry.release(node);
        assert_eq!(bridge.prune_detached(), 1);
        assert!(!bridge.is_registered(registration));
    }

    #[test]
    fn test_prune_graph_only_touches_that_graph() {
        let bridge = bridge();
        let registry = HandleRegistry::global();
        let env = Arc::new(Env::new(1).unwrap());
        let doomed = Arc::new(Graph::new(Arc::clone(&env)));
        let weak = Arc::downgrade(&doomed);
        let doomed = registry.register_shared(doomed);
        let other = registry.register(Graph::new(env));
        let node = registry.register_shared(Node::new("op", "n"));
        let null = UserData::from_ptr(std::ptr::null_mut());

        let on_doomed = bridge
            .subscribe(doomed, Subscription::NodeAdded(count_node), null)
            .unwrap();
        let on_other = bridge
            .subscribe(other, Subscription::NodeAdded(count_node), null)
            .unwrap();
        let on_node = bridge
            .subscribe(node, Subscription::Compute(count_node), null)
            .unwrap();

        assert_eq!(bridge.prune_graph(&weak), 0);
        registry.release(node);
        registry.release(doomed);
        assert_eq!(bridge.prune_graph(&weak), 1);

        assert!(!bridge.is_registered(on_doomed));
        assert!(bridge.is_registered(on_other));
        assert!(bridge.is_registered(on_node));
        bridge.unsubscribe(on_other).unwrap();
        bridge.unsubscribe(on_node).unwrap();
        registry.release(other);
    }

    #[test]
    fn test_describe_reports_record() {
        let bridge = bridge();
        let registry = HandleRegistry::global();
        let node = registry.register_shared(Node::new("op", "n"));
        let user_data = UserData::from_ptr(0x40 as *mut c_void);
        let registration = bridge
            .subscribe(node, Subscription::Compute(count_node), user_data)
            .unwrap();

        assert_eq!(
            bridge.describe(registration),
            Some((EventKind::NodeCompute, node, user_data))
        );
        bridge.unsubscribe(registration).unwrap();
        registry.release(node);
    }
}
