//! Graph storage and shared handles
//!
//! A [`Graph`] holds the registry of components, ports and connections. It is split into:
//! * [`Hub`], a copyable handle used to declare components and create ports;
//! * [`Reactor`], the scheduler that owns the component objects;
//! * [`Control`], a copyable handle for stop requests and diagnostics, usable from
//!   interrupt context.
//!
//! ## Examples
//!
//! ```
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! use emflow::config::Config;
//! use emflow::graph::Graph;
//!
//! // Up to 8 components and 16 connections
//! let mut graph = Graph::<Mutex, 8, 16>::new(Config::default());
//! let (hub, reactor, control) = graph.split();
//! ```
//! Static allocation is typically used to obtain `'static` handles that interrupt handlers
//! can use:
//! ```
//! # use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! # use emflow::config::Config;
//! # use emflow::graph::Graph;
//! use static_cell::StaticCell;
//!
//! static CELL: StaticCell<Graph<Mutex, 8, 16>> = StaticCell::new();
//! let graph = CELL.init(Graph::new(Config::default()));
//! let (hub, reactor, control) = graph.split();
//! ```

use core::cell::RefCell;
use core::task::{Context, Poll};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::Config;
use crate::connection::Connection;
use crate::core::{
    ComponentId, ConnectionId, Direction, Fault, FaultKind, PortAddress, PortSet, Readiness,
};
use crate::port::TypeTag;
use crate::reactor::Reactor;
use crate::registry::Registry;

/// Graph assembly error
///
/// Only raised before the reactor starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// The reactor has started, the graph structure is frozen
    GraphSealed,
    TooManyComponents,
    TooManyPorts,
    TooManyConnections,
    UnknownComponent(ComponentId),
    /// Source and destination carry different message types
    TypeMismatch,
    PortAlreadyBound(PortAddress),
    /// The buffer is lent to another port
    BufferAlreadyClaimed,
    /// A mandatory input or required output has no connection
    UnboundPort(PortAddress),
    ComponentNotAttached(ComponentId),
    ComponentAlreadyAttached(ComponentId),
}

/// Component snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComponentInfo {
    pub name: &'static str,
    pub readiness: Readiness,
    /// Inputs holding at least one message
    pub filled: PortSet,
    pub ready: bool,
    /// Removed from scheduling after a fault
    pub disabled: bool,
    pub runs: u32,
}

pub(crate) trait DynamicGraph {
    fn config(&self) -> Config;

    fn declare(
        &self,
        name: &'static str,
        readiness: Readiness,
    ) -> Result<ComponentId, ConfigurationError>;
    fn add_port(
        &self,
        owner: Option<ComponentId>,
        direction: Direction,
        gating: bool,
    ) -> Result<PortAddress, ConfigurationError>;
    fn bind(
        &self,
        source: PortAddress,
        destination: PortAddress,
        tag: TypeTag,
    ) -> Result<Connection, ConfigurationError>;
    fn attach(&self, id: ComponentId) -> Result<(), ConfigurationError>;
    fn seal(&self) -> Result<(), ConfigurationError>;

    fn port_filled(&self, port: PortAddress, via: ConnectionId);
    fn port_drained(&self, port: PortAddress);
    fn wait_for(&self, port: PortAddress);
    fn report(&self, fault: Fault);

    fn begin_run(&self) -> Option<ComponentId>;
    fn end_run(&self, id: ComponentId, result: Result<(), FaultKind>);
    fn poll_work(&self, cx: &mut Context<'_>) -> Poll<()>;
    fn has_work(&self) -> bool;

    fn request_stop(&self);
    fn stop_requested(&self) -> bool;
    fn halt_requested(&self) -> bool;

    fn pop_fault(&self) -> Option<Fault>;
    fn dropped_faults(&self) -> u32;
    fn component(&self, id: ComponentId) -> Option<ComponentInfo>;
    fn component_count(&self) -> usize;
}

/// Registry of at most `C` components and `K` connections
pub struct Graph<M: RawMutex, const C: usize, const K: usize> {
    config: Config,
    registry: Mutex<M, RefCell<Registry<C, K>>>,
}

impl<M: RawMutex + Sync, const C: usize, const K: usize> Graph<M, C, K> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: Mutex::new(RefCell::new(Registry::new(&config))),
        }
    }

    pub fn split(&mut self) -> (Hub<'_>, Reactor<'_, C>, Control<'_>) {
        let hub = Hub::new(self);
        let reactor = Reactor::new(self);
        let control = Control::new(self);
        (hub, reactor, control)
    }

    fn with<R>(&self, f: impl FnOnce(&mut Registry<C, K>) -> R) -> R {
        self.registry.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

impl<M: RawMutex + Sync, const C: usize, const K: usize> DynamicGraph for Graph<M, C, K> {
    fn config(&self) -> Config {
        self.config
    }

    fn declare(
        &self,
        name: &'static str,
        readiness: Readiness,
    ) -> Result<ComponentId, ConfigurationError> {
        self.with(|registry| registry.declare(name, readiness))
    }

    fn add_port(
        &self,
        owner: Option<ComponentId>,
        direction: Direction,
        gating: bool,
    ) -> Result<PortAddress, ConfigurationError> {
        self.with(|registry| registry.add_port(owner, direction, gating))
    }

    fn bind(
        &self,
        source: PortAddress,
        destination: PortAddress,
        tag: TypeTag,
    ) -> Result<Connection, ConfigurationError> {
        self.with(|registry| registry.bind(source, destination, tag))
    }

    fn attach(&self, id: ComponentId) -> Result<(), ConfigurationError> {
        self.with(|registry| registry.attach(id))
    }

    fn seal(&self) -> Result<(), ConfigurationError> {
        self.with(|registry| registry.seal())
    }

    fn port_filled(&self, port: PortAddress, via: ConnectionId) {
        self.with(|registry| registry.port_filled(port, via))
    }

    fn port_drained(&self, port: PortAddress) {
        self.with(|registry| registry.port_drained(port))
    }

    fn wait_for(&self, port: PortAddress) {
        self.with(|registry| registry.wait_for(port))
    }

    fn report(&self, fault: Fault) {
        self.with(|registry| registry.report(fault))
    }

    fn begin_run(&self) -> Option<ComponentId> {
        self.with(|registry| registry.begin_run())
    }

    fn end_run(&self, id: ComponentId, result: Result<(), FaultKind>) {
        self.with(|registry| registry.end_run(id, result))
    }

    fn poll_work(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.with(|registry| {
            if registry.has_work() || registry.halt_requested() {
                Poll::Ready(())
            } else {
                registry.register_waker(cx.waker());
                Poll::Pending
            }
        })
    }

    fn has_work(&self) -> bool {
        self.with(|registry| registry.has_work())
    }

    fn request_stop(&self) {
        self.with(|registry| registry.request_stop())
    }

    fn stop_requested(&self) -> bool {
        self.with(|registry| registry.stop_requested())
    }

    fn halt_requested(&self) -> bool {
        self.with(|registry| registry.halt_requested())
    }

    fn pop_fault(&self) -> Option<Fault> {
        self.with(|registry| registry.pop_fault())
    }

    fn dropped_faults(&self) -> u32 {
        self.with(|registry| registry.dropped_faults())
    }

    fn component(&self, id: ComponentId) -> Option<ComponentInfo> {
        self.with(|registry| registry.component(id))
    }

    fn component_count(&self) -> usize {
        self.with(|registry| registry.component_count())
    }
}

/// Shared handle for declaring components and creating ports
#[derive(Clone, Copy)]
pub struct Hub<'a>(&'a (dyn DynamicGraph + Sync));

impl<'a> Hub<'a> {
    pub(crate) fn new(graph: &'a (dyn DynamicGraph + Sync)) -> Self {
        Self(graph)
    }

    /// Registers a component and returns its identifier
    ///
    /// Identifiers follow declaration order.
    pub fn declare(
        self,
        name: &'static str,
        readiness: Readiness,
    ) -> Result<ComponentId, ConfigurationError> {
        self.0.declare(name, readiness)
    }

    pub(crate) fn add_port(
        self,
        owner: Option<ComponentId>,
        direction: Direction,
        gating: bool,
    ) -> Result<PortAddress, ConfigurationError> {
        self.0.add_port(owner, direction, gating)
    }

    pub(crate) fn bind(
        self,
        source: PortAddress,
        destination: PortAddress,
        tag: TypeTag,
    ) -> Result<Connection, ConfigurationError> {
        self.0.bind(source, destination, tag)
    }

    pub(crate) fn port_filled(self, port: PortAddress, via: ConnectionId) {
        self.0.port_filled(port, via)
    }

    pub(crate) fn port_drained(self, port: PortAddress) {
        self.0.port_drained(port)
    }

    pub(crate) fn wait_for(self, port: PortAddress) {
        self.0.wait_for(port)
    }

    pub(crate) fn report(self, fault: Fault) {
        self.0.report(fault)
    }
}

/// Reactor control and diagnostics handle
#[derive(Clone, Copy)]
pub struct Control<'a>(&'a (dyn DynamicGraph + Sync));

impl<'a> Control<'a> {
    pub(crate) fn new(graph: &'a (dyn DynamicGraph + Sync)) -> Self {
        Self(graph)
    }

    /// Asks the reactor to halt
    ///
    /// The request takes effect at the next step boundary, never inside a component run.
    pub fn request_stop(&self) {
        self.0.request_stop()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.stop_requested()
    }

    /// True if some component waits in the ready queue
    pub fn has_work(&self) -> bool {
        self.0.has_work()
    }

    pub fn component(&self, id: ComponentId) -> Option<ComponentInfo> {
        self.0.component(id)
    }

    /// Number of faults lost because the fault log was full
    pub fn dropped_faults(&self) -> u32 {
        self.0.dropped_faults()
    }
}
