//! Graph bookkeeping and scheduling state
//!
//! The registry knows the port layout, the connection table and which inputs hold messages,
//! but never the message types or the component objects. It runs under the graph mutex;
//! buffer callbacks reach it while the buffer mutex is held, so the lock order is always
//! buffer first, registry second.

use embassy_sync::waitqueue::WakerRegistration;
use heapless::{Deque, Vec};

use crate::config::{Config, FaultPolicy};
use crate::connection::Connection;
use crate::core::{
    ComponentId, ConnectionId, Direction, Fault, FaultKind, PortAddress, PortIndex, PortSet,
    Readiness,
};
use crate::graph::{ComponentInfo, ConfigurationError};
use crate::port::TypeTag;
use crate::utils::{FlagArray, ReadyQueue};

pub(crate) const FAULT_LOG_CAPACITY: usize = 8;

struct ComponentEntry {
    name: &'static str,
    readiness: Readiness,
    input_count: u8,
    output_count: u8,
    mandatory: PortSet,
    required: PortSet,
    bound_inputs: PortSet,
    bound_outputs: PortSet,
    filled: PortSet,
    wait_for: Option<PortIndex>,
    attached: bool,
    disabled: bool,
    faulted_in_run: bool,
    runs: u32,
}

impl ComponentEntry {
    fn new(name: &'static str, readiness: Readiness) -> Self {
        Self {
            name,
            readiness,
            input_count: 0,
            output_count: 0,
            mandatory: PortSet::NONE,
            required: PortSet::NONE,
            bound_inputs: PortSet::NONE,
            bound_outputs: PortSet::NONE,
            filled: PortSet::NONE,
            wait_for: None,
            attached: false,
            disabled: false,
            faulted_in_run: false,
            runs: 0,
        }
    }

    fn is_ready(&self) -> bool {
        if self.disabled {
            return false;
        }
        match self.wait_for {
            Some(index) => self.filled.contains(index),
            None => self.readiness.is_satisfied(self.filled, self.mandatory),
        }
    }
}

struct ConnectionEntry {
    source: PortAddress,
    destination: PortAddress,
}

pub(crate) struct Registry<const C: usize, const K: usize> {
    policy: FaultPolicy,
    components: Vec<ComponentEntry, C>,
    connections: Vec<ConnectionEntry, K>,
    external_inputs: u8,
    external_outputs: u8,
    ready: ReadyQueue<C>,
    // Connections that delivered into an empty queue during the current run
    pending: FlagArray<K>,
    running: Option<ComponentId>,
    sealed: bool,
    stop_requested: bool,
    halt_requested: bool,
    faults: Deque<Fault, FAULT_LOG_CAPACITY>,
    dropped_faults: u32,
    waker: WakerRegistration,
}

impl<const C: usize, const K: usize> Registry<C, K> {
    const _ASSERT_COMPONENTS: usize = ComponentId::MAX.into_u8() as usize + 1 - C;
    const _ASSERT_CONNECTIONS: usize = ConnectionId::MAX.into_u8() as usize + 1 - K;

    pub fn new(config: &Config) -> Self {
        let _ = Self::_ASSERT_COMPONENTS;
        let _ = Self::_ASSERT_CONNECTIONS;
        Self {
            policy: config.fault_policy,
            components: Vec::new(),
            connections: Vec::new(),
            external_inputs: 0,
            external_outputs: 0,
            ready: ReadyQueue::new(),
            pending: FlagArray::new(),
            running: None,
            sealed: false,
            stop_requested: false,
            halt_requested: false,
            faults: Deque::new(),
            dropped_faults: 0,
            waker: WakerRegistration::new(),
        }
    }

    fn check_unsealed(&self) -> Result<(), ConfigurationError> {
        if self.sealed {
            warn!("Graph is sealed");
            Err(ConfigurationError::GraphSealed)
        } else {
            Ok(())
        }
    }

    fn entry_mut(&mut self, id: ComponentId) -> Result<&mut ComponentEntry, ConfigurationError> {
        self.components
            .get_mut(usize::from(id))
            .ok_or(ConfigurationError::UnknownComponent(id))
    }

    pub fn declare(
        &mut self,
        name: &'static str,
        readiness: Readiness,
    ) -> Result<ComponentId, ConfigurationError> {
        self.check_unsealed()?;
        let id = u8::try_from(self.components.len())
            .ok()
            .and_then(ComponentId::new)
            .ok_or(ConfigurationError::TooManyComponents)?;
        self.components
            .push(ComponentEntry::new(name, readiness))
            .map_err(|_| ConfigurationError::TooManyComponents)?;
        debug!("Declared {} as {:?}", name, id);
        Ok(id)
    }

    /// Allocates the next port index of the owner
    ///
    /// `gating` marks a component input as mandatory or a component output as required.
    pub fn add_port(
        &mut self,
        owner: Option<ComponentId>,
        direction: Direction,
        gating: bool,
    ) -> Result<PortAddress, ConfigurationError> {
        self.check_unsealed()?;
        let counter = match owner {
            Some(id) => {
                let entry = self.entry_mut(id)?;
                match direction {
                    Direction::Input => &mut entry.input_count,
                    Direction::Output => &mut entry.output_count,
                }
            }
            None => match direction {
                Direction::Input => &mut self.external_inputs,
                Direction::Output => &mut self.external_outputs,
            },
        };
        let index = PortIndex::new(*counter).ok_or(ConfigurationError::TooManyPorts)?;
        *counter += 1;

        if let (Some(id), true) = (owner, gating) {
            let entry = self.entry_mut(id)?;
            match direction {
                Direction::Input => entry.mandatory.insert(index),
                Direction::Output => entry.required.insert(index),
            }
        }

        Ok(PortAddress {
            owner,
            direction,
            index,
        })
    }

    pub fn bind(
        &mut self,
        source: PortAddress,
        destination: PortAddress,
        tag: TypeTag,
    ) -> Result<Connection, ConfigurationError> {
        self.check_unsealed()?;
        assert!(source.direction == Direction::Output);
        assert!(destination.direction == Direction::Input);

        if self.connections.iter().any(|c| c.source == source) {
            warn!("{:?} is already bound", source);
            return Err(ConfigurationError::PortAlreadyBound(source));
        }
        if self.connections.iter().any(|c| c.destination == destination) {
            warn!("{:?} is already bound", destination);
            return Err(ConfigurationError::PortAlreadyBound(destination));
        }

        let id = u8::try_from(self.connections.len())
            .map(ConnectionId::new)
            .map_err(|_| ConfigurationError::TooManyConnections)?;
        self.connections
            .push(ConnectionEntry {
                source,
                destination,
            })
            .map_err(|_| ConfigurationError::TooManyConnections)?;

        if let Some(owner) = source.owner {
            self.entry_mut(owner)?.bound_outputs.insert(source.index);
        }
        if let Some(owner) = destination.owner {
            self.entry_mut(owner)?.bound_inputs.insert(destination.index);
        }
        debug!("Bound {:?} as {:?} ({})", id, destination, tag.name());
        Ok(Connection::new(id, source, destination))
    }

    pub fn attach(&mut self, id: ComponentId) -> Result<(), ConfigurationError> {
        self.check_unsealed()?;
        let entry = self.entry_mut(id)?;
        if entry.attached {
            return Err(ConfigurationError::ComponentAlreadyAttached(id));
        }
        entry.attached = true;
        Ok(())
    }

    /// Validates the graph and freezes its structure
    pub fn seal(&mut self) -> Result<(), ConfigurationError> {
        self.check_unsealed()?;
        for (i, entry) in self.components.iter().enumerate() {
            let id = ComponentId::from_u8_truncating(i as u8);
            if !entry.attached {
                warn!("{} is not attached", entry.name);
                return Err(ConfigurationError::ComponentNotAttached(id));
            }
            let unbound = [
                (Direction::Input, entry.mandatory & !entry.bound_inputs),
                (Direction::Output, entry.required & !entry.bound_outputs),
            ];
            for (direction, ports) in unbound {
                if let Some(index) = ports.first() {
                    let port = PortAddress {
                        owner: Some(id),
                        direction,
                        index,
                    };
                    warn!("{} has unbound port {:?}", entry.name, port);
                    return Err(ConfigurationError::UnboundPort(port));
                }
            }
        }
        self.sealed = true;
        info!(
            "Graph sealed with {} components and {} connections",
            self.components.len(),
            self.connections.len()
        );
        Ok(())
    }

    fn schedule(&mut self, id: ComponentId) -> bool {
        let Some(entry) = self.components.get(usize::from(id)) else {
            return false;
        };
        if entry.is_ready() && self.ready.push_back(id.into_u8()) {
            trace!("Scheduled {:?}", id);
            true
        } else {
            false
        }
    }

    /// Empty to non-empty transition of an input queue
    pub fn port_filled(&mut self, port: PortAddress, via: ConnectionId) {
        let Some(owner) = port.owner else {
            return;
        };
        let Some(entry) = self.components.get_mut(usize::from(owner)) else {
            return;
        };
        entry.filled.insert(port.index);

        if self.running.is_some() {
            self.pending.insert(via.into_u8());
        } else if self.schedule(owner) {
            self.waker.wake();
        }
    }

    /// Non-empty to empty transition of an input queue
    pub fn port_drained(&mut self, port: PortAddress) {
        let Some(owner) = port.owner else {
            return;
        };
        if let Some(entry) = self.components.get_mut(usize::from(owner)) {
            entry.filled.remove(port.index);
        }
    }

    pub fn wait_for(&mut self, port: PortAddress) {
        let (Some(owner), Direction::Input) = (port.owner, port.direction) else {
            return;
        };
        let Some(entry) = self.components.get_mut(usize::from(owner)) else {
            return;
        };
        entry.wait_for = Some(port.index);
        if self.running != Some(owner) && self.schedule(owner) {
            self.waker.wake();
        }
    }

    pub fn report(&mut self, fault: Fault) {
        if self.faults.is_full() {
            self.faults.pop_front();
            self.dropped_faults = self.dropped_faults.saturating_add(1);
        }
        unwrap!(self.faults.push_back(fault));

        let Some(id) = fault.component else {
            warn!("External fault {:?}", fault.kind);
            if self.policy == FaultPolicy::Halt {
                self.halt_requested = true;
                self.waker.wake();
            }
            return;
        };

        error!("Fault in {:?}: {:?}", id, fault.kind);
        let running = self.running;
        let Some(entry) = self.components.get_mut(usize::from(id)) else {
            return;
        };
        if running == Some(id) {
            entry.faulted_in_run = true;
        }
        match self.policy {
            FaultPolicy::DisableComponent => {
                if !entry.disabled {
                    warn!("Disabling {}", entry.name);
                    entry.disabled = true;
                }
                self.ready.remove(id.into_u8());
            }
            FaultPolicy::Halt => {
                self.halt_requested = true;
                self.waker.wake();
            }
        }
    }

    /// Pops the next ready component and marks it running
    ///
    /// Entries that lost readiness while queued are dropped.
    pub fn begin_run(&mut self) -> Option<ComponentId> {
        assert!(self.running.is_none());
        while let Some(index) = self.ready.pop_front() {
            let entry = &mut self.components[usize::from(index)];
            if !entry.is_ready() {
                trace!("Dropped stale entry {}", index);
                continue;
            }
            entry.wait_for = None;
            entry.faulted_in_run = false;
            entry.runs = entry.runs.wrapping_add(1);
            let id = ComponentId::from_u8_truncating(index);
            self.running = Some(id);
            return Some(id);
        }
        None
    }

    /// Completes a run
    ///
    /// Components triggered during the run are appended in connection order, followed by
    /// the component itself if it is still ready.
    pub fn end_run(&mut self, id: ComponentId, result: Result<(), FaultKind>) {
        assert!(self.running == Some(id));
        if let Err(kind) = result {
            if !self.components[usize::from(id)].faulted_in_run {
                self.report(Fault {
                    component: Some(id),
                    kind,
                });
            }
        }
        self.running = None;

        while let Some(connection) = self.pending.pop_first() {
            if let Some(owner) = self.connections[usize::from(connection)].destination.owner {
                self.schedule(owner);
            }
        }
        self.schedule(id);
    }

    pub fn has_work(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn request_stop(&mut self) {
        info!("Stop requested");
        self.stop_requested = true;
        self.waker.wake();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Stop request or fatal fault
    pub fn halt_requested(&self) -> bool {
        self.stop_requested || self.halt_requested
    }

    pub fn register_waker(&mut self, waker: &core::task::Waker) {
        self.waker.register(waker);
    }

    pub fn pop_fault(&mut self) -> Option<Fault> {
        self.faults.pop_front()
    }

    pub fn dropped_faults(&self) -> u32 {
        self.dropped_faults
    }

    pub fn component(&self, id: ComponentId) -> Option<ComponentInfo> {
        let entry = self.components.get(usize::from(id))?;
        Some(ComponentInfo {
            name: entry.name,
            readiness: entry.readiness,
            filled: entry.filled,
            ready: entry.is_ready(),
            disabled: entry.disabled,
            runs: entry.runs,
        })
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestRegistry = Registry<4, 8>;

    fn input(owner: ComponentId, index: u8) -> PortAddress {
        PortAddress {
            owner: Some(owner),
            direction: Direction::Input,
            index: PortIndex::new(index).unwrap(),
        }
    }

    fn tag() -> TypeTag {
        TypeTag::of::<u32>()
    }

    /// Declares `count` components with one mandatory input fed from an external output each
    fn chain(registry: &mut TestRegistry, count: u8, readiness: Readiness) {
        for _ in 0..count {
            let id = registry.declare("test", readiness).unwrap();
            let source = registry.add_port(None, Direction::Output, false).unwrap();
            let destination = registry.add_port(Some(id), Direction::Input, true).unwrap();
            registry.bind(source, destination, tag()).unwrap();
            registry.attach(id).unwrap();
        }
    }

    fn id(value: u8) -> ComponentId {
        ComponentId::new(value).unwrap()
    }

    fn conn(value: u8) -> ConnectionId {
        ConnectionId::new(value)
    }

    #[test]
    fn test_declare_limit() {
        let mut registry = TestRegistry::new(&Config::default());
        for i in 0..4 {
            assert_eq!(registry.declare("test", Readiness::All), Ok(id(i)));
        }
        assert_eq!(
            registry.declare("test", Readiness::All),
            Err(ConfigurationError::TooManyComponents)
        );
    }

    #[test]
    fn test_port_indices() {
        let mut registry = TestRegistry::new(&Config::default());
        let a = registry.declare("a", Readiness::All).unwrap();
        assert_eq!(
            registry.add_port(Some(a), Direction::Input, true),
            Ok(input(a, 0))
        );
        assert_eq!(
            registry.add_port(Some(a), Direction::Input, false),
            Ok(input(a, 1))
        );
        let output = registry.add_port(Some(a), Direction::Output, true).unwrap();
        assert_eq!(output.index, PortIndex::MIN);
        assert_eq!(
            registry.add_port(Some(id(3)), Direction::Input, true),
            Err(ConfigurationError::UnknownComponent(id(3)))
        );

        for _ in 0..PortSet::CAPACITY {
            registry.add_port(None, Direction::Input, false).unwrap();
        }
        assert_eq!(
            registry.add_port(None, Direction::Input, false),
            Err(ConfigurationError::TooManyPorts)
        );
    }

    #[test]
    fn test_seal_validation() {
        let mut registry = TestRegistry::new(&Config::default());
        let a = registry.declare("a", Readiness::All).unwrap();
        let port = registry.add_port(Some(a), Direction::Input, true).unwrap();
        registry.add_port(Some(a), Direction::Input, false).unwrap();

        assert_eq!(
            registry.seal(),
            Err(ConfigurationError::ComponentNotAttached(a))
        );
        registry.attach(a).unwrap();
        assert_eq!(
            registry.attach(a),
            Err(ConfigurationError::ComponentAlreadyAttached(a))
        );
        assert_eq!(registry.seal(), Err(ConfigurationError::UnboundPort(port)));

        let source = registry.add_port(None, Direction::Output, false).unwrap();
        registry.bind(source, port, tag()).unwrap();
        assert_eq!(registry.seal(), Ok(()));

        assert_eq!(
            registry.declare("late", Readiness::All),
            Err(ConfigurationError::GraphSealed)
        );
        assert_eq!(
            registry.add_port(None, Direction::Output, false),
            Err(ConfigurationError::GraphSealed)
        );
    }

    #[test]
    fn test_required_output() {
        let mut registry = TestRegistry::new(&Config::default());
        let a = registry.declare("a", Readiness::Any).unwrap();
        let output = registry.add_port(Some(a), Direction::Output, true).unwrap();
        registry.attach(a).unwrap();
        assert_eq!(
            registry.seal(),
            Err(ConfigurationError::UnboundPort(output))
        );
    }

    #[test]
    fn test_fifo_order() {
        let mut registry = TestRegistry::new(&Config::default());
        chain(&mut registry, 3, Readiness::Any);
        registry.seal().unwrap();

        registry.port_filled(input(id(2), 0), conn(2));
        registry.port_filled(input(id(0), 0), conn(0));
        registry.port_filled(input(id(2), 0), conn(2));

        assert_eq!(registry.begin_run(), Some(id(2)));
        registry.port_drained(input(id(2), 0));
        registry.end_run(id(2), Ok(()));
        assert_eq!(registry.begin_run(), Some(id(0)));
        registry.port_drained(input(id(0), 0));
        registry.end_run(id(0), Ok(()));
        assert_eq!(registry.begin_run(), None);
    }

    #[test]
    fn test_deferred_triggers_follow_connection_order() {
        let mut registry = TestRegistry::new(&Config::default());
        chain(&mut registry, 4, Readiness::Any);
        registry.seal().unwrap();

        registry.port_filled(input(id(0), 0), conn(0));
        assert_eq!(registry.begin_run(), Some(id(0)));
        // emitted in reverse declaration order within one run
        registry.port_filled(input(id(3), 0), conn(3));
        registry.port_filled(input(id(1), 0), conn(1));
        assert!(!registry.has_work());
        registry.end_run(id(0), Ok(()));

        // the running component is still ready, so it goes last
        assert_eq!(registry.begin_run(), Some(id(1)));
        registry.end_run(id(1), Ok(()));
        assert_eq!(registry.begin_run(), Some(id(3)));
        registry.end_run(id(3), Ok(()));
        assert_eq!(registry.begin_run(), Some(id(0)));
    }

    #[test]
    fn test_all_policy() {
        let mut registry = TestRegistry::new(&Config::default());
        let a = registry.declare("a", Readiness::All).unwrap();
        let first = registry.add_port(Some(a), Direction::Input, true).unwrap();
        let second = registry.add_port(Some(a), Direction::Input, true).unwrap();
        let optional = registry.add_port(Some(a), Direction::Input, false).unwrap();
        for destination in [first, second, optional] {
            let source = registry.add_port(None, Direction::Output, false).unwrap();
            registry.bind(source, destination, tag()).unwrap();
        }
        registry.attach(a).unwrap();
        registry.seal().unwrap();

        registry.port_filled(optional, conn(2));
        registry.port_filled(first, conn(0));
        assert!(!registry.has_work());
        assert!(!registry.component(a).unwrap().ready);

        registry.port_filled(second, conn(1));
        assert!(registry.has_work());

        // drained before popped
        registry.port_drained(second);
        assert_eq!(registry.begin_run(), None);
    }

    #[test]
    fn test_wait_for() {
        let mut registry = TestRegistry::new(&Config::default());
        let a = registry.declare("a", Readiness::Any).unwrap();
        let wait = registry.add_port(Some(a), Direction::Input, true).unwrap();
        let data = registry.add_port(Some(a), Direction::Input, true).unwrap();
        registry.attach(a).unwrap();
        for destination in [wait, data] {
            let source = registry.add_port(None, Direction::Output, false).unwrap();
            registry.bind(source, destination, tag()).unwrap();
        }
        registry.seal().unwrap();

        registry.wait_for(wait);
        registry.port_filled(data, conn(1));
        assert_eq!(registry.begin_run(), None);

        registry.port_filled(wait, conn(0));
        assert_eq!(registry.begin_run(), Some(a));
        registry.port_drained(wait);
        registry.end_run(a, Ok(()));

        // the override is gone, so data alone makes it ready
        assert_eq!(registry.begin_run(), Some(a));
    }

    #[test]
    fn test_disable_on_fault() {
        let mut registry = TestRegistry::new(&Config::default());
        chain(&mut registry, 2, Readiness::Any);
        registry.seal().unwrap();

        registry.port_filled(input(id(0), 0), conn(0));
        registry.port_filled(input(id(1), 0), conn(1));
        assert_eq!(registry.begin_run(), Some(id(0)));
        registry.report(Fault {
            component: Some(id(0)),
            kind: FaultKind::Overflow { connection: conn(5) },
        });
        registry.end_run(id(0), Err(FaultKind::Overflow { connection: conn(5) }));

        // reported once
        assert_eq!(
            registry.pop_fault(),
            Some(Fault {
                component: Some(id(0)),
                kind: FaultKind::Overflow { connection: conn(5) },
            })
        );
        assert_eq!(registry.pop_fault(), None);
        assert!(registry.component(id(0)).unwrap().disabled);
        assert!(!registry.halt_requested());

        assert_eq!(registry.begin_run(), Some(id(1)));
        registry.end_run(id(1), Ok(()));
        assert_eq!(registry.begin_run(), Some(id(1)));
    }

    #[test]
    fn test_halt_on_fault() {
        let mut config = Config::default();
        config.fault_policy = FaultPolicy::Halt;
        let mut registry = TestRegistry::new(&config);
        chain(&mut registry, 1, Readiness::Any);
        registry.seal().unwrap();

        registry.port_filled(input(id(0), 0), conn(0));
        assert_eq!(registry.begin_run(), Some(id(0)));
        registry.end_run(id(0), Err(FaultKind::Failed { code: 9 }));

        assert!(registry.halt_requested());
        assert!(!registry.component(id(0)).unwrap().disabled);
    }

    #[test]
    fn test_fault_log_overflow() {
        let mut registry = TestRegistry::new(&Config::default());
        for code in 0..(FAULT_LOG_CAPACITY as u16 + 2) {
            registry.report(Fault {
                component: None,
                kind: FaultKind::Failed { code },
            });
        }
        assert_eq!(registry.dropped_faults(), 2);
        assert_eq!(
            registry.pop_fault().map(|fault| fault.kind),
            Some(FaultKind::Failed { code: 2 })
        );
    }
}
