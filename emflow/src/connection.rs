//! Point-to-point routing edges
//!
//! A connection binds one output port to one input port before the reactor starts and stays
//! immutable afterwards. It owns no data: the output port keeps a reference to the
//! destination buffer and forwards messages synchronously on `send`.
//!
//! Fan-out is expressed with several output ports, fan-in with several input ports
//! (see [`Split`](crate::components::Split) and [`Combine`](crate::components::Combine)).
//!
//! ```
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! use emflow::buffer::Fifo;
//! use emflow::config::Config;
//! use emflow::connection::connect;
//! use emflow::core::Readiness;
//! use emflow::graph::Graph;
//! use emflow::port::{InPort, OutPort};
//!
//! let mut graph = Graph::<Mutex, 2, 2>::new(Config::default());
//! let (hub, _reactor, _control) = graph.split();
//!
//! let sink = hub.declare("sink", Readiness::Any).unwrap();
//! let buffer: Fifo<Mutex, u8, 4> = Fifo::new();
//! let input = InPort::create(hub, sink, &buffer).unwrap();
//! let mut source = OutPort::external(hub).unwrap();
//!
//! let connection = connect(&mut source, &input).unwrap();
//! assert_eq!(connection.destination(), input.address());
//! ```

use crate::buffer::Buffer;
use crate::core::{ConnectionId, Fault, FaultKind, PortAddress};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{AnyInPort, AnyOutPort, InPort, OutPort, SendError};

/// Established binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    id: ConnectionId,
    source: PortAddress,
    destination: PortAddress,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, source: PortAddress, destination: PortAddress) -> Self {
        Self {
            id,
            source,
            destination,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn source(&self) -> PortAddress {
        self.source
    }

    pub fn destination(&self) -> PortAddress {
        self.destination
    }
}

/// Binds two ports of the same message type
pub fn connect<'a, T: Send + 'static>(
    source: &mut OutPort<'a, T>,
    destination: &InPort<'a, T>,
) -> Result<Connection, ConfigurationError> {
    bind(source, destination)
}

/// Binds two type-erased ports
///
/// Fails with [`ConfigurationError::TypeMismatch`] if the message types differ. A failed
/// bind leaves both ports untouched.
pub fn bind<'a>(
    source: &mut dyn AnyOutPort<'a>,
    destination: &dyn AnyInPort<'a>,
) -> Result<Connection, ConfigurationError> {
    if source.tag() != destination.tag() {
        warn!(
            "Type mismatch: {} -> {}",
            source.tag().name(),
            destination.tag().name()
        );
        return Err(ConfigurationError::TypeMismatch);
    }
    source.bind_to(destination)
}

/// Output side of an established connection
pub(crate) struct Link<'a, T> {
    connection: ConnectionId,
    destination: PortAddress,
    buffer: &'a (dyn Buffer<T> + Sync),
}

impl<'a, T> Link<'a, T> {
    pub(crate) fn new(
        connection: ConnectionId,
        destination: PortAddress,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Self {
        Self {
            connection,
            destination,
            buffer,
        }
    }

    pub(crate) fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub(crate) fn is_full(&self) -> bool {
        self.buffer.len() == self.buffer.capacity()
    }

    pub(crate) fn forward(
        &self,
        hub: Hub<'_>,
        source: PortAddress,
        message: T,
    ) -> Result<(), SendError<T>> {
        let (connection, destination) = (self.connection, self.destination);
        let result = self.buffer.put(message, &mut || {
            if !destination.is_external() {
                hub.port_filled(destination, connection);
            }
        });

        result.map_err(|message| {
            hub.report(Fault {
                component: source.owner,
                kind: FaultKind::Overflow { connection },
            });
            SendError::Overflow {
                connection,
                message,
            }
        })
    }
}
