//! Typed port handles
//!
//! An [`InPort`] fronts a user-allocated [`Buffer`] and belongs to a single component.
//! An [`OutPort`] holds the connection towards another component's input. Both register
//! themselves with the graph on creation, so the reactor learns the port layout without
//! knowing message types.
//!
//! Ports created with `external` belong to the platform rather than to a component.
//! External outputs are injection points for interrupt handlers, external inputs are sinks
//! the platform drains.

use core::any::TypeId;
use core::ptr::NonNull;

use crate::buffer::Buffer;
use crate::connection::Link;
use crate::core::{ComponentId, ConnectionId, Direction, FaultKind, PortAddress};
use crate::graph::{ConfigurationError, Hub};

/// Runtime message type identity
///
/// Used to validate type-erased binds.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl core::fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("TypeTag").field(&self.name).finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TypeTag {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "TypeTag({=str})", self.name)
    }
}

/// Read from an empty input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Empty {
    pub port: PortAddress,
}

impl From<Empty> for FaultKind {
    fn from(value: Empty) -> Self {
        FaultKind::EmptyRead { port: value.port }
    }
}

/// Message that could not be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<T> {
    /// The output has no connection
    Disconnected { port: PortAddress, message: T },
    /// The destination queue is full. The fault is already recorded.
    Overflow {
        connection: ConnectionId,
        message: T,
    },
}

impl<T> SendError<T> {
    pub fn into_message(self) -> T {
        match self {
            SendError::Disconnected { message, .. } => message,
            SendError::Overflow { message, .. } => message,
        }
    }
}

impl<T> From<SendError<T>> for FaultKind {
    fn from(value: SendError<T>) -> Self {
        match value {
            SendError::Disconnected { port, .. } => FaultKind::Disconnected { port },
            SendError::Overflow { connection, .. } => FaultKind::Overflow { connection },
        }
    }
}

/// Consumer end of a connection
pub struct InPort<'a, T> {
    hub: Hub<'a>,
    address: PortAddress,
    buffer: &'a (dyn Buffer<T> + Sync),
}

impl<'a, T: Send + 'static> InPort<'a, T> {
    /// Creates a mandatory input of `owner`
    ///
    /// Mandatory inputs gate [`Readiness::All`](crate::core::Readiness::All) and must be
    /// connected before the reactor starts.
    pub fn create(
        hub: Hub<'a>,
        owner: ComponentId,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Result<Self, ConfigurationError> {
        Self::create_inner(hub, Some(owner), true, buffer)
    }

    /// Creates an input of `owner` that may stay unconnected
    pub fn create_optional(
        hub: Hub<'a>,
        owner: ComponentId,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Result<Self, ConfigurationError> {
        Self::create_inner(hub, Some(owner), false, buffer)
    }

    /// Creates a platform-owned input
    ///
    /// Messages delivered to it never schedule anything.
    pub fn external(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Result<Self, ConfigurationError> {
        Self::create_inner(hub, None, false, buffer)
    }

    fn create_inner(
        hub: Hub<'a>,
        owner: Option<ComponentId>,
        mandatory: bool,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Result<Self, ConfigurationError> {
        if !buffer.claim() {
            warn!("Buffer is already lent to another port");
            return Err(ConfigurationError::BufferAlreadyClaimed);
        }
        match hub.add_port(owner, Direction::Input, mandatory) {
            Ok(address) => Ok(Self {
                hub,
                address,
                buffer,
            }),
            Err(err) => {
                buffer.release();
                Err(err)
            }
        }
    }
}

impl<'a, T> InPort<'a, T> {
    pub fn address(&self) -> PortAddress {
        self.address
    }

    /// True iff a message is queued
    pub fn is_ready(&self) -> bool {
        self.buffer.len() != 0
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_ready()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.buffer.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Oldest message, left in the queue
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.buffer.front()
    }

    /// Removes the oldest message
    pub fn take(&mut self) -> Result<T, Empty> {
        let address = self.address;
        self.try_take().ok_or(Empty { port: address })
    }

    /// Removes the oldest message, if any
    pub fn try_take(&mut self) -> Option<T> {
        let hub = self.hub;
        let address = self.address;
        self.buffer.take(&mut || hub.port_drained(address))
    }

    /// Makes the owner ready only once this port holds a message
    ///
    /// The override lasts until the owner runs next. Has no effect on external ports.
    pub fn wait_for(&self) {
        self.hub.wait_for(self.address);
    }
}

/// Producer end of a connection
pub struct OutPort<'a, T> {
    hub: Hub<'a>,
    address: PortAddress,
    link: Option<Link<'a, T>>,
}

impl<'a, T: Send + 'static> OutPort<'a, T> {
    /// Creates an output of `owner` that must be connected before the reactor starts
    pub fn create(hub: Hub<'a>, owner: ComponentId) -> Result<Self, ConfigurationError> {
        Self::create_inner(hub, Some(owner), true)
    }

    /// Creates an output of `owner` that may stay unconnected
    pub fn create_optional(hub: Hub<'a>, owner: ComponentId) -> Result<Self, ConfigurationError> {
        Self::create_inner(hub, Some(owner), false)
    }

    /// Creates a platform-owned output
    ///
    /// Interrupt handlers use it to inject messages. Overflow faults it raises carry no
    /// component.
    pub fn external(hub: Hub<'a>) -> Result<Self, ConfigurationError> {
        Self::create_inner(hub, None, false)
    }

    fn create_inner(
        hub: Hub<'a>,
        owner: Option<ComponentId>,
        required: bool,
    ) -> Result<Self, ConfigurationError> {
        let address = hub.add_port(owner, Direction::Output, required)?;
        Ok(Self {
            hub,
            address,
            link: None,
        })
    }
}

impl<'a, T> OutPort<'a, T> {
    pub fn address(&self) -> PortAddress {
        self.address
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        self.link.as_ref().map(|link| link.connection())
    }

    /// True if the destination queue cannot take another message
    pub fn is_full(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_full())
    }

    /// Delivers the message into the destination queue
    ///
    /// The destination owner is scheduled if its queue was empty. Delivery into a full
    /// queue is recorded as an overflow fault of this port's owner.
    pub fn send(&self, message: T) -> Result<(), SendError<T>> {
        match &self.link {
            Some(link) => link.forward(self.hub, self.address, message),
            None => Err(SendError::Disconnected {
                port: self.address,
                message,
            }),
        }
    }

    pub(crate) fn set_link(&mut self, link: Link<'a, T>) {
        self.link = Some(link);
    }
}

pub(crate) trait SealedInPort<'a> {
    /// Pointer to the `&'a (dyn Buffer<T> + Sync)` field, where `T` matches `tag()`
    fn buffer_ptr(&self) -> NonNull<()>;
}

pub(crate) trait SealedOutPort<'a> {
    fn bind_to(
        &mut self,
        destination: &dyn AnyInPort<'a>,
    ) -> Result<crate::connection::Connection, ConfigurationError>;
}

/// Input port with its message type erased
#[allow(private_bounds)]
pub trait AnyInPort<'a>: SealedInPort<'a> {
    fn tag(&self) -> TypeTag;
    fn address(&self) -> PortAddress;
}

/// Output port with its message type erased
#[allow(private_bounds)]
pub trait AnyOutPort<'a>: SealedOutPort<'a> {
    fn tag(&self) -> TypeTag;
    fn address(&self) -> PortAddress;
    fn is_connected(&self) -> bool;
}

impl<'a, T: Send + 'static> SealedInPort<'a> for InPort<'a, T> {
    fn buffer_ptr(&self) -> NonNull<()> {
        NonNull::from(&self.buffer).cast()
    }
}

impl<'a, T: Send + 'static> AnyInPort<'a> for InPort<'a, T> {
    fn tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    fn address(&self) -> PortAddress {
        self.address
    }
}

impl<'a, T: Send + 'static> SealedOutPort<'a> for OutPort<'a, T> {
    fn bind_to(
        &mut self,
        destination: &dyn AnyInPort<'a>,
    ) -> Result<crate::connection::Connection, ConfigurationError> {
        if destination.tag() != TypeTag::of::<T>() {
            return Err(ConfigurationError::TypeMismatch);
        }
        if self.link.is_some() {
            return Err(ConfigurationError::PortAlreadyBound(self.address));
        }
        let connection = self.hub.bind(self.address, destination.address(), TypeTag::of::<T>())?;
        // Safety: the tags match, so the pointee is a `&'a (dyn Buffer<T> + Sync)`
        let buffer = unsafe {
            *destination
                .buffer_ptr()
                .cast::<&'a (dyn Buffer<T> + Sync)>()
                .as_ptr()
        };
        self.set_link(Link::new(connection.id(), connection.destination(), buffer));
        Ok(connection)
    }
}

impl<'a, T: Send + 'static> AnyOutPort<'a> for OutPort<'a, T> {
    fn tag(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    fn address(&self) -> PortAddress {
        self.address
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}
