//! Processing unit contract
//!
//! A component owns its ports as plain fields and declares itself with
//! [`Hub::declare`](crate::graph::Hub::declare) before creating them:
//!
//! ```
//! use emflow::component::Component;
//! use emflow::core::{ComponentId, FaultKind, Readiness};
//! use emflow::graph::{ConfigurationError, Hub};
//! use emflow::port::{InPort, OutPort};
//! use emflow::buffer::Buffer;
//!
//! struct Double<'a> {
//!     id: ComponentId,
//!     input: InPort<'a, u32>,
//!     output: OutPort<'a, u32>,
//! }
//!
//! impl<'a> Double<'a> {
//!     fn new(
//!         hub: Hub<'a>,
//!         buffer: &'a (dyn Buffer<u32> + Sync),
//!     ) -> Result<Self, ConfigurationError> {
//!         let id = hub.declare("double", Readiness::All)?;
//!         Ok(Self {
//!             id,
//!             input: InPort::create(hub, id, buffer)?,
//!             output: OutPort::create(hub, id)?,
//!         })
//!     }
//! }
//!
//! impl Component for Double<'_> {
//!     fn id(&self) -> ComponentId {
//!         self.id
//!     }
//!
//!     fn run(&mut self) -> Result<(), FaultKind> {
//!         let value = self.input.take()?;
//!         self.output.send(value * 2)?;
//!         Ok(())
//!     }
//! }
//! ```

use crate::core::{ComponentId, FaultKind};

/// Run-to-completion processing operation
///
/// The reactor invokes `run` only while the component's readiness policy holds and never
/// re-enters it. `run` must not block; work that cannot proceed waits for a later invocation.
pub trait Component {
    /// Identifier returned by [`Hub::declare`](crate::graph::Hub::declare)
    fn id(&self) -> ComponentId;

    /// Called once by [`Reactor::start`](crate::reactor::Reactor::start)
    fn start(&mut self) {}

    /// Called once when the reactor halts
    fn stop(&mut self) {}

    /// Consumes input messages and emits output messages
    ///
    /// An error is reported as a run fault and handled according to
    /// [`FaultPolicy`](crate::config::FaultPolicy).
    fn run(&mut self) -> Result<(), FaultKind>;
}
