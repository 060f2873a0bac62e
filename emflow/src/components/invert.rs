use core::ops::Not;

use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};

/// Emits the logical (or bitwise) inverse of every received value
pub struct Invert<'a, T> {
    id: ComponentId,
    pub input: InPort<'a, T>,
    pub output: OutPort<'a, T>,
}

impl<'a, T: Not<Output = T> + Send + 'static> Invert<'a, T> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("invert", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
        })
    }
}

impl<T: Not<Output = T>> Component for Invert<'_, T> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        self.output.send(!value)?;
        Ok(())
    }
}
