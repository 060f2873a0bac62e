use emflow_platform::Clock;

use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};
use crate::time::Instant;

/// Pairs every received value with the time it was processed
pub struct Timestamp<'a, T, C> {
    id: ComponentId,
    pub input: InPort<'a, T>,
    pub output: OutPort<'a, (Instant, T)>,
    clock: C,
}

impl<'a, T: Send + 'static, C: Clock> Timestamp<'a, T, C> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<T> + Sync),
        clock: C,
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("timestamp", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
            clock,
        })
    }
}

impl<T, C: Clock> Component for Timestamp<'_, T, C> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        self.output.send((self.clock.now(), value))?;
        Ok(())
    }
}
