use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};

/// Converts every received value with `Into`
pub struct Convert<'a, F, T> {
    id: ComponentId,
    pub input: InPort<'a, F>,
    pub output: OutPort<'a, T>,
}

impl<'a, F, T> Convert<'a, F, T>
where
    F: Into<T> + Send + 'static,
    T: Send + 'static,
{
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<F> + Sync),
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("convert", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
        })
    }
}

impl<F: Into<T>, T> Component for Convert<'_, F, T> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        self.output.send(value.into())?;
        Ok(())
    }
}
