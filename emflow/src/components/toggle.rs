use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};

/// Flips its state on every tick and emits it
///
/// The first tick emits `true`.
pub struct Toggle<'a> {
    id: ComponentId,
    pub input: InPort<'a, ()>,
    pub output: OutPort<'a, bool>,
    state: bool,
}

impl<'a> Toggle<'a> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<()> + Sync),
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("toggle", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
            state: false,
        })
    }
}

impl Component for Toggle<'_> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        self.input.take()?;
        self.state = !self.state;
        self.output.send(self.state)?;
        Ok(())
    }
}
