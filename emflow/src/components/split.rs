use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};

use super::try_array;

/// Copies every received value to each of its `N` outputs, lowest index first
///
/// All outputs are served even if one of them overflows.
pub struct Split<'a, T, const N: usize> {
    id: ComponentId,
    pub input: InPort<'a, T>,
    pub outputs: [OutPort<'a, T>; N],
}

impl<'a, T: Clone + Send + 'static, const N: usize> Split<'a, T, N> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<T> + Sync),
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("split", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            outputs: try_array(|_| OutPort::create(hub, id))?,
        })
    }
}

impl<T: Clone, const N: usize> Component for Split<'_, T, N> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        let mut result = Ok(());
        for output in self.outputs.iter() {
            if let Err(err) = output.send(value.clone()) {
                result = result.and(Err(err.into()));
            }
        }
        result
    }
}
