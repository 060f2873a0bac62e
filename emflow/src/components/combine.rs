use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};

use super::try_array;

/// Merges `N` inputs into one output
///
/// Lower input indices take priority. Each input is drained completely before the next one
/// is served.
pub struct Combine<'a, T, const N: usize> {
    id: ComponentId,
    pub inputs: [InPort<'a, T>; N],
    pub output: OutPort<'a, T>,
}

impl<'a, T: Send + 'static, const N: usize> Combine<'a, T, N> {
    pub fn new(
        hub: Hub<'a>,
        buffers: [&'a (dyn Buffer<T> + Sync); N],
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("combine", Readiness::Any)?;
        Ok(Self {
            id,
            inputs: try_array(|i| InPort::create(hub, id, buffers[i]))?,
            output: OutPort::create(hub, id)?,
        })
    }
}

impl<T, const N: usize> Component for Combine<'_, T, N> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        for input in self.inputs.iter_mut() {
            while let Some(value) = input.try_take() {
                self.output.send(value)?;
            }
        }
        Ok(())
    }
}
