#![allow(dead_code)]

use emflow::buffer::{Buffer, Fifo};
use emflow::component::Component;
use emflow::config::Config;
use emflow::core::{ComponentId, FaultKind, Readiness};
use emflow::graph::{Graph, Hub};
use emflow::platform::mutex::CriticalSectionRawMutex;
use emflow::port::{InPort, OutPort};
use std::boxed::Box;
use std::sync::Mutex;
use std::vec::Vec;

pub type RawMutex = CriticalSectionRawMutex;
pub type TestGraph = Graph<RawMutex, 8, 16>;

pub fn graph(config: Config) -> &'static mut TestGraph {
    Box::leak(Box::new(Graph::new(config)))
}

pub fn fifo<T: Send + 'static, const N: usize>() -> &'static Fifo<RawMutex, T, N> {
    Box::leak(Box::new(Fifo::new()))
}

pub fn leak<T>(value: T) -> &'static mut T {
    Box::leak(Box::new(value))
}

/// Event log shared by the test components
#[derive(Default)]
pub struct Trace(Mutex<Vec<(&'static str, u32)>>);

impl Trace {
    pub fn new() -> &'static Self {
        Box::leak(Box::default())
    }

    pub fn push(&self, name: &'static str, value: u32) {
        self.0.lock().unwrap().push((name, value));
    }

    pub fn take(&self) -> Vec<(&'static str, u32)> {
        core::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.take().into_iter().map(|(name, _)| name).collect()
    }
}

/// Logs every message it takes and forwards it on all outputs
pub struct Relay<'a, const N: usize> {
    id: ComponentId,
    name: &'static str,
    trace: &'a Trace,
    pub input: InPort<'a, u32>,
    pub outputs: [OutPort<'a, u32>; N],
}

impl<'a, const N: usize> Relay<'a, N> {
    pub fn new(
        hub: Hub<'a>,
        name: &'static str,
        buffer: &'a (dyn Buffer<u32> + Sync),
        trace: &'a Trace,
    ) -> Self {
        Self::with_readiness(hub, name, Readiness::All, buffer, trace)
    }

    pub fn with_readiness(
        hub: Hub<'a>,
        name: &'static str,
        readiness: Readiness,
        buffer: &'a (dyn Buffer<u32> + Sync),
        trace: &'a Trace,
    ) -> Self {
        let id = hub.declare(name, readiness).unwrap();
        Self {
            id,
            name,
            trace,
            input: InPort::create(hub, id, buffer).unwrap(),
            outputs: core::array::from_fn(|_| OutPort::create(hub, id).unwrap()),
        }
    }
}

impl<const N: usize> Component for Relay<'_, N> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        self.trace.push(self.name, value);
        for output in self.outputs.iter() {
            output.send(value)?;
        }
        Ok(())
    }
}

/// Two-input component logging `(port index * 100 + value)` for every message it takes
///
/// Under `All` it takes one message from each input, under `Any` one from every filled input.
pub struct Join<'a> {
    id: ComponentId,
    name: &'static str,
    trace: &'a Trace,
    pub inputs: [InPort<'a, u32>; 2],
}

impl<'a> Join<'a> {
    pub fn new(
        hub: Hub<'a>,
        name: &'static str,
        readiness: Readiness,
        buffers: [&'a (dyn Buffer<u32> + Sync); 2],
        trace: &'a Trace,
    ) -> Self {
        let id = hub.declare(name, readiness).unwrap();
        Self {
            id,
            name,
            trace,
            inputs: buffers.map(|buffer| InPort::create(hub, id, buffer).unwrap()),
        }
    }
}

impl Component for Join<'_> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        for (i, input) in self.inputs.iter_mut().enumerate() {
            if let Some(value) = input.try_take() {
                self.trace.push(self.name, i as u32 * 100 + value);
            }
        }
        Ok(())
    }
}

/// Takes everything queued at a port
pub fn collect<T>(port: &mut InPort<'_, T>) -> Vec<T> {
    core::iter::from_fn(|| port.try_take()).collect()
}
