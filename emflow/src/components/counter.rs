use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort};

/// Counts received values modulo `range`
///
/// A zero range counts freely, wrapping at `u32::MAX`.
///
/// A run consumes every queued value and emits the resulting count once.
pub struct Counter<'a, T> {
    id: ComponentId,
    pub input: InPort<'a, T>,
    pub output: OutPort<'a, u32>,
    range: u32,
    count: u32,
}

impl<'a, T: Send + 'static> Counter<'a, T> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<T> + Sync),
        range: u32,
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("counter", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
            range,
            count: 0,
        })
    }
}

impl<T> Component for Counter<'_, T> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        self.input.take()?;
        loop {
            self.count = self.count.wrapping_add(1);
            if self.count == self.range {
                self.count = 0;
            }
            if self.input.try_take().is_none() {
                break;
            }
        }
        self.output.send(self.count)?;
        Ok(())
    }
}

/// Counts up to `up_limit`, then down to `down_limit`, and repeats
///
/// A run consumes every queued value and emits the resulting count once.
pub struct UpDownCounter<'a, T> {
    id: ComponentId,
    pub input: InPort<'a, T>,
    pub output: OutPort<'a, u32>,
    down_limit: u32,
    up_limit: u32,
    count: u32,
    up: bool,
}

impl<'a, T: Send + 'static> UpDownCounter<'a, T> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<T> + Sync),
        down_limit: u32,
        up_limit: u32,
        start: u32,
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("up_down_counter", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
            down_limit,
            up_limit,
            count: start,
            up: true,
        })
    }
}

impl<T> UpDownCounter<'_, T> {
    fn count_one(&mut self) {
        if self.up {
            self.count = self.count.wrapping_add(1);
        } else {
            self.count = self.count.wrapping_sub(1);
        }

        if self.count == self.up_limit {
            self.up = false;
        } else if self.count == self.down_limit {
            self.up = true;
        }
    }
}

impl<T> Component for UpDownCounter<'_, T> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        self.input.take()?;
        self.count_one();
        while self.input.try_take().is_some() {
            self.count_one();
        }
        self.output.send(self.count)?;
        Ok(())
    }
}
