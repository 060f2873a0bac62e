use crate::buffer::Buffer;
use crate::component::Component;
use crate::core::{ComponentId, FaultKind, Readiness};
use crate::graph::{ConfigurationError, Hub};
use crate::port::{InPort, OutPort, SendError};

/// Tick divider
///
/// Emits a tick after every `period` received ticks. A zero period never emits and
/// ticks received meanwhile are not counted.
pub struct Timer<'a> {
    id: ComponentId,
    pub input: InPort<'a, ()>,
    pub output: OutPort<'a, ()>,
    period: u32,
    ticks: u32,
}

impl<'a> Timer<'a> {
    pub fn new(
        hub: Hub<'a>,
        buffer: &'a (dyn Buffer<()> + Sync),
        period: u32,
    ) -> Result<Self, ConfigurationError> {
        let id = hub.declare("timer", Readiness::All)?;
        Ok(Self {
            id,
            input: InPort::create(hub, id, buffer)?,
            output: OutPort::create(hub, id)?,
            period,
            ticks: 0,
        })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Takes effect on the next tick; the tick count is kept
    pub fn set_period(&mut self, period: u32) {
        self.period = period;
    }
}

impl Component for Timer<'_> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        self.input.take()?;
        if self.period == 0 {
            return Ok(());
        }
        self.ticks += 1;
        if self.ticks >= self.period {
            self.ticks = 0;
            self.output.send(())?;
        }
        Ok(())
    }
}

/// Interrupt-side tick divider
///
/// Not a component: a hardware timer interrupt calls [`SoftwareTimer::isr`], which injects a
/// tick through an external output port every `period` calls.
pub struct SoftwareTimer<'a> {
    pub output: OutPort<'a, ()>,
    period: u32,
    ticks: u32,
}

impl<'a> SoftwareTimer<'a> {
    pub fn new(hub: Hub<'a>, period: u32) -> Result<Self, ConfigurationError> {
        Ok(Self {
            output: OutPort::external(hub)?,
            period,
            ticks: 0,
        })
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    pub fn set_period(&mut self, period: u32) {
        self.period = period;
    }

    /// Counts one hardware tick
    ///
    /// An overflow is already recorded in the fault log; the caller may ignore the error.
    pub fn isr(&mut self) -> Result<(), SendError<()>> {
        if self.period == 0 {
            return Ok(());
        }
        self.ticks += 1;
        if self.ticks >= self.period {
            self.ticks = 0;
            return self.output.send(());
        }
        Ok(())
    }
}
