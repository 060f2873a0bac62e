use core::num::NonZeroU32;

/// Reaction to a steady-state fault attributed to a component
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultPolicy {
    /// Report the fault and stop scheduling the faulted component
    #[default]
    DisableComponent,
    /// Report the fault and halt the reactor at the end of the current step
    Halt,
}

/// Graph configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {
    /// Applied to overflow and run faults
    ///
    /// Faults of external producers are only reported under `DisableComponent`.
    pub fault_policy: FaultPolicy,
    /// Maximal number of steps a single drain may take
    ///
    /// A drain that hits the limit returns while still stepping, which bounds the time
    /// between main loop iterations. `None` drains until quiescence.
    pub drain_limit: Option<NonZeroU32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::DisableComponent,
            drain_limit: None,
        }
    }
}

impl Config {
    pub const fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    pub const fn with_drain_limit(mut self, limit: NonZeroU32) -> Self {
        self.drain_limit = Some(limit);
        self
    }
}
