//! Emflow platform interface
//!
//! The crate provides an interface between a target platform and the Emflow engine.
//! Limited scope facilitates compatibility across versions.
//! Board support crates should depend on this crate. Emflow users should depend on
//! the `emflow` crate instead.
//!
//! A platform supplies three services:
//! * `Clock` is a monotonic time source for components with periodic or timestamped behavior
//! * `Idle` parks the main loop until an interrupt may have injected a message
//! * `Diagnostics` receives steady-state faults the reactor could not keep local
//!
//! Critical sections are not part of the trait set. The engine guards every port access with
//! an `embassy_sync` blocking mutex, and the raw mutex type picked by the application selects
//! the strategy:
//! * `CriticalSectionRawMutex` allows interrupt handlers to inject messages. The actual
//!   critical section implementation is linked in through the `critical-section` crate.
//! * `ThreadModeRawMutex` has no system-wide effects but restricts all port access to
//!   thread mode. `embassy_sync` provides it on Cortex-M targets only, so it is not
//!   re-exported here.
//!
//! The `mock` feature provides a deterministic host-side substitute for tests.
#![no_std]

pub use critical_section;
pub use emflow_core::Fault;

#[cfg(feature = "mock")]
pub mod mock;

pub mod mutex {
    pub use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex, RawMutex};
}

pub mod time {
    pub use embassy_time::{Duration, Instant};
}

use time::Instant;

/// Monotonic time source
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Main loop idle strategy
pub trait Idle {
    /// Blocks until an event that may have injected a message occurs
    ///
    /// Spurious returns are allowed. A typical implementation executes WFE/WFI.
    fn wait_for_event(&mut self);
}

/// Fault sink
pub trait Diagnostics {
    fn report(&mut self, fault: &Fault);
}

/// Complete platform collaborator
pub trait Platform: Clock + Idle + Diagnostics {}

impl<P: Clock + Idle + Diagnostics> Platform for P {}

/// Clock backed by the `embassy-time` driver linked into the application
#[derive(Debug, Default, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Runs `f` inside a platform critical section
///
/// Interrupt handlers that touch state shared with the main loop outside of ports
/// should use it.
pub fn with_critical_section<R>(f: impl FnOnce() -> R) -> R {
    critical_section::with(|_| f())
}
