//! Deterministic platform substitute
//!
//! Neither type touches hardware or wall-clock time, so tests built on them replay
//! identically.
use core::cell::Cell;
use heapless::Vec;

use crate::time::{Duration, Instant};
use crate::{Clock, Diagnostics, Fault, Idle};

/// Clock advanced by hand
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub const fn new(start: Instant) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: Instant) {
        self.now.set(now);
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::from_ticks(0))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Platform that records faults and idle calls
///
/// `on_idle` stands in for interrupts: it is called with the idle call count
/// (starting at one) every time the main loop waits for an event. It typically
/// injects messages or requests a stop.
/// Up to `F` faults are kept, later ones are only counted.
pub struct MockPlatform<H: FnMut(u32), const F: usize> {
    clock: ManualClock,
    on_idle: H,
    idle_count: u32,
    faults: Vec<Fault, F>,
    dropped_faults: u32,
}

impl<H: FnMut(u32), const F: usize> MockPlatform<H, F> {
    pub fn new(on_idle: H) -> Self {
        Self {
            clock: ManualClock::default(),
            on_idle,
            idle_count: 0,
            faults: Vec::new(),
            dropped_faults: 0,
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn idle_count(&self) -> u32 {
        self.idle_count
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn dropped_faults(&self) -> u32 {
        self.dropped_faults
    }
}

impl<H: FnMut(u32), const F: usize> Clock for MockPlatform<H, F> {
    fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl<H: FnMut(u32), const F: usize> Idle for MockPlatform<H, F> {
    fn wait_for_event(&mut self) {
        self.idle_count += 1;
        (self.on_idle)(self.idle_count);
    }
}

impl<H: FnMut(u32), const F: usize> Diagnostics for MockPlatform<H, F> {
    fn report(&mut self, fault: &Fault) {
        if self.faults.push(*fault).is_err() {
            self.dropped_faults += 1;
        }
    }
}
