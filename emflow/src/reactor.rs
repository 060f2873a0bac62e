//! Deterministic run-to-completion scheduler
//!
//! The reactor keeps a FIFO of ready components. Each step pops the head, re-checks its
//! readiness and runs it to completion. Components made ready by messages sent during that
//! run are appended once it returns, in connection declaration order, and the component
//! that ran is appended after them if it is still ready. Components made ready by external
//! injection between steps are appended immediately. For a given sequence of injected
//! messages the sequence of runs is therefore fixed.
//!
//! ```text
//!            start()          step() ran          ready queue empty
//!  ┌──────┐ ───────► ┌──────┐ ───────► ┌──────────┐ ──────────► ┌───────────┐
//!  │ init │          │ Idle │          │ Stepping │             │ Quiescent │
//!  └──────┘          └──┬───┘          └────┬─────┘ ◄────────── └─────┬─────┘
//!                       │                   │        injection        │
//!                       └───────────────────┴────────────┬────────────┘
//!                                    stop / fatal fault  ▼
//!                                                   ┌────────┐
//!                                                   │ Halted │
//!                                                   └────────┘
//! ```

use core::future::poll_fn;
use emflow_platform::{Diagnostics, Idle};

use crate::component::Component;
use crate::core::{ComponentId, Fault};
use crate::graph::{ConfigurationError, DynamicGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Started, nothing has been stepped yet
    Idle,
    /// The last step ran a component
    Stepping,
    /// The ready queue was found empty
    Quiescent,
    /// Stopped for good
    Halted,
}

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    Ran(ComponentId),
    Quiescent,
    Halted,
}

/// Scheduler owning up to `C` components
pub struct Reactor<'a, const C: usize> {
    graph: &'a (dyn DynamicGraph + Sync),
    components: [Option<&'a mut dyn Component>; C],
    started: bool,
    state: State,
}

impl<'a, const C: usize> Reactor<'a, C> {
    pub(crate) fn new(graph: &'a (dyn DynamicGraph + Sync)) -> Self {
        Self {
            graph,
            components: [const { None }; C],
            started: false,
            state: State::Idle,
        }
    }

    /// Hands a declared component over to the reactor
    pub fn attach(&mut self, component: &'a mut dyn Component) -> Result<(), ConfigurationError> {
        let id = component.id();
        let slot = self
            .components
            .get_mut(usize::from(id))
            .ok_or(ConfigurationError::UnknownComponent(id))?;
        self.graph.attach(id)?;
        *slot = Some(component);
        Ok(())
    }

    /// Validates and freezes the graph, then runs the start hooks in declaration order
    ///
    /// Fails if a declared component is not attached or a mandatory input or required
    /// output is unbound.
    pub fn start(&mut self) -> Result<(), ConfigurationError> {
        self.graph.seal()?;
        self.started = true;
        info!("Starting {} components", self.graph.component_count());
        for component in self.components.iter_mut().flatten() {
            component.start();
        }
        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Runs at most one component
    ///
    /// Stop requests and fatal faults take effect here, between runs.
    ///
    /// # Panics
    ///
    /// Panics if the reactor has not been started.
    pub fn step(&mut self) -> Step {
        assert!(self.started);
        if self.state == State::Halted {
            return Step::Halted;
        }
        if self.graph.halt_requested() {
            self.halt();
            return Step::Halted;
        }

        let Some(id) = self.graph.begin_run() else {
            self.state = State::Quiescent;
            return Step::Quiescent;
        };
        self.state = State::Stepping;

        let component = unwrap!(self.components[usize::from(id)].as_deref_mut());
        trace!("Running {:?}", id);
        let result = component.run();
        self.graph.end_run(id, result);

        if self.graph.halt_requested() {
            self.halt();
        }
        Step::Ran(id)
    }

    /// Steps until the ready queue is empty or the reactor halts
    ///
    /// Returns `Stepping` if the configured drain limit was hit first.
    pub fn drain(&mut self) -> State {
        let limit = self.graph.config().drain_limit;
        let mut steps: u32 = 0;
        loop {
            if limit.is_some_and(|limit| steps >= limit.get()) {
                return self.state;
            }
            match self.step() {
                Step::Ran(_) => steps += 1,
                Step::Quiescent => return State::Quiescent,
                Step::Halted => return State::Halted,
            }
        }
    }

    /// One main loop iteration
    ///
    /// Drains, forwards faults to the platform and waits for an event if nothing is left
    /// to run.
    pub fn run_once<P: Idle + Diagnostics>(&mut self, platform: &mut P) -> State {
        let state = self.drain();
        self.forward_faults(platform);
        if state == State::Quiescent {
            platform.wait_for_event();
        }
        state
    }

    /// Main loop for bare-metal targets
    ///
    /// Returns once the reactor halts.
    pub fn run<P: Idle + Diagnostics>(&mut self, platform: &mut P) {
        while self.run_once(platform) != State::Halted {}
    }

    /// Main loop for executor-based targets
    ///
    /// Parks on the graph waker while quiescent. Faults stay in the log, see
    /// [`Reactor::pop_fault`].
    pub async fn run_async(&mut self) {
        let graph = self.graph;
        loop {
            match self.drain() {
                State::Halted => return,
                State::Stepping => embassy_futures::yield_now().await,
                State::Idle | State::Quiescent => poll_fn(|cx| graph.poll_work(cx)).await,
            }
        }
    }

    /// Halts the reactor and runs the stop hooks
    pub fn stop(&mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if self.state == State::Halted {
            return;
        }
        info!("Halting");
        if self.started {
            for component in self.components.iter_mut().flatten() {
                component.stop();
            }
        }
        self.state = State::Halted;
    }

    /// Oldest fault not yet consumed
    pub fn pop_fault(&mut self) -> Option<Fault> {
        self.graph.pop_fault()
    }

    fn forward_faults<D: Diagnostics>(&mut self, diagnostics: &mut D) {
        while let Some(fault) = self.graph.pop_fault() {
            diagnostics.report(&fault);
        }
    }
}
