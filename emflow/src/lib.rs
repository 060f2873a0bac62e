//! # Emflow
//!
//! This library provides a pipes-and-filters execution engine for no_std environments.
//! An application is a static graph of components exchanging typed messages through bounded
//! queues. All storage is provided by the user, so the engine needs no dynamic memory
//! allocation, and the execution order is reproducible for a given input sequence.
//!
//! ## Architecture
//!
//! ```text
//!                ┌─────────┐
//!                │ Reactor │──── runs ────────────────┐
//!                └────┬────┘                          ▼
//! ┌─────────┐    ┌────▼────┐    ┌─────┐    ┌──────────────────────┐
//! │ Control ├───►│  Graph  │◄───┤ Hub │◄───┤ Component            │
//! └─────────┘    └────▲────┘    └─────┘    │ ┌────────┐ ┌───────┐ │
//!                     │                    │ │ InPort │ │OutPort│ │
//!                     │ readiness          │ └───┬────┘ └───┬───┘ │
//!                     │                    └─────┼──────────┼─────┘
//!                ┌────┴─────┐                    │          │
//!                │ Buffer 1 │◄───────────────────┘          │
//!                └──────────┘                               ▼
//!                                                    (next component's buffer)
//! ```
//! Components:
//! * _Graph_ holds the registry: declared components, their port layout, the connection
//!   table, input occupancy and the ready queue. It knows no message types.
//! * _Hub_ is a shared handle for declaring components and creating ports.
//! * _Reactor_ owns the component objects and runs them one at a time.
//! * _Control_ is a shared handle for stop requests and diagnostics.
//! * _Buffer_ is a user-allocated bounded queue backing one input port.
//! * _Port_ is a typed handle owned by a component. An output port forwards messages
//!   straight into the buffer of the input port it is connected to.
//!
//! Wiring happens before [`Reactor::start`](reactor::Reactor::start); the graph is sealed
//! afterwards. Assembly errors surface as [`ConfigurationError`](graph::ConfigurationError).
//! Steady-state faults (overflow, run failures) are recorded in a fault log and handled
//! according to [`FaultPolicy`](config::FaultPolicy) without unwinding.
//!
//! ## Concurrency model
//!
//! Components run on a single thread of control, strictly one after another. The only
//! concurrent producers are interrupt handlers injecting through external output ports.
//! Every buffer and the graph registry are guarded by an `embassy_sync` blocking mutex:
//! * _CriticalSectionRawMutex_ allows injection from interrupts. Critical sections cover a
//!   single queue operation plus the matching readiness update, so their duration is bounded.
//! * _ThreadModeRawMutex_ (Cortex-M targets only) has no system-wide effects but requires
//!   every port access to run in thread mode.
//!
//! The lock order is buffer first, registry second.
//!
//! ## Limitations
//!
//! * Connections are strictly point-to-point and cannot be changed after start.
//! * Queues never grow: a full queue rejects the message and records an overflow fault.
#![no_std]

pub use emflow_core as core;
pub use emflow_platform as platform;
pub use emflow_platform::time;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod buffer;
pub mod component;
pub mod components;
pub mod config;
pub mod connection;
pub mod graph;
pub mod port;
pub mod reactor;
mod registry;
#[allow(dead_code)]
mod utils;
