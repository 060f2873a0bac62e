mod common;

use common::{Relay, Trace, fifo, graph, leak};
use emflow::buffer::Buffer;
use emflow::component::Component;
use emflow::config::Config;
use emflow::connection::connect;
use emflow::core::{ComponentId, Fault, FaultKind, Readiness};
use emflow::graph::Hub;
use emflow::port::{InPort, OutPort, SendError};
use emflow::reactor::{State, Step};

/// Emits `value` on output 0 and `value + 1` on output 1
struct Fork<'a> {
    id: ComponentId,
    trace: &'a Trace,
    input: InPort<'a, u32>,
    outputs: [OutPort<'a, u32>; 2],
}

impl<'a> Fork<'a> {
    fn new(hub: Hub<'a>, buffer: &'a (dyn Buffer<u32> + Sync), trace: &'a Trace) -> Self {
        let id = hub.declare("fork", Readiness::All).unwrap();
        Self {
            id,
            trace,
            input: InPort::create(hub, id, buffer).unwrap(),
            outputs: [
                OutPort::create(hub, id).unwrap(),
                OutPort::create(hub, id).unwrap(),
            ],
        }
    }
}

impl Component for Fork<'_> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        self.trace.push("fork", value);
        self.outputs[0].send(value)?;
        self.outputs[1].send(value + 1)?;
        Ok(())
    }
}

/// Emits every message twice
struct Burst<'a> {
    id: ComponentId,
    input: InPort<'a, u32>,
    output: OutPort<'a, u32>,
}

impl Component for Burst<'_> {
    fn id(&self) -> ComponentId {
        self.id
    }

    fn run(&mut self) -> Result<(), FaultKind> {
        let value = self.input.take()?;
        self.output.send(value)?;
        self.output.send(value)?;
        Ok(())
    }
}

#[test]
fn test_single_pass_through() {
    let trace = Trace::new();
    let graph = graph(Config::default());
    let (hub, mut reactor, _) = graph.split();

    let b_buffer = fifo::<u32, 4>();
    let a = leak(Relay::<1>::new(hub, "a", fifo::<u32, 4>(), trace));
    let b = leak(Relay::<0>::with_readiness(
        hub,
        "b",
        Readiness::Any,
        b_buffer,
        trace,
    ));
    let a_id = a.id();
    let b_id = b.id();

    let mut source = OutPort::external(hub).unwrap();
    connect(&mut source, &a.input).unwrap();
    connect(&mut a.outputs[0], &b.input).unwrap();
    reactor.attach(a).unwrap();
    reactor.attach(b).unwrap();
    reactor.start().unwrap();

    source.send(42).unwrap();
    assert_eq!(reactor.step(), Step::Ran(a_id));
    // delivered synchronously within the step
    assert_eq!(b_buffer.peek(), Some(42));

    assert_eq!(reactor.step(), Step::Ran(b_id));
    assert_eq!(reactor.step(), Step::Quiescent);
    assert_eq!(reactor.state(), State::Quiescent);
    assert_eq!(trace.take(), [("a", 42), ("b", 42)]);
    assert_eq!(reactor.pop_fault(), None);
}

#[test]
fn test_overflow_on_injection() {
    let trace = Trace::new();
    let graph = graph(Config::default());
    let (hub, mut reactor, _) = graph.split();

    let buffer = fifo::<u32, 1>();
    let sink = leak(Relay::<0>::new(hub, "sink", buffer, trace));
    let mut source = OutPort::external(hub).unwrap();
    let connection = connect(&mut source, &sink.input).unwrap().id();
    reactor.attach(sink).unwrap();
    reactor.start().unwrap();

    assert_eq!(source.send(1), Ok(()));
    assert!(source.is_full());
    assert_eq!(
        source.send(2),
        Err(SendError::Overflow {
            connection,
            message: 2
        })
    );
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.peek(), Some(1));
    assert_eq!(buffer.rejected(), 1);
    assert_eq!(
        reactor.pop_fault(),
        Some(Fault {
            component: None,
            kind: FaultKind::Overflow { connection }
        })
    );
    assert_eq!(reactor.pop_fault(), None);

    assert_eq!(reactor.drain(), State::Quiescent);
    assert_eq!(trace.take(), [("sink", 1)]);
}

#[test]
fn test_overflow_disables_producer() {
    let trace = Trace::new();
    let graph = graph(Config::default());
    let (hub, mut reactor, control) = graph.split();

    let id = hub.declare("burst", Readiness::All).unwrap();
    let burst = leak(Burst {
        id,
        input: InPort::create(hub, id, fifo::<u32, 4>()).unwrap(),
        output: OutPort::create(hub, id).unwrap(),
    });
    let sink = leak(Relay::<0>::new(hub, "sink", fifo::<u32, 1>(), trace));

    let mut source = OutPort::external(hub).unwrap();
    connect(&mut source, &burst.input).unwrap();
    let connection = connect(&mut burst.output, &sink.input).unwrap().id();
    reactor.attach(burst).unwrap();
    reactor.attach(sink).unwrap();
    reactor.start().unwrap();

    source.send(5).unwrap();
    assert_eq!(reactor.drain(), State::Quiescent);
    assert_eq!(trace.take(), [("sink", 5)]);

    // recorded once although the run also returned it
    assert_eq!(
        reactor.pop_fault(),
        Some(Fault {
            component: Some(id),
            kind: FaultKind::Overflow { connection }
        })
    );
    assert_eq!(reactor.pop_fault(), None);

    let info = control.component(id).unwrap();
    assert!(info.disabled);
    assert!(!info.ready);
    assert_eq!(info.runs, 1);

    // the rest of the graph keeps working, the producer is never scheduled again
    source.send(6).unwrap();
    assert!(!control.has_work());
    assert_eq!(reactor.drain(), State::Quiescent);
    assert!(trace.take().is_empty());
    assert_eq!(control.component(id).unwrap().runs, 1);
}

#[test]
fn test_fan_out_follows_connection_order() {
    let trace = Trace::new();
    let graph = graph(Config::default());
    let (hub, mut reactor, _) = graph.split();

    let fork = leak(Fork::new(hub, fifo::<u32, 4>(), trace));
    let b = leak(Relay::<0>::new(hub, "b", fifo::<u32, 4>(), trace));
    let c = leak(Relay::<0>::new(hub, "c", fifo::<u32, 4>(), trace));

    let mut source = OutPort::external(hub).unwrap();
    connect(&mut source, &fork.input).unwrap();
    // output 1 is connected first, so its destination runs first
    connect(&mut fork.outputs[1], &c.input).unwrap();
    connect(&mut fork.outputs[0], &b.input).unwrap();
    reactor.attach(fork).unwrap();
    reactor.attach(b).unwrap();
    reactor.attach(c).unwrap();
    reactor.start().unwrap();

    source.send(7).unwrap();
    assert_eq!(reactor.drain(), State::Quiescent);
    assert_eq!(trace.take(), [("fork", 7), ("c", 8), ("b", 7)]);
}

#[test]
fn test_fan_out_within_one_drain() {
    let trace = Trace::new();
    let graph = graph(Config::default());
    let (hub, mut reactor, _) = graph.split();

    let fork = leak(Fork::new(hub, fifo::<u32, 4>(), trace));
    let b = leak(Relay::<0>::new(hub, "b", fifo::<u32, 4>(), trace));
    let c = leak(Relay::<0>::new(hub, "c", fifo::<u32, 4>(), trace));

    let mut source = OutPort::external(hub).unwrap();
    connect(&mut source, &fork.input).unwrap();
    connect(&mut fork.outputs[0], &b.input).unwrap();
    connect(&mut fork.outputs[1], &c.input).unwrap();
    reactor.attach(fork).unwrap();
    reactor.attach(b).unwrap();
    reactor.attach(c).unwrap();
    reactor.start().unwrap();

    source.send(1).unwrap();
    source.send(10).unwrap();
    assert_eq!(reactor.drain(), State::Quiescent);
    // the fork is re-queued behind the components it triggered
    assert_eq!(
        trace.take(),
        [
            ("fork", 1),
            ("b", 1),
            ("c", 2),
            ("fork", 10),
            ("b", 10),
            ("c", 11)
        ]
    );
}
