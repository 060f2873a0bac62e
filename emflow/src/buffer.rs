//! User-allocated port storage.
//!
//! A buffer is lent to exactly one input port for the port's lifetime. The port and every
//! producer connected to it access the queue through the buffer's own mutex, so the raw mutex
//! type decides whether interrupt handlers may inject into it.

mod fifo;

pub use fifo::{Fifo, Register};

/// Type-erased queue operations
///
/// Callbacks run inside the buffer critical section, so readiness bookkeeping changes
/// atomically with queue occupancy.
pub(crate) trait SealedBuffer<T> {
    /// Marks the buffer as lent to a port. Returns false if it is already lent.
    fn claim(&self) -> bool;

    fn release(&self);

    /// Appends a message
    ///
    /// `on_fill` is called if the queue was empty. A full queue returns the message back.
    fn put(&self, message: T, on_fill: &mut dyn FnMut()) -> Result<(), T>;

    /// Removes the oldest message
    ///
    /// `on_drain` is called if the queue becomes empty.
    fn take(&self, on_drain: &mut dyn FnMut()) -> Option<T>;

    fn front(&self) -> Option<T>
    where
        T: Clone;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;
}

#[allow(private_bounds)]
pub trait Buffer<T>: SealedBuffer<T> {}
