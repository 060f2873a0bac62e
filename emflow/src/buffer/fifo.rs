use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Deque;

use super::{Buffer, SealedBuffer};

/// Bounded FIFO queue of `N` messages
///
/// A full queue rejects new messages and keeps its contents.
pub struct Fifo<M: RawMutex, T, const N: usize> {
    inner: Mutex<M, RefCell<Inner<T, N>>>,
}

/// Single-slot register
pub type Register<M, T> = Fifo<M, T, 1>;

struct Inner<T, const N: usize> {
    queue: Deque<T, N>,
    claimed: bool,
    rejected: u32,
}

impl<M: RawMutex, T, const N: usize> Fifo<M, T, N> {
    const _ASSERT: () = core::assert!(N > 0, "zero capacity queue");

    pub const fn new() -> Self {
        let () = Self::_ASSERT;
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                queue: Deque::new(),
                claimed: false,
                rejected: 0,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().queue.is_full())
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of messages rejected because the queue was full
    pub fn rejected(&self) -> u32 {
        self.inner.lock(|cell| cell.borrow().rejected)
    }

    /// Oldest message, left in place
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.lock(|cell| cell.borrow().queue.front().cloned())
    }
}

impl<M: RawMutex, T, const N: usize> Default for Fifo<M, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, T, const N: usize> SealedBuffer<T> for Fifo<M, T, N> {
    fn claim(&self) -> bool {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            !core::mem::replace(&mut inner.claimed, true)
        })
    }

    fn release(&self) {
        self.inner.lock(|cell| cell.borrow_mut().claimed = false);
    }

    fn put(&self, message: T, on_fill: &mut dyn FnMut()) -> Result<(), T> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let was_empty = inner.queue.is_empty();
            if let Err(message) = inner.queue.push_back(message) {
                inner.rejected = inner.rejected.saturating_add(1);
                return Err(message);
            }
            if was_empty {
                on_fill();
            }
            Ok(())
        })
    }

    fn take(&self, on_drain: &mut dyn FnMut()) -> Option<T> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            let message = inner.queue.pop_front()?;
            if inner.queue.is_empty() {
                on_drain();
            }
            Some(message)
        })
    }

    fn front(&self) -> Option<T>
    where
        T: Clone,
    {
        self.peek()
    }

    fn len(&self) -> usize {
        Fifo::len(self)
    }

    fn capacity(&self) -> usize {
        N
    }
}

impl<M: RawMutex, T, const N: usize> Buffer<T> for Fifo<M, T, N> {}
