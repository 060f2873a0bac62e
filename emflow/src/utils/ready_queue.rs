use crate::utils::DuplexArray;

struct Node {
    next: u8,
    prev: u8,
}

pub const MAX_CAPACITY: usize = u8::MAX as usize;

/// Cyclic doubly linked list over array indices
///
/// Every node starts as a self-loop. Nodes below `N1` serve as list heads.
struct CycleList<const N1: usize, const N2: usize> {
    nodes: DuplexArray<Node, N1, N2>,
}

impl<const N1: usize, const N2: usize> CycleList<N1, N2> {
    pub fn new() -> Self {
        Self {
            nodes: DuplexArray::from_fn(|i| {
                let node = unwrap!(u8::try_from(i));
                Node {
                    next: node,
                    prev: node,
                }
            }),
        }
    }

    pub fn next(&self, node: u8) -> u8 {
        self.nodes[usize::from(node)].next
    }

    pub fn prev(&self, node: u8) -> u8 {
        self.nodes[usize::from(node)].prev
    }

    pub fn is_bound(&self, node: u8) -> bool {
        self.nodes[usize::from(node)].next != node
    }

    pub fn unbind(&mut self, node: u8) {
        let next = self.nodes[usize::from(node)].next;
        let prev = self.nodes[usize::from(node)].prev;
        self.nodes[usize::from(node)].prev = node;
        self.nodes[usize::from(node)].next = node;
        self.nodes[usize::from(next)].prev = prev;
        self.nodes[usize::from(prev)].next = next;
    }

    pub fn move_before(&mut self, node: u8, next: u8) {
        self.unbind(node);

        let prev = self.nodes[usize::from(next)].prev;
        self.nodes[usize::from(node)].next = next;
        self.nodes[usize::from(node)].prev = prev;
        self.nodes[usize::from(next)].prev = node;
        self.nodes[usize::from(prev)].next = node;
    }
}

/// FIFO of distinct entries in `0..N`
///
/// Pushing an entry that is already queued keeps its position.
/// All operations are O(1).
pub struct ReadyQueue<const N: usize> {
    nodes: CycleList<1, N>,
}

impl<const N: usize> ReadyQueue<N> {
    const _ASSERT: usize = MAX_CAPACITY - N;
    const HEAD: u8 = 0;
    const ENTRY_OFFSET: u8 = 1;

    pub fn new() -> Self {
        let _ = Self::_ASSERT;
        Self {
            nodes: CycleList::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.nodes.is_bound(Self::HEAD)
    }

    pub fn contains(&self, entry: u8) -> bool {
        assert!(usize::from(entry) < N);
        self.nodes.is_bound(Self::ENTRY_OFFSET + entry)
    }

    pub fn front(&self) -> Option<u8> {
        self.nodes.next(Self::HEAD).checked_sub(Self::ENTRY_OFFSET)
    }

    pub fn back(&self) -> Option<u8> {
        self.nodes.prev(Self::HEAD).checked_sub(Self::ENTRY_OFFSET)
    }

    /// Appends the entry unless it is already queued
    ///
    /// Returns true if the entry was appended.
    pub fn push_back(&mut self, entry: u8) -> bool {
        if self.contains(entry) {
            return false;
        }
        self.nodes.move_before(Self::ENTRY_OFFSET + entry, Self::HEAD);
        true
    }

    pub fn pop_front(&mut self) -> Option<u8> {
        let entry = self.front()?;
        self.nodes.unbind(Self::ENTRY_OFFSET + entry);
        Some(entry)
    }

    pub fn remove(&mut self, entry: u8) {
        assert!(usize::from(entry) < N);
        self.nodes.unbind(Self::ENTRY_OFFSET + entry);
    }
}

impl<const N: usize> Default for ReadyQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let mut queue = ReadyQueue::<4>::new();
        assert!(queue.is_empty());
        assert_eq!(queue.front(), None);
        assert_eq!(queue.back(), None);
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_insertion_order() {
        let mut queue = ReadyQueue::<4>::new();
        assert!(queue.push_back(2));
        assert!(queue.push_back(0));
        assert!(queue.push_back(3));
        assert_eq!(queue.front(), Some(2));
        assert_eq!(queue.back(), Some(3));

        assert_eq!(queue.pop_front(), Some(2));
        assert_eq!(queue.pop_front(), Some(0));
        assert_eq!(queue.pop_front(), Some(3));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_idempotent_push() {
        let mut queue = ReadyQueue::<4>::new();
        assert!(queue.push_back(1));
        assert!(queue.push_back(2));
        assert!(!queue.push_back(1));
        assert!(queue.contains(1));
        assert_eq!(queue.pop_front(), Some(1));
        assert!(!queue.contains(1));
        assert!(queue.push_back(1));
        assert_eq!(queue.pop_front(), Some(2));
        assert_eq!(queue.pop_front(), Some(1));
    }

    #[test]
    fn test_remove() {
        let mut queue = ReadyQueue::<4>::new();
        queue.push_back(0);
        queue.push_back(1);
        queue.push_back(2);
        queue.remove(1);
        queue.remove(3);
        assert_eq!(queue.pop_front(), Some(0));
        assert_eq!(queue.pop_front(), Some(2));
        assert!(queue.is_empty());
    }
}
