mod ready_queue;
mod stacked_array;

pub use ready_queue::ReadyQueue;
pub use stacked_array::DuplexArray;

/// Fixed set of flags indexed by `u8`, iterated in ascending order
pub struct FlagArray<const N: usize> {
    flags: [bool; N],
    count: usize,
}

impl<const N: usize> FlagArray<N> {
    pub const fn new() -> Self {
        Self {
            flags: [false; N],
            count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn insert(&mut self, index: u8) {
        let flag = &mut self.flags[usize::from(index)];
        if !*flag {
            *flag = true;
            self.count += 1;
        }
    }

    /// Removes and returns the lowest index
    pub fn pop_first(&mut self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }
        let index = unwrap!(self.flags.iter().position(|flag| *flag));
        self.flags[index] = false;
        self.count -= 1;
        Some(index as u8)
    }
}

impl<const N: usize> Default for FlagArray<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_array() {
        let mut flags = FlagArray::<8>::new();
        assert!(flags.is_empty());
        flags.insert(5);
        flags.insert(2);
        flags.insert(5);
        assert_eq!(flags.pop_first(), Some(2));
        assert_eq!(flags.pop_first(), Some(5));
        assert_eq!(flags.pop_first(), None);
        assert!(flags.is_empty());
    }
}
