use std::collections::VecDeque;

/// Bounded ring of in-memory snapshots, newest at the back.
/// The oldest generation is discarded when a new one does not fit.
#[derive(Debug, Default)]
pub struct UndoRing {
    levels: usize,
    generations: VecDeque<Vec<u8>>,
}

impl UndoRing {
    pub fn new(levels: usize) -> UndoRing {
        UndoRing {
            levels,
            generations: VecDeque::with_capacity(levels),
        }
    }

    /// Returns false when undo is disabled.
    pub fn push(&mut self, snapshot: Vec<u8>) -> bool {
        if self.levels == 0 {
            return false;
        }
        while self.generations.len() >= self.levels {
            self.generations.pop_front();
        }
        self.generations.push_back(snapshot);
        true
    }

    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.generations.pop_back()
    }

    /// Put back a generation that could not be applied.
    pub fn unpop(&mut self, snapshot: Vec<u8>) {
        self.generations.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_dropped() {
        let mut ring = UndoRing::new(2);
        assert!(ring.push(vec![1]));
        assert!(ring.push(vec![2]));
        assert!(ring.push(vec![3]));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.pop(), Some(vec![3]));
        assert_eq!(ring.pop(), Some(vec![2]));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_disabled() {
        let mut ring = UndoRing::new(0);
        assert!(!ring.push(vec![1]));
        assert!(ring.is_empty());
    }
}
