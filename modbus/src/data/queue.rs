use std::collections::VecDeque;

/// Bounded FIFO. `push_replace` evicts the oldest entry once the limit is reached.
#[derive(Debug)]
pub struct FixedQueue<T> {
    data: VecDeque<T>,
    limit: usize,
}

impl<T> FixedQueue<T> {
    pub fn new(limit: usize) -> FixedQueue<T> {
        FixedQueue {
            data: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn push(&mut self, value: T) -> bool {
        if self.data.len() < self.limit {
            self.data.push_back(value);
            true
        } else {
            false
        }
    }

    pub fn count_free(&self) -> usize {
        self.limit - self.len()
    }

    pub fn push_replace(&mut self, value: T) -> bool {
        if self.count_free() == 0 {
            self.data.pop_front();
        }
        self.push(value)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.data.iter()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push() {
        let mut storage = FixedQueue::<i32>::new(4);

        for i in 0..10 {
            storage.push(i);
        }

        assert_eq!(storage.len(), 4);
        assert_eq!(storage.count_free(), 0);
        let values: Vec<i32> = storage.iter().copied().collect();
        assert_eq!(values, [0, 1, 2, 3]);
    }

    #[test]
    fn push_replace_keeps_newest() {
        let mut storage = FixedQueue::<i32>::new(4);

        for i in 0..10 {
            storage.push_replace(i);
        }

        assert_eq!(storage.len(), 4);
        let values: Vec<i32> = storage.iter().copied().collect();
        assert_eq!(values, [6, 7, 8, 9]);

        let newest: Vec<i32> = storage.iter().rev().copied().collect();
        assert_eq!(newest, [9, 8, 7, 6]);
    }
}
