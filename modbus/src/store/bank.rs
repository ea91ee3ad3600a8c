use crate::data::BANK_SIZE;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Fixed size array of slots behind its own lock.
#[derive(Debug)]
pub struct Bank<T> {
    slots: Mutex<Vec<T>>,
}

impl<T: Copy + Default> Default for Bank<T> {
    fn default() -> Self {
        Bank::new()
    }
}

impl<T: Copy + Default> Bank<T> {
    pub fn new() -> Bank<T> {
        Bank {
            slots: Mutex::new(vec![T::default(); BANK_SIZE]),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Out of range slots read as the default value.
    pub fn get(&self, slot: usize) -> T {
        self.lock().get(slot).copied().unwrap_or_default()
    }

    /// Out of range slots are ignored.
    pub fn set(&self, slot: usize, value: T) {
        if let Some(item) = self.lock().get_mut(slot) {
            *item = value;
        }
    }

    /// Copies slots starting at `start` into `dst`; returns the number copied.
    pub fn copy_range(&self, start: usize, dst: &mut [T]) -> usize {
        let slots = self.lock();
        let Some(src) = slots.get(start..) else {
            return 0;
        };
        let count = std::cmp::min(src.len(), dst.len());
        dst[..count].copy_from_slice(&src[..count]);
        count
    }

    /// Writes `src` starting at `start` in one critical section.
    pub fn write_range(&self, start: usize, src: &[T]) -> usize {
        let mut slots = self.lock();
        let Some(dst) = slots.get_mut(start..) else {
            return 0;
        };
        let count = std::cmp::min(src.len(), dst.len());
        dst[..count].copy_from_slice(&src[..count]);
        count
    }

    /// Runs `op` with the bank locked.
    pub fn with<R>(&self, op: impl FnOnce(&mut [T]) -> R) -> R {
        let mut slots = self.lock();
        op(&mut slots[..])
    }
}
