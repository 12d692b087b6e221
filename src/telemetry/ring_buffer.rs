//! Fixed-capacity FIFO used by every sampling thread.
//!
//! `SLOTS` physical slots hold at most `SLOTS - 1` items: one slot is
//! always left empty so that `head == tail` means empty and never full.
//! A push that would make `head` catch up with `tail` is rejected with
//! [`PushStatus::Full`] and the item is not stored; nothing is ever
//! overwritten.
//!
//! No locking.  A buffer is owned by exactly one sampling thread, which
//! is both producer and consumer.

/// Result of [`RingBuffer::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PushStatus {
    /// Item stored.
    Ok,
    /// Buffer already held `capacity()` items; the item was dropped.
    Full,
}

#[derive(Debug, Clone)]
pub struct RingBuffer<T, const SLOTS: usize> {
    slots: [T; SLOTS],
    /// Next slot to write.
    head: usize,
    /// Next slot to read.
    tail: usize,
}

impl<T: Copy + Default, const SLOTS: usize> RingBuffer<T, SLOTS> {
    pub fn new() -> Self {
        const { assert!(SLOTS >= 2, "a ring buffer needs at least two slots") };
        Self {
            slots: [T::default(); SLOTS],
            head: 0,
            tail: 0,
        }
    }

    /// Maximum number of items held at once.
    pub const fn capacity(&self) -> usize {
        SLOTS - 1
    }

    pub fn len(&self) -> usize {
        (self.head + SLOTS - self.tail) % SLOTS
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.head + 1) % SLOTS == self.tail
    }

    pub fn push(&mut self, item: T) -> PushStatus {
        let next = (self.head + 1) % SLOTS;
        if next == self.tail {
            return PushStatus::Full;
        }
        self.slots[self.head] = item;
        self.head = next;
        PushStatus::Ok
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.tail];
        self.tail = (self.tail + 1) % SLOTS;
        Some(item)
    }

    /// Oldest item without removing it.
    pub fn peek(&self) -> Option<&T> {
        (!self.is_empty()).then(|| &self.slots[self.tail])
    }
}

impl<T: Copy + Default, const SLOTS: usize> Default for RingBuffer<T, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}
