//! Bounded ring queue of events, for reordering nearly-sorted streams

use crate::{Error, Event, Result};
use tracing::debug;

/// A fixed-capacity ring buffer. A push onto a full queue fails and leaves
/// the queue as it was; nothing is ever dropped silently.
#[derive(Clone, Debug)]
pub struct Queue<E> {
    buf: Vec<E>,
    /// Index of the front element
    start: usize,
    len: usize,
}

impl<E: Event> Queue<E> {
    pub fn new(capacity: usize) -> Self {
        debug!("allocating queue of {} events", capacity);
        Queue { buf: vec![E::default(); capacity], start: 0, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        let j = self.start + i;
        if j >= self.buf.len() { j - self.buf.len() } else { j }
    }

    pub fn push(&mut self, e: E) -> Result<()> {
        if self.is_full() {
            return Err(Error::QueueOverflow { capacity: self.capacity() });
        }
        let i = self.slot(self.len);
        self.buf[i] = e;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<E> {
        if self.is_empty() {
            return Err(Error::QueueEmpty);
        }
        let e = self.buf[self.start];
        self.start = self.slot(1);
        self.len -= 1;
        Ok(e)
    }

    pub fn front(&self) -> Option<&E> {
        self.index(0)
    }

    pub fn back(&self) -> Option<&E> {
        self.len.checked_sub(1).and_then(|i| self.index(i))
    }

    /// Element `i` places behind the front
    pub fn index(&self, i: usize) -> Option<&E> {
        if i < self.len {
            Some(&self.buf[self.slot(i)])
        } else {
            None
        }
    }

    /// Make the contents contiguous from the start of the buffer, then sort
    /// them chronologically. The sort is stable, so events that compare
    /// equal keep their arrival order and sorting twice changes nothing.
    pub fn sort(&mut self) {
        if self.start != 0 {
            self.buf.rotate_left(self.start);
            self.start = 0;
        }
        self.buf[..self.len].sort_by(|a, b| a.cmp_time(b));
    }

    /// Iterate front to back without consuming.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        (0..self.len).map(move |i| &self.buf[self.slot(i)])
    }
}
