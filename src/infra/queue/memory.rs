//! In-memory two-band admission queue.

use std::collections::VecDeque;

use crate::core::task::{Prioritized, TaskQueue};
use crate::core::GovernorError;
use crate::util::serde::Priority;

/// In-memory queue with one FIFO band per priority.
///
/// The high band always drains before the low band. Retried items enter at
/// the front of their band, fresh items at the back. All operations are O(1).
pub struct InMemoryQueue<I> {
    max_depth: usize,
    high: VecDeque<I>,
    low: VecDeque<I>,
}

impl<I> InMemoryQueue<I> {
    /// Create a new in-memory queue with a maximum depth.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            high: VecDeque::with_capacity(max_depth.min(64)),
            low: VecDeque::with_capacity(max_depth.min(1024)),
        }
    }

    /// Number of items waiting in one band.
    pub fn band_len(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high.len(),
            Priority::Low => self.low.len(),
        }
    }

    fn band_mut(&mut self, priority: Priority) -> &mut VecDeque<I> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Low => &mut self.low,
        }
    }
}

impl<I> TaskQueue<I> for InMemoryQueue<I>
where
    I: Prioritized + Send,
{
    fn push_back(&mut self, item: I) -> Result<(), GovernorError> {
        let depth = self.len();
        if depth >= self.max_depth {
            return Err(GovernorError::QueueFull { depth });
        }
        self.band_mut(item.priority()).push_back(item);
        Ok(())
    }

    fn push_front(&mut self, item: I) {
        self.band_mut(item.priority()).push_front(item);
    }

    fn pop(&mut self) -> Option<I> {
        self.high.pop_front().or_else(|| self.low.pop_front())
    }

    fn drain(&mut self) -> Vec<I> {
        self.high.drain(..).chain(self.low.drain(..)).collect()
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn len(&self) -> usize {
        self.high.len() + self.low.len()
    }
}
