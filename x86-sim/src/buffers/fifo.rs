//! `FifoBuffer<T>`: always propagates staged elements, admission bounded
//! only by total occupancy against a fixed capacity (spec.md §4.5).

use std::collections::VecDeque;

use crate::buffers::{Buffer, Sink, Source};
use crate::log::Logger;

/// A plain bounded queue: nothing ever stalls in Propagate, and a push is
/// admitted whenever there is still room for it across both the consumable
/// and staging sides combined.
pub struct FifoBuffer<T> {
    cap: usize,
    consumable: VecDeque<T>,
    staging: Vec<T>,
    element_tag: &'static str,
}

impl<T> FifoBuffer<T> {
    pub fn new(cap: usize, element_tag: &'static str) -> Self {
        Self { cap, consumable: VecDeque::new(), staging: Vec::new(), element_tag }
    }

    fn occupied(&self) -> usize {
        self.consumable.len() + self.staging.len()
    }
}

impl<T> Sink<T> for FifoBuffer<T> {
    fn push(&mut self, item: T) -> bool {
        if self.occupied() + 1 > self.cap {
            return false;
        }
        self.staging.push(item);
        true
    }

    fn push_many(&mut self, items: Vec<T>) -> bool {
        if self.occupied() + items.len() > self.cap {
            return false;
        }
        self.staging.extend(items);
        true
    }
}

impl<T> Source<T> for FifoBuffer<T> {
    fn pop(&mut self) -> Option<T> {
        self.consumable.pop_front()
    }

    fn peek(&self) -> Option<&T> {
        self.consumable.front()
    }

    fn is_empty(&self) -> bool {
        self.consumable.is_empty()
    }

    fn len(&self) -> usize {
        self.consumable.len()
    }
}

impl<T> Buffer for FifoBuffer<T> {
    fn propagate(&mut self, logger: &mut dyn Logger) {
        let staged = self.staging.len();
        if staged == 0 {
            return;
        }
        for item in self.staging.drain(..) {
            self.consumable.push_back(item);
        }
        logger.log(self.element_tag, format!("{staged} promoted, {} consumable", self.consumable.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NullLogger;

    #[test]
    fn push_admitted_iff_total_occupancy_fits_capacity() {
        let mut fifo: FifoBuffer<u32> = FifoBuffer::new(2, "uop");
        assert!(fifo.push(1));
        assert!(fifo.push(2));
        assert!(!fifo.push(3));
    }

    #[test]
    fn push_many_is_all_or_nothing() {
        let mut fifo: FifoBuffer<u32> = FifoBuffer::new(2, "uop");
        assert!(!fifo.push_many(vec![1, 2, 3]));
        assert_eq!(fifo.staging.len(), 0);
        assert!(fifo.push_many(vec![1, 2]));
    }

    #[test]
    fn propagate_always_promotes_staged_elements() {
        let mut fifo: FifoBuffer<u32> = FifoBuffer::new(4, "uop");
        fifo.push(1);
        fifo.push(2);
        fifo.propagate(&mut NullLogger);
        assert_eq!(fifo.len(), 2);
        assert_eq!(fifo.pop(), Some(1));
    }
}
