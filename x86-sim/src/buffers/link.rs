//! `LinkBuffer<T>`: a single-slot-at-a-time handoff that only propagates
//! once the consumer has fully drained the consumable side, modelling a
//! strict one-cycle-behind link between two pipeline stages (spec.md §4.5).

use std::collections::VecDeque;

use crate::buffers::{Buffer, Sink, Source, StallTracker};
use crate::log::Logger;

/// A buffer that refuses new pushes while stalled, and only moves staged
/// elements to the consumable side once that side was emptied by the
/// consumer last cycle.
pub struct LinkBuffer<T> {
    cap: usize,
    consumable: VecDeque<T>,
    staging: Vec<T>,
    stalled: bool,
    stall_tracker: StallTracker,
    element_tag: &'static str,
}

impl<T> LinkBuffer<T> {
    pub fn new(cap: usize, element_tag: &'static str) -> Self {
        Self {
            cap,
            consumable: VecDeque::new(),
            staging: Vec::new(),
            stalled: false,
            stall_tracker: StallTracker::default(),
            element_tag,
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }
}

impl<T> Sink<T> for LinkBuffer<T> {
    fn push(&mut self, item: T) -> bool {
        if self.stalled || self.staging.len() + 1 > self.cap {
            return false;
        }
        self.staging.push(item);
        true
    }

    fn push_many(&mut self, items: Vec<T>) -> bool {
        if self.stalled || self.staging.len() + items.len() > self.cap {
            return false;
        }
        self.staging.extend(items);
        true
    }
}

impl<T> Source<T> for LinkBuffer<T> {
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

impl<T> Buffer for LinkBuffer<T> {
    fn propagate(&mut self, logger: &mut dyn Logger) {
        if self.staging.is_empty() {
            self.stalled = false;
            self.stall_tracker.reset();
            return;
        }
        if !self.consumable.is_empty() {
            self.stalled = true;
            if self.stall_tracker.bump() {
                tracing::warn!(element = self.element_tag, cycles = self.stall_tracker.cycles(), "buffer stalled");
            }
            logger.log("PStall", self.stall_tracker.cycles().to_string());
            return;
        }
        self.stalled = false;
        self.stall_tracker.reset();
        let staged = self.staging.len();
        for item in self.staging.drain(..) {
            self.consumable.push_back(item);
        }
        logger.log(self.element_tag, format!("{staged} promoted"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NullLogger;

    #[test]
    fn never_propagates_while_consumable_side_is_non_empty() {
        let mut link: LinkBuffer<u32> = LinkBuffer::new(4, "uop");
        link.push(1);
        link.propagate(&mut NullLogger);
        assert_eq!(link.len(), 1);

        link.push(2);
        link.propagate(&mut NullLogger);
        // consumable (holding 1) was never drained, so 2 stays staged.
        assert_eq!(link.len(), 1);
        assert!(link.is_stalled());
    }

    #[test]
    fn push_fails_while_stalled() {
        let mut link: LinkBuffer<u32> = LinkBuffer::new(4, "uop");
        link.push(1);
        link.propagate(&mut NullLogger);
        link.push(2);
        link.propagate(&mut NullLogger);
        assert!(link.is_stalled());
        assert!(!link.push(3));
    }

    #[test]
    fn propagates_once_consumer_drains_consumable_side() {
        let mut link: LinkBuffer<u32> = LinkBuffer::new(4, "uop");
        link.push(1);
        link.propagate(&mut NullLogger);
        assert_eq!(link.pop(), Some(1));
        link.push(2);
        link.propagate(&mut NullLogger);
        assert_eq!(link.len(), 1);
        assert!(!link.is_stalled());
    }
}
