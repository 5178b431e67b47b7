//! `DispatchPort<T>` and `IssuePort<T>`: `LinkBuffer`-shaped handoffs used
//! at issue (spec.md §4.5).

use std::collections::VecDeque;

use crate::buffers::{Buffer, Sink, Source, StallTracker};
use crate::log::Logger;
use crate::uop::IndexedElement;

/// An execution port's issue queue: a [`crate::buffers::LinkBuffer`] of
/// capacity `units`, which additionally logs a `PortPressure` line per
/// staged element during PrePropagate (i.e. before deciding whether this
/// cycle's elements can be promoted) — pressure is charged for the cycle a
/// µop occupies the port, independently of whether the execution unit
/// downstream is itself ready to accept it yet.
pub struct DispatchPort<T> {
    cap: usize,
    consumable: VecDeque<T>,
    staging: Vec<T>,
    stalled: bool,
    stall_tracker: StallTracker,
}

impl<T> DispatchPort<T> {
    pub fn new(units: usize) -> Self {
        Self { cap: units, consumable: VecDeque::new(), staging: Vec::new(), stalled: false, stall_tracker: StallTracker::default() }
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }
}

impl<T> Sink<T> for DispatchPort<T> {
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

impl<T> Source<T> for DispatchPort<T> {
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

impl<T: IndexedElement> Buffer for DispatchPort<T> {
    fn propagate(&mut self, logger: &mut dyn Logger) {
        for item in &self.staging {
            let index = item.instruction_index();
            logger.log("PortPressure", format!("{},{},1", index.iteration, index.bb_index));
        }
        if self.staging.is_empty() {
            self.stalled = false;
            self.stall_tracker.reset();
            return;
        }
        if !self.consumable.is_empty() {
            self.stalled = true;
            if self.stall_tracker.bump() {
                tracing::warn!(cycles = self.stall_tracker.cycles(), "issue port stalled");
            }
            logger.log("PStall", self.stall_tracker.cycles().to_string());
            return;
        }
        self.stalled = false;
        self.stall_tracker.reset();
        for item in self.staging.drain(..) {
            self.consumable.push_back(item);
        }
    }
}

/// A single-element-per-cycle handoff identical in shape to
/// [`DispatchPort`] but without port-pressure logging, used for the
/// one-push-per-cycle links the pipeline needs outside of issue proper
/// (spec.md §4.5: "`LinkBuffer(1)`. One push per cycle.").
pub struct IssuePort<T>(crate::buffers::LinkBuffer<T>);

impl<T> IssuePort<T> {
    pub fn new(element_tag: &'static str) -> Self {
        Self(crate::buffers::LinkBuffer::new(1, element_tag))
    }
}

impl<T> Sink<T> for IssuePort<T> {
    fn push(&mut self, item: T) -> bool {
        self.0.push(item)
    }

    fn push_many(&mut self, items: Vec<T>) -> bool {
        self.0.push_many(items)
    }
}

impl<T> Source<T> for IssuePort<T> {
    fn pop(&mut self) -> Option<T> {
        self.0.pop()
    }

    fn peek(&self) -> Option<&T> {
        self.0.peek()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> Buffer for IssuePort<T> {
    fn propagate(&mut self, logger: &mut dyn Logger) {
        self.0.propagate(logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NullLogger;
    use crate::uop::{InstructionIndex, UopId};

    fn uop_id(bb: usize, iter: usize) -> UopId {
        UopId { instr: InstructionIndex::new(bb, iter), uop_index: 0 }
    }

    #[test]
    fn dispatch_port_logs_port_pressure_for_every_staged_element() {
        let mut port: DispatchPort<UopId> = DispatchPort::new(1);
        port.push(uop_id(0, 0));
        struct Capture(Vec<(String, String)>);
        impl Logger for Capture {
            fn log(&mut self, tag: &'static str, msg: String) {
                self.0.push((tag.to_string(), msg));
            }
        }
        let mut capture = Capture(Vec::new());
        port.propagate(&mut capture);
        assert!(capture.0.iter().any(|(tag, msg)| tag == "PortPressure" && msg == "0,0,1"));
    }

    #[test]
    fn issue_port_admits_only_one_push_per_cycle() {
        let mut port: IssuePort<u32> = IssuePort::new("uop");
        assert!(port.push(1));
        assert!(!port.push(2));
        port.propagate(&mut NullLogger);
    }
}
