//! Execution units (spec.md §4.6 "Execution units"): three variants, all
//! downstream of a single issue port's [`DispatchPort`]. Only
//! [`SimplifiedExecutionUnit`] is wired into the default Haswell simulator
//! — spec.md §4.6: "The simulator is composed of many
//! SimplifiedExecutionUnits, one per port" — but the non-pipelined and
//! pipelined variants model real structural hazards a stricter
//! configuration would want and are kept as building blocks C8 names
//! explicitly.

use crate::buffers::{DispatchPort, LinkBuffer, Sink, Source};
use crate::components::Shared;
use crate::uop::Timed;

/// One element in flight, advancing through `L` stages. Accepts a new
/// element only once empty, and only if its declared latency equals `L`.
pub struct NonPipelinedExecutionUnit<T> {
    latency: u32,
    source: Shared<DispatchPort<T>>,
    sink: Shared<LinkBuffer<T>>,
    /// The one element in flight, with cycles remaining before it's due at
    /// the sink (`0` meaning "due now", i.e. stalled on a prior push
    /// refusal and retried every tick thereafter).
    current: Option<(T, u32)>,
}

impl<T: Timed + Copy> NonPipelinedExecutionUnit<T> {
    pub fn new(latency: u32, source: Shared<DispatchPort<T>>, sink: Shared<LinkBuffer<T>>) -> Self {
        Self { latency, source, sink, current: None }
    }

    pub fn tick(&mut self) {
        if self.current.is_none() {
            if let Some(elem) = self.source.borrow().peek().copied() {
                if elem.latency() == self.latency {
                    self.source.borrow_mut().pop();
                    self.current = Some((elem, self.latency));
                }
            }
        }
        if let Some((elem, remaining)) = self.current {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                if self.sink.borrow_mut().push(elem) {
                    self.current = None;
                } else {
                    self.current = Some((elem, 0));
                }
            } else {
                self.current = Some((elem, remaining));
            }
        }
    }
}

/// A ring of `depth` slots advancing one position every `cycles_per_stage`
/// ticks; the element leaving the last slot is pushed to the sink, and a
/// refusal stalls the entire ring rather than just the head.
pub struct PipelinedExecutionUnit<T> {
    latency: u32,
    cycles_per_stage: u32,
    cycles_until_advance: u32,
    ring: Vec<Option<T>>,
    source: Shared<DispatchPort<T>>,
    sink: Shared<LinkBuffer<T>>,
}

impl<T: Timed + Copy> PipelinedExecutionUnit<T> {
    pub fn new(latency: u32, depth: usize, cycles_per_stage: u32, source: Shared<DispatchPort<T>>, sink: Shared<LinkBuffer<T>>) -> Self {
        Self {
            latency,
            cycles_per_stage,
            cycles_until_advance: cycles_per_stage,
            ring: vec![None; depth.max(1)],
            source,
            sink,
        }
    }

    pub fn tick(&mut self) {
        self.cycles_until_advance = self.cycles_until_advance.saturating_sub(1);
        if self.cycles_until_advance > 0 {
            return;
        }
        let last = self.ring.len() - 1;
        if let Some(elem) = self.ring[last] {
            if !self.sink.borrow_mut().push(elem) {
                // Refusal stalls the whole ring; retry immediately next tick.
                self.cycles_until_advance = 0;
                return;
            }
            self.ring[last] = None;
        }
        for i in (1..self.ring.len()).rev() {
            self.ring[i] = self.ring[i - 1];
        }
        self.ring[0] = match self.source.borrow().peek().copied() {
            Some(elem) if elem.latency() == self.latency => {
                self.source.borrow_mut().pop();
                Some(elem)
            }
            _ => None,
        };
        self.cycles_until_advance = self.cycles_per_stage;
    }
}

/// Pulls any element from its source (no latency matching at admission),
/// tracks its remaining declared latency, and pushes it once that latency
/// has counted down to zero — retrying the push every tick thereafter if
/// the sink refuses (spec.md §4.6: "pushes whose sink refuses remain
/// pending at latency 0").
pub struct SimplifiedExecutionUnit<T> {
    source: Shared<DispatchPort<T>>,
    sink: Shared<LinkBuffer<T>>,
    pending: Vec<(T, u32)>,
}

impl<T: Timed + Copy> SimplifiedExecutionUnit<T> {
    pub fn new(source: Shared<DispatchPort<T>>, sink: Shared<LinkBuffer<T>>) -> Self {
        Self { source, sink, pending: Vec::new() }
    }

    pub fn tick(&mut self) {
        while let Some(elem) = self.source.borrow_mut().pop() {
            let latency = elem.latency();
            self.pending.push((elem, latency));
        }

        let mut still_pending = Vec::with_capacity(self.pending.len());
        let mut ready = Vec::new();
        for (elem, remaining) in self.pending.drain(..) {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                ready.push(elem);
            } else {
                still_pending.push((elem, remaining));
            }
        }
        self.pending = still_pending;
        for elem in ready {
            if !self.sink.borrow_mut().push(elem) {
                self.pending.push((elem, 0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::Buffer;
    use crate::components::shared;
    use crate::log::NullLogger;
    use crate::uop::{InstructionIndex, RobUopId, UopId};

    fn rob_uop(latency: u32) -> RobUopId {
        RobUopId { entry_index: 0, uop: UopId { instr: InstructionIndex::new(0, 0), uop_index: 0 }, latency }
    }

    #[test]
    fn non_pipelined_unit_takes_l_cycles_before_writeback() {
        let source = shared(DispatchPort::<RobUopId>::new(2));
        let sink = shared(LinkBuffer::<RobUopId>::new(1, "wb"));
        source.borrow_mut().push(rob_uop(3));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut unit = NonPipelinedExecutionUnit::new(3, source.clone(), sink.clone());
        unit.tick();
        unit.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert!(sink.borrow().is_empty());
        unit.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 1);
    }

    #[test]
    fn non_pipelined_unit_ignores_a_second_element_until_the_first_leaves() {
        let source = shared(DispatchPort::<RobUopId>::new(2));
        let sink = shared(LinkBuffer::<RobUopId>::new(1, "wb"));
        source.borrow_mut().push(rob_uop(2));
        source.borrow_mut().push(rob_uop(2));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut unit = NonPipelinedExecutionUnit::new(2, source.clone(), sink.clone());
        unit.tick();
        assert_eq!(source.borrow().len(), 1);
    }

    #[test]
    fn unit_ignores_elements_whose_latency_does_not_match() {
        let source = shared(DispatchPort::<RobUopId>::new(2));
        let sink = shared(LinkBuffer::<RobUopId>::new(1, "wb"));
        source.borrow_mut().push(rob_uop(5));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut unit = NonPipelinedExecutionUnit::new(3, source.clone(), sink.clone());
        unit.tick();
        assert_eq!(source.borrow().len(), 1);
    }

    #[test]
    fn pipelined_unit_admits_one_new_element_per_stage_advance() {
        let source = shared(DispatchPort::<RobUopId>::new(4));
        let sink = shared(LinkBuffer::<RobUopId>::new(4, "wb"));
        for _ in 0..3 {
            source.borrow_mut().push(rob_uop(2));
        }
        source.borrow_mut().propagate(&mut NullLogger);

        let mut unit = PipelinedExecutionUnit::new(2, 2, 1, source.clone(), sink.clone());
        unit.tick(); // admits the first element into slot 0
        unit.tick(); // advances it to slot 1, admits a second
        unit.tick(); // first element leaves the ring into the sink
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 1);
    }

    #[test]
    fn simplified_unit_becomes_ready_exactly_latency_ticks_after_being_pulled() {
        let source = shared(DispatchPort::<RobUopId>::new(2));
        let sink = shared(LinkBuffer::<RobUopId>::new(1, "wb"));
        source.borrow_mut().push(rob_uop(3));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut unit = SimplifiedExecutionUnit::new(source.clone(), sink.clone());
        unit.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert!(sink.borrow().is_empty());
        unit.tick();
        unit.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 1);
    }

    #[test]
    fn simplified_unit_accepts_mixed_latencies_concurrently() {
        let source = shared(DispatchPort::<RobUopId>::new(2));
        let sink = shared(LinkBuffer::<RobUopId>::new(2, "wb"));
        source.borrow_mut().push(rob_uop(1));
        source.borrow_mut().push(rob_uop(2));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut unit = SimplifiedExecutionUnit::new(source.clone(), sink.clone());
        unit.tick(); // both pulled; the latency-1 element is ready this tick
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow_mut().pop(), Some(rob_uop(1)));
        unit.tick(); // the latency-2 element is ready now
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow_mut().pop(), Some(rob_uop(2)));
    }
}
