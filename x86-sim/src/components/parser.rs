//! The instruction parser (spec.md §4.6 "InstructionParser"): a thin,
//! width-limited forwarder between the fetch buffer and the pre-decode
//! buffer. Modelled as its own pipeline stage because the real front-end
//! parses instruction bytes into a pre-decode form at a narrower rate than
//! the fetch window provides — this crate doesn't decode bytes (spec.md
//! §1), so the stage keeps only the rate limit.

use crate::buffers::{FifoBuffer, Sink, Source};
use crate::components::Shared;
use crate::uop::InstructionIndex;

/// Forwards at most `max_per_cycle` instruction indices per tick.
pub struct InstructionParser {
    max_per_cycle: usize,
    source: Shared<FifoBuffer<InstructionIndex>>,
    sink: Shared<FifoBuffer<InstructionIndex>>,
}

impl InstructionParser {
    pub fn new(max_per_cycle: usize, source: Shared<FifoBuffer<InstructionIndex>>, sink: Shared<FifoBuffer<InstructionIndex>>) -> Self {
        Self { max_per_cycle, source, sink }
    }

    pub fn tick(&mut self) {
        for _ in 0..self.max_per_cycle {
            let index = match self.source.borrow().peek().copied() {
                Some(index) => index,
                None => break,
            };
            if !self.sink.borrow_mut().push(index) {
                break;
            }
            self.source.borrow_mut().pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::Buffer;
    use crate::components::shared;
    use crate::log::NullLogger;

    #[test]
    fn forwards_at_most_max_per_cycle_indices() {
        let source = shared(FifoBuffer::<InstructionIndex>::new(8, "instr"));
        let sink = shared(FifoBuffer::<InstructionIndex>::new(8, "instr"));
        for i in 0..3 {
            source.borrow_mut().push(InstructionIndex::new(i, 0));
        }
        source.borrow_mut().propagate(&mut NullLogger);

        let mut parser = InstructionParser::new(2, source.clone(), sink.clone());
        parser.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 2);
        assert_eq!(source.borrow().len(), 1);
    }
}
