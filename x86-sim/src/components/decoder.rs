//! The instruction decoder (spec.md §4.6 "InstructionDecoder"): expands up
//! to `num_decoders` instructions per tick into their cached micro-op
//! decomposition and pushes each instruction's micro-ops atomically.
//!
//! spec.md notes the real front-end's decoder widths are non-uniform (only
//! decoder 0 handles multi-µop instructions on some parts) and that this
//! crate keeps the simplification of a uniform `num_decoders`-wide decode
//! (§9 "Open questions").

use std::rc::Rc;

use crate::basic_block::BasicBlock;
use crate::buffers::{FifoBuffer, Sink, Source};
use crate::components::Shared;
use crate::context::GlobalContext;
use crate::uop::{InstructionIndex, UopId};

/// Consumes instruction indices, decomposes each through the
/// [`GlobalContext`]'s cache, and pushes the resulting micro-ops to its
/// sink one instruction's worth at a time.
pub struct InstructionDecoder {
    num_decoders: usize,
    context: Rc<GlobalContext>,
    basic_block: Rc<BasicBlock>,
    source: Shared<FifoBuffer<InstructionIndex>>,
    sink: Shared<FifoBuffer<UopId>>,
}

impl InstructionDecoder {
    pub fn new(
        num_decoders: usize,
        context: Rc<GlobalContext>,
        basic_block: Rc<BasicBlock>,
        source: Shared<FifoBuffer<InstructionIndex>>,
        sink: Shared<FifoBuffer<UopId>>,
    ) -> Self {
        Self { num_decoders, context, basic_block, source, sink }
    }

    pub fn tick(&mut self) {
        for _ in 0..self.num_decoders {
            let index = match self.source.borrow().peek().copied() {
                Some(index) => index,
                None => break,
            };
            let instr = &self.basic_block.instructions[index.bb_index];
            let decomposition = self.context.decompose(instr).expect("instruction references a known scheduling class");
            let uops: Vec<UopId> = (0..decomposition.len()).map(|uop_index| UopId { instr: index, uop_index }).collect();
            if !self.sink.borrow_mut().push_many(uops) {
                // The instruction stays at the head of the source; retried
                // next tick (spec.md §4.6: "the instruction remains at the
                // head of the source").
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
    use crate::target::haswell;

    #[test]
    fn pushes_every_uop_of_a_multi_uop_instruction_atomically() {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let bb = Rc::new(BasicBlock::new(vec![crate::basic_block::Instruction::new("fmul", "WriteFMul", 3)], false));
        let source = shared(FifoBuffer::<InstructionIndex>::new(4, "instr"));
        let sink = shared(FifoBuffer::<UopId>::new(8, "uop"));
        source.borrow_mut().push(InstructionIndex::new(0, 0));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut decoder = InstructionDecoder::new(1, context, bb, source.clone(), sink.clone());
        decoder.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 2);
        assert!(source.borrow().is_empty());
    }

    #[test]
    fn instruction_stays_at_head_of_source_when_sink_refuses() {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let bb = Rc::new(BasicBlock::new(vec![crate::basic_block::Instruction::new("fmul", "WriteFMul", 3)], false));
        let source = shared(FifoBuffer::<InstructionIndex>::new(4, "instr"));
        let sink = shared(FifoBuffer::<UopId>::new(1, "uop")); // too small for 2 uops
        source.borrow_mut().push(InstructionIndex::new(0, 0));
        source.borrow_mut().propagate(&mut NullLogger);

        let mut decoder = InstructionDecoder::new(1, context, bb, source.clone(), sink.clone());
        decoder.tick();
        assert_eq!(source.borrow().len(), 1);
    }
}
