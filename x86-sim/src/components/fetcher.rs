//! The fetcher (spec.md §4.6 "Fetcher"): walks the basic block in program
//! order, charging each instruction's encoded size against a per-cycle
//! byte budget, and wraps to the next loop iteration only on the tick after
//! the block's last instruction was fetched.

use std::rc::Rc;

use crate::basic_block::BasicBlock;
use crate::buffers::{FifoBuffer, Sink};
use crate::components::Shared;
use crate::context::GlobalContext;
use crate::uop::InstructionIndex;

/// Emits [`InstructionIndex`]es in program order, respecting a
/// `max_bytes_per_cycle` fetch-window budget.
pub struct Fetcher {
    max_bytes_per_cycle: u32,
    context: Rc<GlobalContext>,
    basic_block: Rc<BasicBlock>,
    sink: Shared<FifoBuffer<InstructionIndex>>,
    cursor: InstructionIndex,
    done: bool,
}

impl Fetcher {
    pub fn new(max_bytes_per_cycle: u32, context: Rc<GlobalContext>, basic_block: Rc<BasicBlock>, sink: Shared<FifoBuffer<InstructionIndex>>) -> Self {
        Self { max_bytes_per_cycle, context, basic_block, sink, cursor: InstructionIndex::new(0, 0), done: false }
    }

    pub fn tick(&mut self) {
        if self.done {
            return;
        }
        let mut budget_used = 0u32;
        loop {
            if self.cursor.bb_index >= self.basic_block.len() {
                if self.basic_block.is_loop {
                    // The wrap itself never shares a cycle with fetching
                    // the tail instruction: this tick simply stops here,
                    // and the cursor (already pointing at the next
                    // iteration's instruction 0) is what the next tick
                    // fetches from.
                    self.cursor = InstructionIndex::new(0, self.cursor.iteration + 1);
                } else {
                    self.done = true;
                }
                break;
            }
            let instr = &self.basic_block.instructions[self.cursor.bb_index];
            let size = self.context.target().encoded_size(instr);
            if budget_used > 0 && budget_used + size > self.max_bytes_per_cycle {
                break;
            }
            if !self.sink.borrow_mut().push(self.cursor) {
                break;
            }
            budget_used += size;
            self.cursor = InstructionIndex::new(self.cursor.bb_index + 1, self.cursor.iteration);
            if budget_used >= self.max_bytes_per_cycle {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_block::Instruction;
    use crate::buffers::{Buffer, Source};
    use crate::components::shared;
    use crate::log::NullLogger;
    use crate::target::haswell;

    fn context() -> Rc<GlobalContext> {
        Rc::new(GlobalContext::new(Box::new(haswell())))
    }

    #[test]
    fn fetches_one_instruction_even_when_it_alone_exceeds_the_budget() {
        let bb = Rc::new(BasicBlock::new(vec![Instruction::new("mov", "WriteALU", 16)], false));
        let sink = shared(FifoBuffer::<InstructionIndex>::new(8, "instr"));
        let mut fetcher = Fetcher::new(4, context(), bb, sink.clone());
        fetcher.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 1);
    }

    #[test]
    fn stops_fetching_at_the_end_of_a_non_looping_block() {
        let bb = Rc::new(BasicBlock::new(vec![Instruction::new("mov", "WriteALU", 3)], false));
        let sink = shared(FifoBuffer::<InstructionIndex>::new(8, "instr"));
        let mut fetcher = Fetcher::new(16, context(), bb, sink.clone());
        fetcher.tick();
        fetcher.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow().len(), 1);
    }

    #[test]
    fn wraps_to_next_iteration_on_the_tick_after_the_tail_instruction() {
        let bb = Rc::new(BasicBlock::new(vec![Instruction::new("mov", "WriteALU", 3)], true));
        let sink = shared(FifoBuffer::<InstructionIndex>::new(8, "instr"));
        let mut fetcher = Fetcher::new(16, context(), bb, sink.clone());
        fetcher.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow_mut().pop(), Some(InstructionIndex::new(0, 0)));
        fetcher.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(sink.borrow_mut().pop(), Some(InstructionIndex::new(0, 1)));
    }
}
