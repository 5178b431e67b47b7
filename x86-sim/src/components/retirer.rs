//! The retirer (spec.md §4.6 "Retirer"): the pipeline's tail. Forwards
//! every retired micro-op unchanged to its primary sink, and, for the last
//! micro-op of an instruction, additionally reports the instruction itself
//! to the simulator's iteration-counter sink.
//!
//! spec.md's `DeleteRetiredUops` step drains a `RetiredSource` the ROB
//! consults to free entry slots, but the data-flow diagram (§2) doesn't
//! name who feeds it. This crate closes that loop here: once an element has
//! been durably forwarded to the primary sink, the Retirer reports its ROB
//! entry index back to the ROB so the slot and its physical-register defs
//! can be released.

use std::rc::Rc;

use crate::basic_block::BasicBlock;
use crate::buffers::{DevNullBuffer, FifoBuffer, LinkBuffer, Sink, Source};
use crate::components::Shared;
use crate::context::GlobalContext;
use crate::uop::{InstructionIndex, RobUopId};

/// Pulls retired micro-ops from the ROB's retirement link, forwards them
/// unchanged, and reports completed instructions and freed ROB slots.
pub struct Retirer {
    context: Rc<GlobalContext>,
    basic_block: Rc<BasicBlock>,
    source: Shared<LinkBuffer<RobUopId>>,
    primary_sink: Shared<DevNullBuffer<RobUopId>>,
    retired_instructions: Shared<FifoBuffer<InstructionIndex>>,
    rob_retired: Shared<FifoBuffer<usize>>,
}

impl Retirer {
    pub fn new(
        context: Rc<GlobalContext>,
        basic_block: Rc<BasicBlock>,
        source: Shared<LinkBuffer<RobUopId>>,
        primary_sink: Shared<DevNullBuffer<RobUopId>>,
        retired_instructions: Shared<FifoBuffer<InstructionIndex>>,
        rob_retired: Shared<FifoBuffer<usize>>,
    ) -> Self {
        Self { context, basic_block, source, primary_sink, retired_instructions, rob_retired }
    }

    pub fn tick(&mut self) {
        while let Some(rob_uop) = self.source.borrow().peek().copied() {
            if !self.primary_sink.borrow_mut().push(rob_uop) {
                break;
            }
            self.source.borrow_mut().pop();

            let instr = &self.basic_block.instructions[rob_uop.uop.instr.bb_index];
            let decomposition_len = self.context.decompose(instr).expect("instruction references a known scheduling class").len();
            if rob_uop.uop.uop_index + 1 == decomposition_len {
                let accepted = self.retired_instructions.borrow_mut().push(rob_uop.uop.instr);
                debug_assert!(accepted, "the iteration-counter sink must always accept");
            }

            self.rob_retired.borrow_mut().push(rob_uop.entry_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_block::Instruction;
    use crate::buffers::Buffer;
    use crate::components::shared;
    use crate::context::GlobalContext;
    use crate::log::NullLogger;
    use crate::target::haswell;
    use crate::uop::UopId;

    fn context_and_bb() -> (Rc<GlobalContext>, Rc<BasicBlock>) {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let bb = Rc::new(BasicBlock::new(vec![Instruction::new("fmul", "WriteFMul", 3)], false));
        (context, bb)
    }

    #[test]
    fn only_the_last_uop_of_an_instruction_reports_to_the_iteration_counter_sink() {
        let (context, bb) = context_and_bb();
        let source = shared(LinkBuffer::<RobUopId>::new(4, "retire"));
        let primary = shared(DevNullBuffer::<RobUopId>::new("retired"));
        let retired_instructions = shared(FifoBuffer::<InstructionIndex>::new(4, "instr"));
        let rob_retired = shared(FifoBuffer::<usize>::new(4, "rob-retired"));

        source.borrow_mut().push(RobUopId { entry_index: 0, uop: UopId { instr: InstructionIndex::new(0, 0), uop_index: 0 }, latency: 3 });
        source.borrow_mut().propagate(&mut NullLogger);

        let mut retirer = Retirer::new(context.clone(), bb.clone(), source.clone(), primary.clone(), retired_instructions.clone(), rob_retired.clone());
        retirer.tick();
        retired_instructions.borrow_mut().propagate(&mut NullLogger);
        rob_retired.borrow_mut().propagate(&mut NullLogger);
        assert!(retired_instructions.borrow().is_empty());
        assert_eq!(rob_retired.borrow_mut().pop(), Some(0));

        source.borrow_mut().push(RobUopId { entry_index: 1, uop: UopId { instr: InstructionIndex::new(0, 0), uop_index: 1 }, latency: 2 });
        source.borrow_mut().propagate(&mut NullLogger);
        retirer.tick();
        retired_instructions.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(retired_instructions.borrow_mut().pop(), Some(InstructionIndex::new(0, 0)));
    }

    #[test]
    fn every_forwarded_uop_reports_its_entry_index_for_slot_release() {
        let (context, bb) = context_and_bb();
        let source = shared(LinkBuffer::<RobUopId>::new(4, "retire"));
        let primary = shared(DevNullBuffer::<RobUopId>::new("retired"));
        let retired_instructions = shared(FifoBuffer::<InstructionIndex>::new(4, "instr"));
        let rob_retired = shared(FifoBuffer::<usize>::new(4, "rob-retired"));

        source.borrow_mut().push(RobUopId { entry_index: 0, uop: UopId { instr: InstructionIndex::new(0, 0), uop_index: 0 }, latency: 3 });
        source.borrow_mut().propagate(&mut NullLogger);

        let mut retirer = Retirer::new(context, bb, source.clone(), primary, retired_instructions, rob_retired.clone());
        retirer.tick();
        rob_retired.borrow_mut().propagate(&mut NullLogger);
        assert_eq!(rob_retired.borrow_mut().pop(), Some(0));
    }
}
