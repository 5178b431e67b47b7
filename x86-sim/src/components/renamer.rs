//! The register renamer (spec.md §4.6 "Register renamer") and the physical
//! register table it shares with the [`crate::components::Rob`]: the free
//! list, allocation counter and `in_flight_defs` map spec.md lists as the
//! renamer's own state are actually consulted by both components (the ROB
//! fills in an allocation's entry index once it creates the ROB entry, and
//! releases the name back to the free list on retirement), so here they
//! live in one struct the two components hold a [`crate::components::Shared`]
//! handle to. The [`RegisterNameTracker`] is shared the same way: the ROB
//! clears a retired def's units back to "committed" when it frees the name,
//! so a later read never aliases onto whichever unrelated instruction the
//! free list happened to recycle the name to (spec.md §4.6: "`name == 0`
//! means committed to the architectural register file").

use std::collections::HashMap;
use std::rc::Rc;

use crate::basic_block::BasicBlock;
use crate::buffers::{LinkBuffer, Sink, Source};
use crate::components::Shared;
use crate::context::GlobalContext;
use crate::register_tracker::{PhysRegName, RegisterNameTracker};
use crate::uop::{PhysRegVec, RenamedUopId, UopId};
use x86_model::SubRegisterWidth;

/// The free list, allocation counter, and `phys_reg -> rob entry index`
/// placeholder map a rename allocation needs, shared between the
/// [`Renamer`] (which mints and frees names) and the ROB (which resolves
/// the placeholder once it knows the entry index, and erases it at
/// retirement).
pub struct PhysRegTable {
    next_id: PhysRegName,
    cap: usize,
    free_list: Vec<PhysRegName>,
    /// `None` until the ROB creates the entry that defines this name.
    in_flight_defs: HashMap<PhysRegName, Option<usize>>,
}

impl PhysRegTable {
    pub fn new(num_architectural_regs: u32, num_physical_registers: usize) -> Self {
        Self {
            next_id: num_architectural_regs + 1,
            cap: num_physical_registers,
            free_list: Vec::new(),
            in_flight_defs: HashMap::new(),
        }
    }

    /// Number of names currently in flight (minted, not yet retired).
    pub fn outstanding(&self) -> usize {
        self.in_flight_defs.len()
    }

    /// Atomically reserves `n` physical-register names, reusing freed names
    /// before minting new ones. Returns `None` without mutating any state
    /// if reserving would exceed capacity (spec.md §4.6: "if the
    /// reservation fails, stall and retry next tick; state not mutated").
    pub fn reserve(&mut self, n: usize) -> Option<PhysRegVec> {
        if self.outstanding() + n > self.cap {
            return None;
        }
        let mut names = PhysRegVec::new();
        for _ in 0..n {
            let name = self.free_list.pop().unwrap_or_else(|| {
                let id = self.next_id;
                self.next_id += 1;
                id
            });
            self.in_flight_defs.insert(name, None);
            names.push(name);
        }
        Some(names)
    }

    /// Records that `name`'s defining micro-op now lives at ROB entry
    /// `entry_index`, resolving the placeholder the renamer left behind.
    pub fn resolve_entry(&mut self, name: PhysRegName, entry_index: usize) {
        if let Some(slot) = self.in_flight_defs.get_mut(&name) {
            *slot = Some(entry_index);
        }
    }

    /// The ROB entry index currently defining `name`, if its defining
    /// micro-op has been assigned one yet.
    pub fn defining_entry(&self, name: PhysRegName) -> Option<usize> {
        self.in_flight_defs.get(&name).copied().flatten()
    }

    /// Erases `names` from the in-flight map and returns them to the free
    /// list, making them available for a future allocation. Called by the
    /// ROB's `DeleteRetiredUops` step.
    pub fn retire_defs(&mut self, names: &[PhysRegName]) {
        for &name in names {
            self.in_flight_defs.remove(&name);
            self.free_list.push(name);
        }
    }
}

/// Renames up to `uops_per_cycle` incoming micro-ops per tick: collects
/// architectural uses from the [`RegisterNameTracker`] and, for the last
/// micro-op of an instruction, allocates fresh physical names for its defs.
pub struct Renamer {
    uops_per_cycle: usize,
    context: Rc<GlobalContext>,
    basic_block: Rc<BasicBlock>,
    source: Shared<crate::buffers::FifoBuffer<UopId>>,
    sink: Shared<LinkBuffer<RenamedUopId>>,
    phys_regs: Shared<PhysRegTable>,
    tracker: Shared<RegisterNameTracker>,
    pending: Option<RenamedUopId>,
}

impl Renamer {
    pub fn new(
        uops_per_cycle: usize,
        context: Rc<GlobalContext>,
        basic_block: Rc<BasicBlock>,
        source: Shared<crate::buffers::FifoBuffer<UopId>>,
        sink: Shared<LinkBuffer<RenamedUopId>>,
        phys_regs: Shared<PhysRegTable>,
        tracker: Shared<RegisterNameTracker>,
    ) -> Self {
        Self {
            uops_per_cycle,
            context,
            basic_block,
            source,
            sink,
            phys_regs,
            tracker,
            pending: None,
        }
    }

    /// Attempts to push `self.pending` to the sink; returns whether it is
    /// now clear (either there was nothing pending, or the push succeeded).
    fn drain_pending(&mut self) -> bool {
        match self.pending.take() {
            None => true,
            Some(renamed) => {
                if self.sink.borrow_mut().push(renamed.clone()) {
                    true
                } else {
                    self.pending = Some(renamed);
                    false
                }
            }
        }
    }

    pub fn tick(&mut self) {
        if !self.drain_pending() {
            return;
        }
        for _ in 0..self.uops_per_cycle {
            let uop = match self.source.borrow().peek().copied() {
                Some(uop) => uop,
                None => break,
            };
            let instr = &self.basic_block.instructions[uop.instr.bb_index];
            let decomposition_len = self.context.decompose(instr).expect("instruction references a known scheduling class").len();

            let uses: PhysRegVec = if uop.uop_index == 0 {
                let tracker = self.tracker.borrow();
                let mut names: PhysRegVec = instr.reads().flat_map(|r| tracker.get_name_deps(r.register, r.width)).collect();
                names.sort_unstable();
                names.dedup();
                names
            } else {
                PhysRegVec::new()
            };

            let is_last = uop.uop_index + 1 == decomposition_len;
            let defs: PhysRegVec = if is_last {
                let writes: Vec<(x86_model::Register, SubRegisterWidth)> = instr.writes().map(|r| (r.register, r.width)).collect();
                match self.phys_regs.borrow_mut().reserve(writes.len()) {
                    Some(names) => {
                        let mut tracker = self.tracker.borrow_mut();
                        for (&name, &(reg, width)) in names.iter().zip(writes.iter()) {
                            tracker.set_name(reg, width, name);
                        }
                        names
                    }
                    None => break, // reservation failed: leave uop at head of source, stop this tick.
                }
            } else {
                PhysRegVec::new()
            };

            let renamed = RenamedUopId { uop, uses, defs };
            self.source.borrow_mut().pop();
            if !self.sink.borrow_mut().push(renamed.clone()) {
                self.pending = Some(renamed);
                break;
            }
        }
    }

    /// Direct access to the tracker, for tests and debug dumps that want to
    /// assert on renaming state without going through the pipeline.
    pub fn tracker(&self) -> &Shared<RegisterNameTracker> {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_block::{Instruction, RegisterOperand};
    use crate::components::shared;
    use crate::log::NullLogger;
    use crate::target::haswell;
    use crate::uop::InstructionIndex;
    use x86_model::Register::{Rax, Rcx};

    fn setup(uops_per_cycle: usize, num_physical_registers: usize) -> (Renamer, Shared<crate::buffers::FifoBuffer<UopId>>, Shared<LinkBuffer<RenamedUopId>>, Shared<PhysRegTable>) {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let instr = Instruction::new("mov", "WriteALU", 3).with_registers(vec![RegisterOperand::write(Rax, SubRegisterWidth::Bits32)]);
        let bb = Rc::new(BasicBlock::new(vec![instr], false));
        let source = shared(crate::buffers::FifoBuffer::<UopId>::new(8, "uop"));
        let sink = shared(LinkBuffer::<RenamedUopId>::new(uops_per_cycle, "renamed"));
        let phys_regs = shared(PhysRegTable::new(16, num_physical_registers));
        let tracker = shared(RegisterNameTracker::new());
        let renamer = Renamer::new(uops_per_cycle, context, bb, source.clone(), sink.clone(), phys_regs.clone(), tracker);
        (renamer, source, sink, phys_regs)
    }

    #[test]
    fn last_uop_of_instruction_allocates_a_fresh_physical_name_for_its_def() {
        let (mut renamer, source, sink, _phys_regs) = setup(2, 8);
        source.borrow_mut().push(UopId { instr: InstructionIndex::new(0, 0), uop_index: 0 });
        source.borrow_mut().propagate(&mut NullLogger);
        renamer.tick();
        sink.borrow_mut().propagate(&mut NullLogger);
        let renamed = sink.borrow_mut().pop().unwrap();
        assert_eq!(renamed.defs.len(), 1);
        assert_eq!(renamed.defs[0], 17);
    }

    #[test]
    fn reservation_failure_leaves_uop_at_head_of_source() {
        let (mut renamer, source, _sink, phys_regs) = setup(2, 0);
        source.borrow_mut().push(UopId { instr: InstructionIndex::new(0, 0), uop_index: 0 });
        source.borrow_mut().propagate(&mut NullLogger);
        renamer.tick();
        assert_eq!(source.borrow().len(), 1);
        assert_eq!(phys_regs.borrow().outstanding(), 0);
    }

    #[test]
    fn phys_reg_table_reuses_retired_names() {
        let mut table = PhysRegTable::new(16, 1);
        let first = table.reserve(1).unwrap();
        assert_eq!(first[0], 17);
        assert!(table.reserve(1).is_none());
        table.retire_defs(&first);
        let second = table.reserve(1).unwrap();
        assert_eq!(second[0], 17);
    }
}
