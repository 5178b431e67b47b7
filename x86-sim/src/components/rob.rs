//! The reorder buffer (spec.md §4.6 "Reorder buffer"): a fixed-capacity
//! ring of entries, the six-step per-tick ordering that is the simulator's
//! single most load-bearing contract, and the data-dependency graph that
//! ordering maintains.
//!
//! Three channels feed the ROB back information about its own in-flight
//! entries (spec.md §9 "Cycles and predicted data dependencies"):
//! `AvailableDeps` (this ROB's own [`crate::buffers::ExecDepsBuffer`],
//! pushed to at issue time and drained here — a µop's outputs become
//! visible to dependents one prediction-latency after it issues, ahead of
//! actual writeback), `Writeback` (the execution units' completion signal,
//! which makes an entry retirement-eligible), and `Retired` (the
//! [`crate::components::Retirer`]'s confirmation that an entry has left the
//! pipeline for good, freeing its slot).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::basic_block::BasicBlock;
use crate::buffers::{Buffer, DevNullBuffer, ExecDepsBuffer, FifoBuffer, LinkBuffer, Sink, Source};
use crate::components::issue_policy::IssuePolicy;
use crate::components::renamer::PhysRegTable;
use crate::components::Shared;
use crate::context::GlobalContext;
use crate::register_tracker::{PhysRegName, RegisterNameTracker};
use crate::uop::{InstructionIndex, RenamedUopId, RobUopId, UopId};

/// An entry's position in its lifecycle, in the exact order spec.md §3
/// lists them — `derive(PartialOrd, Ord)` on a fieldless enum ranks variants
/// by declaration order, which is exactly the "has this entry reached at
/// least X" comparison the dependency logic needs (e.g. "state already ≥
/// `OutputsAvailableNextCycle`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RobState {
    Empty,
    WaitingForInputs,
    ReadyToExecute,
    Issued,
    OutputsAvailableNextCycle,
    ReadyToRetire,
    SentForRetirement,
    Retired,
}

struct Entry {
    state: RobState,
    uop: UopId,
    latency: u32,
    defs: SmallVec<[PhysRegName; 4]>,
    possible_ports: SmallVec<[usize; 4]>,
    unsatisfied_deps: HashSet<usize>,
    dependent_entries: SmallVec<[usize; 4]>,
}

/// The reorder buffer: a fixed-capacity slab of entries plus the
/// program-order queue of which slots are currently occupied.
pub struct Rob {
    cap: usize,
    slots: Vec<Option<Entry>>,
    order: std::collections::VecDeque<usize>,
    next_free_slot: usize,
    last_uop_entry: HashMap<InstructionIndex, usize>,

    context: Rc<GlobalContext>,
    basic_block: Rc<BasicBlock>,
    phys_regs: Shared<PhysRegTable>,
    tracker: Shared<RegisterNameTracker>,
    issue_policy: Box<dyn IssuePolicy>,

    source: Shared<LinkBuffer<RenamedUopId>>,
    available_deps: Shared<ExecDepsBuffer<RobUopId>>,
    writeback_source: Shared<LinkBuffer<RobUopId>>,
    retired_source: Shared<FifoBuffer<usize>>,
    retire_sink: Shared<LinkBuffer<RobUopId>>,
    issued_sink: Shared<DevNullBuffer<RobUopId>>,
    port_sinks: Vec<Option<Shared<crate::buffers::DispatchPort<RobUopId>>>>,
}

#[allow(clippy::too_many_arguments)]
impl Rob {
    pub fn new(
        cap: usize,
        context: Rc<GlobalContext>,
        basic_block: Rc<BasicBlock>,
        phys_regs: Shared<PhysRegTable>,
        tracker: Shared<RegisterNameTracker>,
        issue_policy: Box<dyn IssuePolicy>,
        source: Shared<LinkBuffer<RenamedUopId>>,
        available_deps: Shared<ExecDepsBuffer<RobUopId>>,
        writeback_source: Shared<LinkBuffer<RobUopId>>,
        retired_source: Shared<FifoBuffer<usize>>,
        retire_sink: Shared<LinkBuffer<RobUopId>>,
        issued_sink: Shared<DevNullBuffer<RobUopId>>,
        port_sinks: Vec<Option<Shared<crate::buffers::DispatchPort<RobUopId>>>>,
    ) -> Self {
        Self {
            cap,
            slots: (0..cap).map(|_| None).collect(),
            order: std::collections::VecDeque::new(),
            next_free_slot: 0,
            last_uop_entry: HashMap::new(),
            context,
            basic_block,
            phys_regs,
            tracker,
            issue_policy,
            source,
            available_deps,
            writeback_source,
            retired_source,
            retire_sink,
            issued_sink,
            port_sinks,
        }
    }

    /// Number of entries currently occupied, for tests and for the
    /// "would overfill the ROB" scenario in spec.md §8.
    pub fn occupancy(&self) -> usize {
        self.order.len()
    }

    fn is_full(&self) -> bool {
        self.order.len() >= self.cap
    }

    /// Finds the next empty slab slot starting from `next_free_slot`,
    /// circularly, as spec.md's "reserve a slot (oldest-first release
    /// order, circular)" asks for.
    fn find_free_slot(&mut self) -> Option<usize> {
        for _ in 0..self.cap {
            let candidate = self.next_free_slot;
            self.next_free_slot = (self.next_free_slot + 1) % self.cap;
            if self.slots[candidate].is_none() {
                return Some(candidate);
            }
        }
        None
    }

    /// Resolves `dependent_entries` of `entry_index` against its
    /// `unsatisfied_deps`, promoting any whose set becomes empty — shared
    /// by `UpdateDataDependencies` and the resourceless-uop fast path in
    /// `SendUopsForExecution`.
    fn satisfy_dependents_of(&mut self, entry_index: usize) {
        let dependents = match &self.slots[entry_index] {
            Some(entry) => entry.dependent_entries.clone(),
            None => return,
        };
        for dependent in dependents {
            if let Some(entry) = &mut self.slots[dependent] {
                entry.unsatisfied_deps.remove(&entry_index);
                if entry.unsatisfied_deps.is_empty() && entry.state == RobState::WaitingForInputs {
                    entry.state = RobState::ReadyToExecute;
                }
            }
        }
    }

    fn delete_retired_uops(&mut self) {
        while let Some(entry_index) = self.retired_source.borrow_mut().pop() {
            if let Some(entry) = self.slots[entry_index].take() {
                self.phys_regs.borrow_mut().retire_defs(&entry.defs);
                // Clear the tracker's units back to "committed" before the
                // freed names can be handed back out by a future
                // allocation; otherwise a read issued before the unit is
                // next written would alias onto whichever unrelated
                // instruction recycled the name.
                let mut tracker = self.tracker.borrow_mut();
                for &name in &entry.defs {
                    tracker.commit(name);
                }
            }
            if self.order.front() == Some(&entry_index) {
                self.order.pop_front();
            } else {
                // Out-of-order confirmation shouldn't happen given
                // retirement is strictly in program order, but keep the
                // queue consistent defensively rather than panic.
                self.order.retain(|&idx| idx != entry_index);
            }
        }
    }

    fn read_new_uops(&mut self) {
        loop {
            if self.is_full() {
                break;
            }
            let renamed = match self.source.borrow().peek().cloned() {
                Some(renamed) => renamed,
                None => break,
            };
            let entry_index = match self.find_free_slot() {
                Some(idx) => idx,
                None => break,
            };
            self.source.borrow_mut().pop();

            let instr = &self.basic_block.instructions[renamed.uop.instr.bb_index];
            let decomposition = self.context.decompose(instr).expect("instruction references a known scheduling class");
            let uop_desc = decomposition.uops[renamed.uop.uop_index];
            let possible_ports = self.possible_ports_for(uop_desc.proc_res_idx);

            let mut unsatisfied_deps = HashSet::new();
            for &name in &renamed.uses {
                if let Some(definer) = self.phys_regs.borrow().defining_entry(name) {
                    let definer_state = self.slots[definer].as_ref().map(|e| e.state);
                    if definer_state.map(|state| state < RobState::OutputsAvailableNextCycle).unwrap_or(false) {
                        unsatisfied_deps.insert(definer);
                        if let Some(definer_entry) = &mut self.slots[definer] {
                            definer_entry.dependent_entries.push(entry_index);
                        }
                    }
                }
            }
            if renamed.uop.uop_index > 0 {
                let preceding = UopId { instr: renamed.uop.instr, uop_index: renamed.uop.uop_index - 1 };
                if let Some(&preceding_entry) = self.last_uop_entry.get(&preceding.instr) {
                    if self.slots[preceding_entry].as_ref().map(|e| e.uop) == Some(preceding) {
                        let preceding_state = self.slots[preceding_entry].as_ref().map(|e| e.state);
                        if preceding_state.map(|state| state < RobState::OutputsAvailableNextCycle).unwrap_or(false) {
                            unsatisfied_deps.insert(preceding_entry);
                            if let Some(preceding_entry_mut) = &mut self.slots[preceding_entry] {
                                preceding_entry_mut.dependent_entries.push(entry_index);
                            }
                        }
                    }
                }
            }

            let state = if unsatisfied_deps.is_empty() { RobState::ReadyToExecute } else { RobState::WaitingForInputs };

            for &name in &renamed.defs {
                self.phys_regs.borrow_mut().resolve_entry(name, entry_index);
            }

            self.slots[entry_index] = Some(Entry {
                state,
                uop: renamed.uop,
                latency: uop_desc.latency(),
                defs: renamed.defs,
                possible_ports,
                unsatisfied_deps,
                dependent_entries: SmallVec::new(),
            });
            self.last_uop_entry.insert(renamed.uop.instr, entry_index);
            self.order.push_back(entry_index);
        }
    }

    fn possible_ports_for(&self, proc_res_idx: u32) -> SmallVec<[usize; 4]> {
        if proc_res_idx == 0 {
            return SmallVec::new();
        }
        let idx = proc_res_idx as usize;
        let resource = &self.context.target().resources()[idx];
        if resource.is_group() {
            resource.sub_units.iter().copied().collect()
        } else {
            SmallVec::from_slice(&[idx])
        }
    }

    fn update_data_dependencies(&mut self) {
        let mut ready = Vec::new();
        {
            let mut deps = self.available_deps.borrow_mut();
            while let Some(id) = deps.pop() {
                ready.push(id.entry_index);
            }
        }
        for entry_index in ready {
            if let Some(entry) = &mut self.slots[entry_index] {
                if entry.state == RobState::Issued {
                    entry.state = RobState::OutputsAvailableNextCycle;
                }
            }
            self.satisfy_dependents_of(entry_index);
        }
    }

    fn update_written_back_uops(&mut self) {
        while let Some(id) = self.writeback_source.borrow_mut().pop() {
            if let Some(entry) = &mut self.slots[id.entry_index] {
                if entry.state == RobState::OutputsAvailableNextCycle {
                    entry.state = RobState::ReadyToRetire;
                }
            }
        }
    }

    fn send_uops_for_execution(&mut self) {
        let order: Vec<usize> = self.order.iter().copied().collect();
        for entry_index in order {
            let ready = self.slots[entry_index].as_ref().map(|e| e.state) == Some(RobState::ReadyToExecute);
            if !ready {
                continue;
            }
            let (possible_ports, uop, latency) = {
                let entry = self.slots[entry_index].as_ref().unwrap();
                (entry.possible_ports.clone(), entry.uop, entry.latency)
            };
            if possible_ports.is_empty() {
                if let Some(entry) = &mut self.slots[entry_index] {
                    entry.state = RobState::ReadyToRetire;
                }
                self.satisfy_dependents_of(entry_index);
                continue;
            }
            let ordered = self.issue_policy.compute_best_order(&possible_ports);
            let rob_uop = RobUopId { entry_index, uop, latency };
            let mut issued_on = None;
            for port in ordered {
                let accepted = match &self.port_sinks[port] {
                    Some(sink) => sink.borrow_mut().push(rob_uop),
                    None => false,
                };
                if accepted {
                    issued_on = Some(port);
                    break;
                }
            }
            if let Some(port) = issued_on {
                self.issued_sink.borrow_mut().push(rob_uop);
                self.issue_policy.signal_issued(port);
                if let Some(entry) = &mut self.slots[entry_index] {
                    entry.state = RobState::Issued;
                }
                self.available_deps.borrow_mut().push(rob_uop, latency);
            }
        }
    }

    fn send_uops_for_retirement(&mut self) {
        for &entry_index in &self.order {
            let (uop, latency, ready) = match &self.slots[entry_index] {
                Some(entry) => (entry.uop, entry.latency, entry.state == RobState::ReadyToRetire),
                None => (UopId { instr: InstructionIndex::new(0, 0), uop_index: 0 }, 0, false),
            };
            if !ready {
                break;
            }
            let rob_uop = RobUopId { entry_index, uop, latency };
            if self.retire_sink.borrow_mut().push(rob_uop) {
                if let Some(entry) = &mut self.slots[entry_index] {
                    entry.state = RobState::SentForRetirement;
                }
            } else {
                break;
            }
        }
    }

    /// Runs the six-step per-tick sequence of spec.md §4.6 in order.
    pub fn tick(&mut self) {
        self.delete_retired_uops();
        self.read_new_uops();
        self.update_data_dependencies();
        self.update_written_back_uops();
        self.send_uops_for_execution();
        self.send_uops_for_retirement();
    }

    /// One line per occupied entry, oldest first: its slot index, state and
    /// which other entries it is still waiting on — the `DebugPrint`-style
    /// dump `llvm_sim`'s reorder buffer offers, useful for tests that assert
    /// on in-flight ROB shape and for `x86-sim-cli`'s `--log` output.
    #[cfg(any(test, feature = "debug-dump"))]
    pub fn debug_dump(&self) -> String {
        use std::fmt::Write as _;
        let mut out = String::new();
        for &entry_index in &self.order {
            let Some(entry) = &self.slots[entry_index] else { continue };
            writeln!(
                out,
                "[{entry_index}] {:?} uop={:?} waiting_on={:?} dependents={:?}",
                entry.state, entry.uop, entry.unsatisfied_deps, entry.dependent_entries
            )
            .unwrap();
        }
        out
    }
}
