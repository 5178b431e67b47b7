//! C6 — the global context: the opaque target model plus the
//! decomposition cache every pipeline component shares read-only access to.
//!
//! One [`GlobalContext`] is created per run and handed to every component
//! by shared reference; its cache is the only interior-mutable state in the
//! whole simulator (§3 "Ownership and lifecycles", §5 "Shared resources").
//! In this single-threaded driver a `RefCell` is enough to express "single
//! writer on miss, many readers thereafter" — a threaded port of this
//! crate would promote it to a `Mutex`/`RwLock`, as spec.md §5 notes.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::basic_block::Instruction;
use crate::error::{SimError, SimResult};
use crate::target::Target;
use crate::uop::{Decomposition, Uop};

/// The structural identity a decomposition is cached under: spec.md keys
/// the cache by "opcode + flags + ordered operand descriptors restricted to
/// register/immediate/fp-immediate kinds" rather than full operand values,
/// since the decomposition algorithm (§4.4) only ever consults the
/// instruction's `SchedClass` and its register operands' widths — not their
/// concrete register numbers or immediate values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InstructionKey {
    sched_class: String,
    register_widths: Vec<(x86_model::RegisterClass, x86_model::Usage)>,
}

impl InstructionKey {
    fn of(instr: &Instruction) -> Self {
        Self {
            sched_class: instr.sched_class.clone(),
            register_widths: instr
                .explicit_registers
                .iter()
                .chain(instr.implicit_registers.iter())
                .map(|r| (register_class_of(r.register), r.usage))
                .collect(),
        }
    }
}

fn register_class_of(_reg: x86_model::Register) -> x86_model::RegisterClass {
    // Every register this crate models is a GPR; a richer instruction model
    // (vector/mask registers) would look this up from the register's own
    // class instead of hardcoding it.
    x86_model::RegisterClass::GeneralPurposeRegister64Bit
}

/// Owns the target's scheduling model and the instruction-key-keyed
/// decomposition cache (§4.4 "Caching"): entries are immutable once
/// inserted and live until the context itself is dropped.
pub struct GlobalContext {
    target: Box<dyn Target>,
    cache: RefCell<HashMap<InstructionKey, Decomposition>>,
}

impl GlobalContext {
    /// Builds a context around `target`, with an empty decomposition cache.
    pub fn new(target: Box<dyn Target>) -> Self {
        Self { target, cache: RefCell::new(HashMap::new()) }
    }

    pub fn target(&self) -> &dyn Target {
        self.target.as_ref()
    }

    /// Returns the cached decomposition for `instr`, computing and
    /// inserting it on first use.
    pub fn decompose(&self, instr: &Instruction) -> SimResult<Decomposition> {
        let key = InstructionKey::of(instr);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return Ok(cached.clone());
        }
        let sched_class = self
            .target
            .sched_class(&instr.sched_class)
            .ok_or_else(|| SimError::UnknownSchedClass(instr.sched_class.clone()))?;
        let decomposition = decompose_sched_class(sched_class, self.target.resources());
        self.cache.borrow_mut().insert(key, decomposition.clone());
        Ok(decomposition)
    }

    /// Number of entries currently cached, for tests that want to assert a
    /// run didn't redundantly recompute decompositions.
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }
}

/// Implements spec.md §4.4's decomposition algorithm: denormalizes resource
/// cycles into individual micro-ops, then distributes the scheduling
/// class's total def latency across them.
fn decompose_sched_class(
    sched_class: &crate::target::SchedClassDesc,
    resources: &[crate::target::ProcResourceDesc],
) -> Decomposition {
    let mut remaining: HashMap<usize, u32> = HashMap::new();
    for &(idx, cycles) in &sched_class.resource_cycles {
        *remaining.entry(idx).or_insert(0) += cycles;
    }

    let mut uops = Vec::new();
    // Resources are stored leaf-before-group, so ascending index is already
    // the topological order step 2 of §4.4 asks for.
    for idx in 0..resources.len() {
        let cycles = remaining.get(&idx).copied().unwrap_or(0);
        if cycles == 0 {
            continue;
        }
        for _ in 0..cycles {
            uops.push(Uop { proc_res_idx: idx as u32, start_cycle: 0, end_cycle: 0 });
        }
        for &super_idx in &resources[idx].super_resources {
            let entry = remaining.entry(super_idx).or_insert(0);
            *entry = entry.saturating_sub(cycles);
        }
    }

    // The documented LLVM-scheduling-model quirk (§9, "Open questions"):
    // NumMicroOps says one micro-op but every resource entry denormalized
    // away to zero. Compensate with a single resourceless micro-op rather
    // than silently reporting an empty decomposition.
    if uops.is_empty() && sched_class.num_micro_ops == 1 {
        uops.push(Uop { proc_res_idx: 0, start_cycle: 0, end_cycle: 0 });
    }

    let max_def_latency = sched_class.write_latencies.iter().copied().max().unwrap_or(1).max(1);
    let latencies = distribute_latencies(uops.len(), max_def_latency);
    let mut cycle = 0u32;
    for (uop, latency) in uops.iter_mut().zip(latencies) {
        uop.start_cycle = cycle;
        uop.end_cycle = cycle + latency;
        cycle = uop.end_cycle;
    }

    Decomposition { uops }
}

/// Spreads `total` cycles over `n` micro-ops by ceiling division (the
/// earliest micro-ops get the extra cycle), then lifts any resulting zero
/// up to 1, shrinking the first slot with spare capacity so the sum is
/// preserved (spec.md §4.4 step 4).
fn distribute_latencies(n: usize, total: u32) -> Vec<u32> {
    if n == 0 {
        return Vec::new();
    }
    let n_u32 = n as u32;
    let base = total / n_u32;
    let remainder = total % n_u32;
    let mut latencies: Vec<u32> = (0..n).map(|i| if (i as u32) < remainder { base + 1 } else { base }).collect();

    for i in 0..n {
        if latencies[i] == 0 {
            latencies[i] = 1;
            if let Some(donor) = latencies.iter().position(|&l| l > 1) {
                latencies[donor] -= 1;
            }
        }
    }
    latencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::haswell;

    #[test]
    fn single_port_single_cycle_decomposes_to_one_uop_of_latency_one() {
        let context = GlobalContext::new(Box::new(haswell()));
        let instr = Instruction::new("mov", "WriteALU", 3);
        let decomposition = context.decompose(&instr).unwrap();
        assert_eq!(decomposition.len(), 1);
        assert_eq!(decomposition.uops[0].proc_res_idx, 1);
        assert_eq!(decomposition.uops[0].latency(), 1);
    }

    #[test]
    fn group_resource_expands_super_resource_cycles_away() {
        let context = GlobalContext::new(Box::new(haswell()));
        let instr = Instruction::new("mov", "WriteLoad", 4);
        let decomposition = context.decompose(&instr).unwrap();
        // port 2 (resource index 3, 1 cycle) and the Port23 group (1 cycle)
        // denormalize to a single micro-op on port 2 only, not two.
        assert_eq!(decomposition.len(), 1);
        assert_eq!(decomposition.uops[0].proc_res_idx, 3);
    }

    #[test]
    fn two_uop_instruction_splits_total_latency_across_its_uops() {
        let context = GlobalContext::new(Box::new(haswell()));
        let instr = Instruction::new("fmul", "WriteFMul", 3);
        let decomposition = context.decompose(&instr).unwrap();
        assert_eq!(decomposition.len(), 2);
        let total: u32 = decomposition.uops.iter().map(|u| u.latency()).sum();
        assert_eq!(total, 5);
        assert!(decomposition.uops.iter().all(|u| u.latency() >= 1));
    }

    #[test]
    fn zero_resource_one_micro_op_class_gets_a_resourceless_uop() {
        let context = GlobalContext::new(Box::new(haswell()));
        let instr = Instruction::new("nop", "WriteZeroLatency", 1);
        let decomposition = context.decompose(&instr).unwrap();
        assert_eq!(decomposition.len(), 1);
        assert!(decomposition.uops[0].is_resourceless());
    }

    #[test]
    fn unknown_sched_class_is_an_error() {
        let context = GlobalContext::new(Box::new(haswell()));
        let instr = Instruction::new("???", "NoSuchClass", 1);
        assert!(matches!(context.decompose(&instr), Err(SimError::UnknownSchedClass(_))));
    }

    #[test]
    fn decomposition_is_cached_after_first_use() {
        let context = GlobalContext::new(Box::new(haswell()));
        let instr = Instruction::new("mov", "WriteALU", 3);
        context.decompose(&instr).unwrap();
        context.decompose(&instr).unwrap();
        assert_eq!(context.cache_len(), 1);
    }

    #[test]
    fn distribute_latencies_never_produces_a_zero() {
        for total in 0..6u32 {
            for n in 1..5usize {
                let latencies = distribute_latencies(n, total);
                assert_eq!(latencies.len(), n);
                assert!(latencies.iter().all(|&l| l >= 1));
                // Total is preserved except when total itself was below n
                // (every slot floored to 1 already exceeds it); the
                // invariant spec.md asks for is "no zero latency", not that
                // the sum always equals `total` when `total < n`.
                if total >= n as u32 {
                    assert_eq!(latencies.iter().sum::<u32>(), total);
                }
            }
        }
    }
}
