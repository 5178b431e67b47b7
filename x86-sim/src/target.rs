//! The target model: execution-port topology and the scheduling-class
//! table micro-op decomposition reads from.
//!
//! spec.md treats the upstream scheduling model (Triple, SubtargetInfo,
//! InstrInfo, SchedModel, CodeEmitter, RegisterInfo) as an opaque read-only
//! dependency (§1 "Out of scope"); [`Target`] is the trait-shaped stand-in
//! for that dependency, and [`haswell`] builds the one concrete instance
//! this crate ships — a simplified Haswell-like port layout, close enough
//! to the real `SchedModel` to drive the end-to-end scenarios in spec.md
//! §8 but not a transcription of LLVM's `X86SchedHaswell.td`.

use std::collections::HashMap;

use crate::basic_block::Instruction;
use crate::error::{SimError, SimResult};

/// One execution resource: either a single issue port ("unit") or a group
/// spanning several ports (e.g. "either port 2 or port 3" for loads).
///
/// `super_resources` lists the groups a unit belongs to, so that
/// decomposition can "un-denormalize" resource cycles (spec.md §4.4 step
/// 2); `sub_units` is the inverse view a group needs to expand
/// `possible_ports` for the ROB (spec.md §4.6 ReadNewUops).
#[derive(Debug, Clone)]
pub struct ProcResourceDesc {
    pub name: &'static str,
    pub num_units: u32,
    pub super_resources: Vec<usize>,
    pub sub_units: Vec<usize>,
}

impl ProcResourceDesc {
    pub fn is_group(&self) -> bool {
        !self.sub_units.is_empty()
    }
}

/// One scheduling class: how many micro-ops an instruction in this class
/// decomposes into, which resources they occupy, and the latencies of its
/// register defs. Index `0` of `resource_cycles` may name either a leaf
/// port or a group; §4.4 walks them in topological (index) order.
#[derive(Debug, Clone)]
pub struct SchedClassDesc {
    pub name: String,
    pub num_micro_ops: u32,
    /// `(resource_index, cycles)` pairs, topologically sorted by resource
    /// index (sub-resources first). May legitimately list both a unit and
    /// an enclosing group for the same micro-op; decomposition un-does that
    /// denormalization (spec.md §4.4).
    pub resource_cycles: Vec<(usize, u32)>,
    /// One entry per register def; decomposition's total assigned latency
    /// is `write_latencies.iter().max()`.
    pub write_latencies: Vec<u32>,
}

/// The scheduling-model surface the simulator consumes.
pub trait Target: Send + Sync {
    /// Execution resources, leaves (ports) before the groups that contain
    /// them — the order [`ProcResourceDesc::super_resources`]/`sub_units`
    /// assume.
    fn resources(&self) -> &[ProcResourceDesc];

    /// Looks up a scheduling class by the name an [`Instruction`] carries.
    fn sched_class(&self, name: &str) -> Option<&SchedClassDesc>;

    /// Bytes the fetcher should charge against its per-cycle budget for
    /// `instr`. Defaults to the instruction's own reported encoded size;
    /// a real target would instead consult its code emitter for
    /// variable-length forms (spec.md §4.6 Fetcher).
    fn encoded_size(&self, instr: &Instruction) -> u32 {
        instr.encoded_bytes
    }

    /// Number of architectural general-purpose registers, used by the
    /// renamer to pick the first physical-register id (spec.md §4.6:
    /// "first id = num_architectural_regs + 1").
    fn num_architectural_regs(&self) -> u32 {
        16
    }
}

/// A small, explicit, `HashMap`-backed [`Target`] — enough to name
/// scheduling classes ad hoc in tests and in the CLI's built-in Haswell
/// model without a code-generated table.
pub struct StaticTarget {
    resources: Vec<ProcResourceDesc>,
    sched_classes: HashMap<String, SchedClassDesc>,
}

impl StaticTarget {
    pub fn new(resources: Vec<ProcResourceDesc>) -> Self {
        Self { resources, sched_classes: HashMap::new() }
    }

    pub fn with_sched_class(mut self, class: SchedClassDesc) -> Self {
        self.sched_classes.insert(class.name.clone(), class);
        self
    }
}

impl Target for StaticTarget {
    fn resources(&self) -> &[ProcResourceDesc] {
        &self.resources
    }

    fn sched_class(&self, name: &str) -> Option<&SchedClassDesc> {
        self.sched_classes.get(name)
    }
}

/// Port names in a Haswell-like layout: eight single-unit ports, the way
/// spec.md's end-to-end scenarios (§8) name "port 0", "port 1", ... "port
/// 23" (the combined load/store-address group).
pub const HASWELL_PORT_NAMES: [&str; 8] =
    ["Port0", "Port1", "Port2", "Port3", "Port4", "Port5", "Port6", "Port7"];

/// Builds the simplified Haswell-like [`Target`] the CLI and the
/// end-to-end tests use: eight single-cycle-issue ports (0-7), a "23" load
/// group spanning ports 2 and 3, and a handful of scheduling classes
/// exercising the simulator scenarios from spec.md §8 (independent 1-cycle
/// ALU ops, a 3-µop FP-stack-like instruction spanning two ports, a
/// latency-3 single-µop multiply, and a resourceless move).
pub fn haswell() -> StaticTarget {
    // Resource index 0 is reserved and never appears in a scheduling
    // class's `resource_cycles`: `Uop::proc_res_idx == 0` is the
    // "resourceless" sentinel (§3 "µop decomposition"), so a real execution
    // port can't live there too. The eight leaf ports occupy indices 1..=8;
    // the combined Port23 load-address group is index 9.
    let mut resources: Vec<ProcResourceDesc> = vec![ProcResourceDesc {
        name: "<resourceless>",
        num_units: 0,
        super_resources: vec![],
        sub_units: vec![],
    }];
    resources.extend((0..8).map(|i| ProcResourceDesc {
        name: HASWELL_PORT_NAMES[i],
        num_units: 1,
        super_resources: if i == 2 || i == 3 { vec![9] } else { vec![] },
        sub_units: vec![],
    }));
    resources.push(ProcResourceDesc {
        name: "Port23",
        num_units: 2,
        super_resources: vec![],
        sub_units: vec![3, 4],
    });

    StaticTarget::new(resources)
        // Simple register-immediate/register-register ALU op: one single
        // µop on port 0, latency 1.
        .with_sched_class(SchedClassDesc {
            name: "WriteALU".into(),
            num_micro_ops: 1,
            resource_cycles: vec![(1, 1)],
            write_latencies: vec![1],
        })
        .with_sched_class(SchedClassDesc {
            name: "WriteALUPort1".into(),
            num_micro_ops: 1,
            resource_cycles: vec![(2, 1)],
            write_latencies: vec![1],
        })
        .with_sched_class(SchedClassDesc {
            name: "WriteALUPort5".into(),
            num_micro_ops: 1,
            resource_cycles: vec![(6, 1)],
            write_latencies: vec![1],
        })
        .with_sched_class(SchedClassDesc {
            name: "WriteALUPort6".into(),
            num_micro_ops: 1,
            resource_cycles: vec![(7, 1)],
            write_latencies: vec![1],
        })
        // An FMUL-ST(i)-analog: two µops, on ports 0 and 1, total latency 5.
        .with_sched_class(SchedClassDesc {
            name: "WriteFMul".into(),
            num_micro_ops: 2,
            resource_cycles: vec![(1, 1), (2, 1)],
            write_latencies: vec![5],
        })
        // IMUL-like: single µop on port 1, latency 3.
        .with_sched_class(SchedClassDesc {
            name: "WriteIMul".into(),
            num_micro_ops: 1,
            resource_cycles: vec![(2, 1)],
            write_latencies: vec![3],
        })
        // A load: one µop on the Port23 group — possible_ports expands to
        // {port 2, port 3} (resource indices 3 and 4).
        .with_sched_class(SchedClassDesc {
            name: "WriteLoad".into(),
            num_micro_ops: 1,
            resource_cycles: vec![(3, 1), (9, 1)],
            write_latencies: vec![5],
        })
        // A register-rename-only move: resourceless, retires without ever
        // touching an issue port.
        .with_sched_class(SchedClassDesc {
            name: "WriteZeroLatency".into(),
            num_micro_ops: 1,
            resource_cycles: vec![],
            write_latencies: vec![1],
        })
}

/// Resolves a target by name for the CLI's `--target` flag and the
/// simulator's init-time validation (spec.md §7: `SimError::UnknownTarget`).
/// Only `"haswell"` is known today; the match is case-insensitive.
pub fn resolve(name: &str) -> SimResult<Box<dyn Target>> {
    match name.to_ascii_lowercase().as_str() {
        "haswell" => Ok(Box::new(haswell())),
        _ => Err(SimError::UnknownTarget(name.to_string())),
    }
}
