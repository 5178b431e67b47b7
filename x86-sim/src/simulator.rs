//! The driver (C9): wires every buffer and component from
//! [`crate::buffers`]/[`crate::components`] into one Haswell-shaped pipeline
//! and runs the two-phase Tick/Propagate loop until the requested number of
//! loop iterations or cycles has been reached.
//!
//! The wiring mirrors the data-flow diagram: `Fetcher -> FetchBuffer ->
//! InstructionParser -> PreDecodeBuffer -> InstructionDecoder -> Idq ->
//! Renamer -> RenamedUops -> Rob -> {one DispatchPort per port} ->
//! {one SimplifiedExecutionUnit per port} -> Writeback -> Rob ->
//! RetireLink -> Retirer`, plus the two feedback channels the Retirer closes:
//! `RobRetired` (frees ROB slots and physical-register names) and the
//! iteration-counter sink the driver itself polls every cycle to detect
//! completed loop iterations.

use std::rc::Rc;

use crate::basic_block::BasicBlock;
use crate::buffers::{Buffer, DevNullBuffer, DispatchPort, ExecDepsBuffer, FifoBuffer, LinkBuffer, Source};
use crate::components::issue_policy::{Greedy, IssuePolicy, LeastLoaded};
use crate::components::renamer::PhysRegTable;
use crate::components::{shared, Fetcher, InstructionDecoder, InstructionParser, Renamer, Retirer, Rob, SimplifiedExecutionUnit};
use crate::context::GlobalContext;
use crate::error::{SimError, SimResult};
use crate::log::{BufferDescription, CycleLogger, EventLog};
use crate::register_tracker::RegisterNameTracker;
use crate::uop::{InstructionIndex, RenamedUopId, RobUopId, UopId};

/// Which [`IssuePolicy`] the reorder buffer should use to order a micro-op's
/// candidate ports before trying each in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssuePolicyKind {
    /// Always try ports in the order the ROB's resource table lists them.
    Greedy,
    /// Prefer whichever candidate port has issued the fewest micro-ops so
    /// far this run.
    #[default]
    LeastLoaded,
}

impl IssuePolicyKind {
    fn build(self) -> Box<dyn IssuePolicy> {
        match self {
            IssuePolicyKind::Greedy => Box::new(Greedy),
            IssuePolicyKind::LeastLoaded => Box::new(LeastLoaded::new()),
        }
    }
}

/// Widths, depths and stopping conditions for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorConfig {
    /// Bytes the fetcher may pull from the instruction stream per cycle.
    pub max_bytes_per_cycle: u32,
    /// Instructions the parser may forward per cycle.
    pub max_parsed_per_cycle: usize,
    /// Instructions the decoder may expand into micro-ops per cycle.
    pub num_decoders: usize,
    /// Micro-ops the renamer may process per cycle.
    pub uops_per_cycle: usize,
    /// Size of the physical-register file the renamer allocates from.
    pub num_physical_registers: usize,
    /// Number of in-flight entries the reorder buffer can hold at once.
    pub rob_capacity: usize,
    /// Which policy the reorder buffer uses to pick among a micro-op's
    /// candidate ports.
    pub issue_policy: IssuePolicyKind,
    /// Stop once this many loop iterations have retired; `0` means no
    /// iteration limit.
    pub max_iterations: usize,
    /// Stop once this many cycles have elapsed; `0` means no cycle limit.
    pub max_cycles: usize,
}

impl Default for SimulatorConfig {
    /// Haswell-shaped widths close enough to drive the end-to-end scenarios
    /// this crate tests against, with the same 20-iteration/100000-cycle
    /// stopping defaults the command-line front end uses.
    fn default() -> Self {
        Self {
            max_bytes_per_cycle: 16,
            max_parsed_per_cycle: 4,
            num_decoders: 4,
            uops_per_cycle: 4,
            num_physical_registers: 256,
            rob_capacity: 192,
            issue_policy: IssuePolicyKind::LeastLoaded,
            max_iterations: 20,
            max_cycles: 100_000,
        }
    }
}

/// One loop iteration's completion cycle, as recorded when its last
/// instruction retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationStats {
    /// The cycle (0-based) during which this iteration's last instruction
    /// retired.
    pub end_cycle: u64,
}

/// Everything a run produced: the event log an analysis walks, the buffer
/// identities it was tagged with, and the iteration/cycle bookkeeping the
/// inverse-throughput analysis needs.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The full append-only event log.
    pub log: EventLog,
    /// One description per registered buffer, indexed by buffer index.
    pub buffer_descriptions: Vec<BufferDescription>,
    /// Buffer indices of the per-port dispatch buffers the port-pressure
    /// analysis should report on.
    pub port_buffer_indices: Vec<usize>,
    /// Completed loop iterations, in completion order.
    pub iterations: Vec<IterationStats>,
    /// Total number of cycles the run executed.
    pub num_cycles: u64,
    /// Number of instructions in the simulated basic block, for sizing the
    /// port-pressure analysis' per-instruction breakdown.
    pub num_instructions: usize,
}

/// Runs one basic block through a Haswell-shaped out-of-order pipeline.
pub struct Simulator {
    context: Rc<GlobalContext>,
    config: SimulatorConfig,
}

impl Simulator {
    /// Builds a simulator around a shared target/decomposition-cache
    /// context and a run configuration.
    pub fn new(context: Rc<GlobalContext>, config: SimulatorConfig) -> Self {
        Self { context, config }
    }

    /// Simulates `basic_block` until either `max_iterations` loop iterations
    /// have retired or `max_cycles` cycles have elapsed, whichever comes
    /// first.
    pub fn run(&self, basic_block: BasicBlock) -> SimResult<RunReport> {
        if basic_block.is_empty() {
            return Err(SimError::EmptyInstructionList);
        }
        let bb = Rc::new(basic_block);
        let num_instructions = bb.len();
        let config = self.config;

        // --- front end ---------------------------------------------------
        let fetch_buffer = shared(FifoBuffer::<InstructionIndex>::new(16, "FetchBuffer"));
        let predecode_buffer = shared(FifoBuffer::<InstructionIndex>::new(16, "PreDecodeBuffer"));
        let idq = shared(FifoBuffer::<UopId>::new(32, "Idq"));
        let renamed_uops = shared(LinkBuffer::<RenamedUopId>::new(config.uops_per_cycle.max(1), "RenamedUops"));

        let mut fetcher = Fetcher::new(config.max_bytes_per_cycle, self.context.clone(), bb.clone(), fetch_buffer.clone());
        let mut parser = InstructionParser::new(config.max_parsed_per_cycle, fetch_buffer.clone(), predecode_buffer.clone());
        let mut decoder = InstructionDecoder::new(config.num_decoders, self.context.clone(), bb.clone(), predecode_buffer.clone(), idq.clone());

        // --- rename --------------------------------------------------------
        let phys_regs = shared(PhysRegTable::new(self.context.target().num_architectural_regs(), config.num_physical_registers));
        let tracker = shared(RegisterNameTracker::new());
        let mut renamer =
            Renamer::new(config.uops_per_cycle, self.context.clone(), bb.clone(), idq.clone(), renamed_uops.clone(), phys_regs.clone(), tracker.clone());

        // --- issue ports & execution units, one pair per leaf port --------
        let resources = self.context.target().resources();
        let num_resources = resources.len();
        let writeback = shared(LinkBuffer::<RobUopId>::new(num_resources.max(1), "Writeback"));

        let mut port_sinks: Vec<Option<crate::components::Shared<DispatchPort<RobUopId>>>> = vec![None; num_resources];
        let mut port_buffer_handles: Vec<(usize, crate::components::Shared<DispatchPort<RobUopId>>)> = Vec::new();
        let mut execution_units: Vec<SimplifiedExecutionUnit<RobUopId>> = Vec::new();
        for (idx, resource) in resources.iter().enumerate() {
            if idx == 0 || resource.is_group() {
                continue;
            }
            let port = shared(DispatchPort::<RobUopId>::new(resource.num_units as usize));
            execution_units.push(SimplifiedExecutionUnit::new(port.clone(), writeback.clone()));
            port_buffer_handles.push((idx, port.clone()));
            port_sinks[idx] = Some(port);
        }

        // --- reorder buffer -------------------------------------------------
        let available_deps = shared(ExecDepsBuffer::<RobUopId>::new("AvailableDeps"));
        let retire_link = shared(LinkBuffer::<RobUopId>::new(config.rob_capacity.max(1), "RetireLink"));
        let issued_sink = shared(DevNullBuffer::<RobUopId>::new("Issued"));
        let rob_retired = shared(FifoBuffer::<usize>::new(config.rob_capacity.max(1), "RobRetired"));

        let mut rob = Rob::new(
            config.rob_capacity.max(1),
            self.context.clone(),
            bb.clone(),
            phys_regs,
            tracker,
            config.issue_policy.build(),
            renamed_uops.clone(),
            available_deps.clone(),
            writeback.clone(),
            rob_retired.clone(),
            retire_link.clone(),
            issued_sink.clone(),
            port_sinks,
        );

        // --- retirement -------------------------------------------------
        let primary_sink = shared(DevNullBuffer::<RobUopId>::new("Retired"));
        let retired_instructions = shared(FifoBuffer::<InstructionIndex>::new(config.rob_capacity.max(1), "RetiredInstructions"));
        let mut retirer = Retirer::new(self.context.clone(), bb.clone(), retire_link.clone(), primary_sink.clone(), retired_instructions.clone(), rob_retired.clone());

        // --- buffer registry, in pipeline order -----------------------------
        let mut buffer_descriptions: Vec<BufferDescription> = Vec::new();
        let mut propagators: Vec<Box<dyn FnMut(&mut dyn crate::log::Logger)>> = Vec::new();
        let mut port_buffer_indices: Vec<usize> = Vec::new();

        macro_rules! register {
            ($name:expr, $buf:expr) => {{
                let index = buffer_descriptions.len();
                buffer_descriptions.push(BufferDescription { display_name: $name, id: index });
                let handle = $buf.clone();
                propagators.push(Box::new(move |logger: &mut dyn crate::log::Logger| handle.borrow_mut().propagate(logger)));
                index
            }};
        }

        register!("FetchBuffer", fetch_buffer);
        register!("PreDecodeBuffer", predecode_buffer);
        register!("Idq", idq);
        register!("RenamedUops", renamed_uops);
        register!("AvailableDeps", available_deps);
        for (idx, port) in &port_buffer_handles {
            let name = resources[*idx].name;
            let buffer_index = register!(name, port);
            port_buffer_indices.push(buffer_index);
        }
        register!("Writeback", writeback);
        register!("RetireLink", retire_link);
        register!("Issued", issued_sink);
        register!("Retired", primary_sink);
        register!("RetiredInstructions", retired_instructions);
        register!("RobRetired", rob_retired);

        let mut log = EventLog::new();
        for &index in &port_buffer_indices {
            log.push(0, index, "PortPressure", "init".to_string());
        }

        let mut iterations = Vec::new();
        let mut cycle: u64 = 0;
        loop {
            if config.max_cycles > 0 && cycle >= config.max_cycles as u64 {
                break;
            }

            fetcher.tick();
            parser.tick();
            decoder.tick();
            renamer.tick();
            rob.tick();
            for unit in &mut execution_units {
                unit.tick();
            }
            retirer.tick();

            for (index, propagate) in propagators.iter_mut().enumerate() {
                let mut logger = CycleLogger::new(&mut log, cycle, index);
                propagate(&mut logger);
            }

            let mut stop = false;
            while let Some(instr_index) = retired_instructions.borrow_mut().pop() {
                if instr_index.bb_index + 1 == num_instructions {
                    iterations.push(IterationStats { end_cycle: cycle });
                    if config.max_iterations > 0 && instr_index.iteration + 1 >= config.max_iterations {
                        stop = true;
                    }
                }
            }

            cycle += 1;
            if stop {
                break;
            }
        }

        Ok(RunReport { log, buffer_descriptions, port_buffer_indices, iterations, num_cycles: cycle, num_instructions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_block::{Instruction, RegisterOperand};
    use crate::target::haswell;
    use x86_model::Register::{Rax, Rcx};
    use x86_model::SubRegisterWidth;

    fn single_alu_instruction_block(is_loop: bool) -> BasicBlock {
        let instr = Instruction::new("add", "WriteALU", 3)
            .with_registers(vec![RegisterOperand::write(Rax, SubRegisterWidth::Bits32), RegisterOperand::read(Rcx, SubRegisterWidth::Bits32)]);
        BasicBlock::new(vec![instr], is_loop)
    }

    #[test]
    fn empty_block_is_rejected() {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let sim = Simulator::new(context, SimulatorConfig::default());
        assert_eq!(sim.run(BasicBlock::new(vec![], false)), Err(SimError::EmptyInstructionList));
    }

    #[test]
    fn non_looping_single_instruction_block_retires_within_a_handful_of_cycles() {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let sim = Simulator::new(context, SimulatorConfig { max_iterations: 1, max_cycles: 50, ..SimulatorConfig::default() });
        let report = sim.run(single_alu_instruction_block(false)).unwrap();
        assert_eq!(report.iterations.len(), 1);
        assert!(report.num_cycles < 50);
    }

    #[test]
    fn looping_block_retires_the_configured_number_of_iterations() {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let sim = Simulator::new(context, SimulatorConfig { max_iterations: 5, max_cycles: 1000, ..SimulatorConfig::default() });
        let report = sim.run(single_alu_instruction_block(true)).unwrap();
        assert_eq!(report.iterations.len(), 5);
    }

    #[test]
    fn port_pressure_buffers_are_registered_and_initialized() {
        let context = Rc::new(GlobalContext::new(Box::new(haswell())));
        let sim = Simulator::new(context, SimulatorConfig { max_iterations: 1, max_cycles: 50, ..SimulatorConfig::default() });
        let report = sim.run(single_alu_instruction_block(false)).unwrap();
        assert_eq!(report.port_buffer_indices.len(), 8);
        for &index in &report.port_buffer_indices {
            assert!(report.log.for_buffer(index).any(|event| event.msg_tag == "PortPressure" && event.msg == "init"));
        }
    }
}
