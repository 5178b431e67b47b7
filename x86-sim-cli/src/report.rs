//! Renders a [`RunReport`] as the human-readable text report spec.md §6
//! describes: summary line, per-port pressure table, per-instruction
//! pressure table.

use std::fmt::Write as _;

use x86_sim::analyses::{inverse_throughput, port_pressure};
use x86_sim::basic_block::BasicBlock;
use x86_sim::simulator::RunReport;
use x86_sim::GlobalContext;

/// Formats the whole textual report for one run.
pub fn render(context: &GlobalContext, block: &BasicBlock, report: &RunReport) -> String {
    let mut out = String::new();

    writeln!(out, "Instructions analysed: {}", report.num_instructions).unwrap();
    writeln!(out, "Iterations completed: {}", report.iterations.len()).unwrap();
    writeln!(out, "Total cycles: {}", report.num_cycles).unwrap();

    match inverse_throughput(report) {
        Some(throughput) => {
            writeln!(
                out,
                "Cycles per iteration (steady state): min={} max={} (over {} iterations, {} total cycles)",
                throughput.min_cycles, throughput.max_cycles, throughput.num_iterations, throughput.total_cycles
            )
            .unwrap();
        }
        None => {
            writeln!(out, "Cycles per iteration (steady state): n/a (no iteration completed)").unwrap();
        }
    }
    out.push('\n');

    let pressures = port_pressure(report);
    render_port_pressure_table(&mut out, &pressures);
    out.push('\n');
    render_per_instruction_table(&mut out, context, block, &pressures);

    out
}

fn render_port_pressure_table(out: &mut String, pressures: &[x86_sim::analyses::PortPressure]) {
    out.push_str("Port ");
    for pressure in pressures {
        write!(out, "| {:>7} ", pressure.port_name).unwrap();
    }
    out.push('\n');
    out.push_str("Cycles");
    for pressure in pressures {
        write!(out, "| {:>7} ", format_pressure(pressure.cycles_per_iteration)).unwrap();
    }
    out.push('\n');
}

fn render_per_instruction_table(out: &mut String, context: &GlobalContext, block: &BasicBlock, pressures: &[x86_sim::analyses::PortPressure]) {
    write!(out, "{:<6}", "#Uops").unwrap();
    for pressure in pressures {
        write!(out, "| {:>7} ", pressure.port_name).unwrap();
    }
    writeln!(out, "| Instruction").unwrap();

    for (bb_index, instruction) in block.instructions.iter().enumerate() {
        let decomposition = context.decompose(instruction).ok();
        let has_resourceless = decomposition.as_ref().map(|d| d.uops.iter().any(|u| u.is_resourceless())).unwrap_or(false);
        let num_uops = decomposition.map(|d| d.len()).unwrap_or(0);
        let prefix = if has_resourceless { "*" } else { "" };
        write!(out, "{:<6}", format!("{prefix}{num_uops}")).unwrap();
        for pressure in pressures {
            let cycles = pressure.cycles_per_iteration_by_mc_inst.get(bb_index).copied().unwrap_or(0.0);
            write!(out, "| {:>7} ", format_pressure(cycles)).unwrap();
        }
        writeln!(out, "| {}", instruction.mnemonic).unwrap();
    }
}

/// Blanks a zero pressure cell (spec.md §6: "Pressures equal to 0.0 are
/// blanked").
fn format_pressure(cycles: f64) -> String {
    if cycles == 0.0 {
        String::new()
    } else {
        format!("{cycles:.2}")
    }
}
