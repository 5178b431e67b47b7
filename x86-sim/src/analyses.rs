//! C10 — parses the event log a [`crate::simulator::Simulator::run`] call
//! produced into the two reports spec.md §4.8 describes: per-port pressure
//! and steady-state inverse throughput.

use crate::simulator::RunReport;

/// One port's pressure: total cycles/iteration it was occupied, and the
/// breakdown by which basic-block instruction charged those cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct PortPressure {
    /// The port's display name, as registered with the simulator's buffer
    /// descriptions (e.g. `"Port0"`, `"Port23"`).
    pub port_name: &'static str,
    /// Index of this port's dispatch buffer in [`RunReport::buffer_descriptions`].
    pub buffer_index: usize,
    /// Cycles/iteration this port was occupied, summed across instructions.
    pub cycles_per_iteration: f64,
    /// Cycles/iteration charged to each basic-block instruction, indexed by
    /// `bb_index`.
    pub cycles_per_iteration_by_mc_inst: Vec<f64>,
}

/// Computes one [`PortPressure`] per port buffer a run registered.
///
/// A port declares itself with an `"init"` `PortPressure` line (emitted once,
/// at cycle 0, by [`crate::simulator::Simulator::run`]); every other
/// `PortPressure` line is `"<iteration>,<bb_index>,<cycles>"`
/// ([`crate::buffers::DispatchPort::propagate`]). Lines whose iteration is
/// not strictly below the number of *complete* iterations are ignored —
/// a loop's still-draining final iteration must not skew steady-state
/// pressure (spec.md §4.8).
pub fn port_pressure(report: &RunReport) -> Vec<PortPressure> {
    let num_complete_iterations = report.iterations.len();
    report
        .port_buffer_indices
        .iter()
        .map(|&buffer_index| {
            let port_name = report.buffer_descriptions[buffer_index].display_name;
            let mut by_instruction = vec![0.0f64; report.num_instructions];
            for event in report.log.for_buffer(buffer_index) {
                if event.msg_tag != "PortPressure" || event.msg == "init" {
                    continue;
                }
                let Some((bb_index, cycles)) = parse_port_pressure_line(&event.msg, num_complete_iterations) else {
                    continue;
                };
                by_instruction[bb_index] += cycles;
            }
            let cycles_per_iteration_by_mc_inst: Vec<f64> = if num_complete_iterations == 0 {
                by_instruction
            } else {
                by_instruction.into_iter().map(|cycles| cycles / num_complete_iterations as f64).collect()
            };
            let cycles_per_iteration = cycles_per_iteration_by_mc_inst.iter().sum();
            PortPressure { port_name, buffer_index, cycles_per_iteration, cycles_per_iteration_by_mc_inst }
        })
        .collect()
}

/// Parses one `"<iteration>,<bb_index>,<cycles>"` line, returning `None` if
/// it is malformed or names an iteration that never completed.
fn parse_port_pressure_line(msg: &str, num_complete_iterations: usize) -> Option<(usize, f64)> {
    let mut parts = msg.split(',');
    let iteration: usize = parts.next()?.parse().ok()?;
    let bb_index: usize = parts.next()?.parse().ok()?;
    let cycles: f64 = parts.next()?.parse().ok()?;
    if iteration >= num_complete_iterations {
        return None;
    }
    Some((bb_index, cycles))
}

/// Steady-state throughput over the second half of a run's completed
/// iterations (the first half is discarded as pipeline warm-up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InverseThroughput {
    /// Smallest per-iteration cycle count observed in the measured window.
    pub min_cycles: u64,
    /// Largest per-iteration cycle count observed in the measured window.
    pub max_cycles: u64,
    /// Number of iterations the measured window covers.
    pub num_iterations: usize,
    /// Sum of per-iteration cycle counts over the measured window.
    pub total_cycles: u64,
}

/// Computes [`InverseThroughput`] over the second half of `report`'s
/// completed iterations, or `None` if none completed (spec.md §4.8
/// "Inverse throughput").
///
/// Per-iteration cycle counts are consecutive differences of
/// `iterations[i].end_cycle`, using `iterations[start - 1].end_cycle` (or
/// `0` if the measured window starts at the very first iteration) as the
/// base for the first measured delta.
pub fn inverse_throughput(report: &RunReport) -> Option<InverseThroughput> {
    let iterations = &report.iterations;
    let n = iterations.len();
    if n == 0 {
        return None;
    }
    let start = n / 2;
    if start >= n {
        return None;
    }

    let mut base = if start == 0 { 0 } else { iterations[start - 1].end_cycle };
    let mut min_cycles = u64::MAX;
    let mut max_cycles = 0u64;
    let mut total_cycles = 0u64;
    let mut num_iterations = 0usize;
    for iteration in &iterations[start..] {
        let delta = iteration.end_cycle.saturating_sub(base);
        min_cycles = min_cycles.min(delta);
        max_cycles = max_cycles.max(delta);
        total_cycles += delta;
        num_iterations += 1;
        base = iteration.end_cycle;
    }
    Some(InverseThroughput { min_cycles, max_cycles, num_iterations, total_cycles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{BufferDescription, EventLog};
    use crate::simulator::IterationStats;

    fn report_with(events: Vec<(u64, usize, &'static str, String)>, iterations: Vec<u64>, num_instructions: usize) -> RunReport {
        let mut log = EventLog::new();
        for (cycle, buffer_index, tag, msg) in events {
            log.push(cycle, buffer_index, tag, msg);
        }
        RunReport {
            log,
            buffer_descriptions: vec![BufferDescription { display_name: "Port0", id: 0 }, BufferDescription { display_name: "Port1", id: 1 }],
            port_buffer_indices: vec![0, 1],
            iterations: iterations.into_iter().map(|end_cycle| IterationStats { end_cycle }).collect(),
            num_cycles: 100,
            num_instructions,
        }
    }

    #[test]
    fn port_pressure_sums_per_instruction_cycles_and_divides_by_complete_iterations() {
        let report = report_with(
            vec![
                (0, 0, "PortPressure", "init".to_string()),
                (0, 0, "PortPressure", "0,0,1".to_string()),
                (1, 0, "PortPressure", "0,1,1".to_string()),
                (2, 0, "PortPressure", "1,0,1".to_string()),
                (3, 0, "PortPressure", "1,1,1".to_string()),
            ],
            vec![4, 8],
            2,
        );
        let pressures = port_pressure(&report);
        let port0 = pressures.iter().find(|p| p.buffer_index == 0).unwrap();
        assert_eq!(port0.cycles_per_iteration_by_mc_inst, vec![1.0, 1.0]);
        assert_eq!(port0.cycles_per_iteration, 2.0);
    }

    #[test]
    fn port_pressure_ignores_lines_past_the_last_complete_iteration() {
        let report = report_with(
            vec![
                (0, 0, "PortPressure", "init".to_string()),
                (0, 0, "PortPressure", "0,0,1".to_string()),
                (1, 0, "PortPressure", "1,0,1".to_string()),
            ],
            vec![4],
            1,
        );
        let pressures = port_pressure(&report);
        let port0 = pressures.iter().find(|p| p.buffer_index == 0).unwrap();
        assert_eq!(port0.cycles_per_iteration_by_mc_inst, vec![1.0]);
    }

    #[test]
    fn no_completed_iterations_yields_none_inverse_throughput() {
        let report = report_with(vec![], vec![], 1);
        assert_eq!(inverse_throughput(&report), None);
    }

    #[test]
    fn inverse_throughput_skips_warm_up_half_and_diffs_end_cycles() {
        // 4 iterations ending at cycles 3, 7, 11, 15 (steady 4-cycle loop).
        let report = report_with(vec![], vec![3, 7, 11, 15], 1);
        let throughput = inverse_throughput(&report).unwrap();
        // start = 4 / 2 = 2, base = iterations[1].end_cycle = 7.
        assert_eq!(throughput.num_iterations, 2);
        assert_eq!(throughput.min_cycles, 4);
        assert_eq!(throughput.max_cycles, 4);
        assert_eq!(throughput.total_cycles, 8);
    }

    #[test]
    fn single_completed_iteration_measures_from_cycle_zero() {
        let report = report_with(vec![], vec![5], 1);
        let throughput = inverse_throughput(&report).unwrap();
        assert_eq!(throughput.num_iterations, 1);
        assert_eq!(throughput.min_cycles, 5);
        assert_eq!(throughput.max_cycles, 5);
    }
}
