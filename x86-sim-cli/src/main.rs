//! Command-line front end for the out-of-order simulator (spec.md §6).
//!
//! Runs a basic block through a Haswell-shaped pipeline and prints the
//! port-pressure and inverse-throughput report spec.md §6 describes.
//! Optionally dumps the full event log (`--log`) and an IACA-style
//! execution trace (`--trace`).

mod input;
mod report;
mod trace;

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;

use input::InputType;
use x86_sim::simulator::{IssuePolicyKind, Simulator, SimulatorConfig};
use x86_sim::target::haswell;
use x86_sim::GlobalContext;

/// Runs a basic block through the Haswell out-of-order simulator and
/// reports port pressure and inverse throughput (spec.md §6).
#[derive(Debug, Parser)]
#[command(name = "x86-sim-cli", version, about)]
struct Cli {
    /// Write the full event-log dump to this path.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Write an IACA-style execution trace to this path.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Stop after this many loop iterations have retired (`0` = no limit).
    #[arg(long = "max_iters", default_value_t = 20)]
    max_iters: usize,

    /// Stop after this many cycles have elapsed (`0` = no limit).
    #[arg(long = "max_cycles", default_value_t = 100_000)]
    max_cycles: usize,

    /// Whether the input basic block should be looped.
    #[arg(long = "loop_body", action = clap::ArgAction::Set, default_value_t = true)]
    loop_body: bool,

    /// Which dialect/container the input file is in.
    #[arg(long = "input_type", value_enum)]
    input_type: InputType,

    /// Path to the input file.
    input: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::try_init().ok();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("x86-sim-cli: {message}");
            ExitCode::FAILURE
        }
    }
}

#[tracing::instrument(skip(cli), fields(input = %cli.input.display(), input_type = %cli.input_type))]
fn run(cli: Cli) -> Result<(), String> {
    let basic_block = input::read_basic_block(cli.input_type, &cli.input, cli.loop_body).map_err(|e| e.to_string())?;
    tracing::debug!(instructions = basic_block.len(), loop_body = cli.loop_body, "parsed basic block");

    let context = Rc::new(GlobalContext::new(Box::new(haswell())));
    let config = SimulatorConfig {
        max_iterations: cli.max_iters,
        max_cycles: cli.max_cycles,
        issue_policy: IssuePolicyKind::LeastLoaded,
        ..SimulatorConfig::default()
    };
    let simulator = Simulator::new(context.clone(), config);
    let report = simulator.run(basic_block.clone()).map_err(|e| e.to_string())?;
    tracing::info!(cycles = report.num_cycles, iterations = report.iterations.len(), "simulation finished");

    if let Some(path) = &cli.log {
        std::fs::write(path, trace::render_event_log(&report)).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }
    if let Some(path) = &cli.trace {
        std::fs::write(path, trace::render_iaca_trace(&basic_block, &report)).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }

    print!("{}", report::render(&context, &basic_block, &report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_flags_match_spec() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_spec_md() {
        let cli = Cli::parse_from(["x86-sim-cli", "--input_type", "intel_asm", "block.s"]);
        assert_eq!(cli.max_iters, 20);
        assert_eq!(cli.max_cycles, 100_000);
        assert!(cli.loop_body);
        assert!(cli.log.is_none());
        assert!(cli.trace.is_none());
    }

    #[test]
    fn loop_body_accepts_an_explicit_false() {
        let cli = Cli::parse_from(["x86-sim-cli", "--input_type", "att_asm", "--loop_body", "false", "block.s"]);
        assert!(!cli.loop_body);
    }
}
