//! A cycle-accurate out-of-order simulator of a Haswell-like x86-64 core.
//!
//! Consumes a basic block of instructions, each already resolved to a
//! scheduling class by the target's opaque scheduling model, and drives a
//! two-phase (Tick / Propagate) pipeline — fetch, parse, decode into
//! micro-ops, register rename, reorder buffer, issue ports, execution
//! units, writeback, in-order retirement — for a bounded number of
//! iterations or cycles. The result is an append-only event log from which
//! [`analyses`] derives per-port pressure and inverse throughput.
//!
//! This crate has no notion of instruction *bytes*: [`x86-isa`](../x86_isa)
//! cleans up the textual encoding tables that describe how an instruction
//! is spelled in binary, but this simulator only counts encoded sizes (for
//! fetch-bandwidth modelling) and otherwise treats a [`basic_block::Instruction`]
//! as a scheduling-class-tagged opaque unit. Decoding bytes, disassembly and
//! branch/cache prediction are out of scope — see `spec.md` §1.

#![warn(missing_docs)]
#![deny(unused_must_use)]

pub mod analyses;
pub mod basic_block;
pub mod buffers;
pub mod components;
pub mod context;
pub mod error;
pub mod log;
pub mod register_tracker;
pub mod simulator;
pub mod target;
pub mod uop;

pub use context::GlobalContext;
pub use error::{SimError, SimResult};
pub use simulator::{Simulator, SimulatorConfig};
pub use target::haswell;
