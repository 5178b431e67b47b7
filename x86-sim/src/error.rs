//! Initialization-time errors the simulator driver can raise.
//!
//! Per spec.md §7, steady-state simulation produces no runtime errors: every
//! `push`/`pop` refusal is a back-pressure signal handled by the pipeline
//! components themselves, not an `Err`. The only failures that reach a
//! caller are the ones the driver cannot recover from before the first
//! cycle runs — mirrored here as a small `thiserror` enum, the same way
//! `fuel-asm`'s `PanicReason` is a plain enum with no internal error
//! recovery logic of its own.

use thiserror::Error;

/// A failure that prevents the simulator from starting at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The requested target triple/CPU could not be resolved to a
    /// scheduling model.
    #[error("unknown target: {0}")]
    UnknownTarget(String),
    /// The basic block to simulate has no instructions.
    #[error("the instruction list is empty")]
    EmptyInstructionList,
    /// An instruction referenced a scheduling class the target does not
    /// define.
    #[error("unknown scheduling class: {0}")]
    UnknownSchedClass(String),
}

/// The result type used for simulator setup.
pub type SimResult<T> = Result<T, SimError>;
