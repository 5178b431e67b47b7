//! The four status kinds distinguished by the cleanup pipeline, plus two
//! rarer ones (`Unimplemented`, `Unknown`) carried over from the original
//! `canonical_errors` helpers for parity with call sites that need them.
//!
//! Modelled as a small closed enum rather than `anyhow::Error`: callers
//! (the transform registry in particular) need to pattern-match on the
//! kind to decide whether a failure should abort the whole run or just be
//! recorded and skipped.

use derive_more::Display;

/// A pipeline error, tagged with the canonical kind that describes how a
/// caller should react to it.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display(fmt = "{kind}: {message}")]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl std::error::Error for Status {}

/// Mirrors `exegesis::util::canonical_errors`' error constructors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// The input does not conform to the expected syntax or shape.
    #[display(fmt = "invalid argument")]
    InvalidArgument,
    /// The input is well-formed but the database is not in the state this
    /// operation requires (e.g. a transform that must run after another one
    /// whose output is missing).
    #[display(fmt = "failed precondition")]
    FailedPrecondition,
    /// A lookup (by mnemonic, by name, ...) found nothing.
    #[display(fmt = "not found")]
    NotFound,
    /// A recognized-but-unsupported construct was encountered.
    #[display(fmt = "unimplemented")]
    Unimplemented,
    /// A bug: an invariant the pipeline itself is supposed to maintain was
    /// violated.
    #[display(fmt = "internal")]
    Internal,
    /// None of the above; kept for parity with the original error helpers.
    #[display(fmt = "unknown")]
    Unknown,
}

impl Status {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::InvalidArgument, message: message.into() }
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::FailedPrecondition, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::NotFound, message: message.into() }
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Unimplemented, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Internal, message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self { kind: StatusKind::Unknown, message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StatusKind::NotFound
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind == StatusKind::InvalidArgument
    }
}

pub type Result<T> = std::result::Result<T, Status>;
