//! C8 — the cycle-driven pipeline stages wired together by the buffers in
//! [`crate::buffers`]: Fetcher, Parser, Decoder, Renamer (+ the register
//! renamer's physical-register table), the reorder buffer, issue policies,
//! execution units, and the Retirer.

pub mod decoder;
pub mod execution_unit;
pub mod fetcher;
pub mod issue_policy;
pub mod parser;
pub mod renamer;
pub mod retirer;
pub mod rob;

pub use decoder::InstructionDecoder;
pub use execution_unit::{NonPipelinedExecutionUnit, PipelinedExecutionUnit, SimplifiedExecutionUnit};
pub use fetcher::Fetcher;
pub use issue_policy::{Greedy, IssuePolicy, LeastLoaded};
pub use parser::InstructionParser;
pub use renamer::{PhysRegTable, Renamer};
pub use retirer::Retirer;
pub use rob::{Rob, RobState};

use std::cell::RefCell;
use std::rc::Rc;

/// Shared, interior-mutable handle to a buffer or table two or more
/// components need write access to. The simulator is single-threaded
/// cooperative (spec.md §5): nothing here needs `Mutex`, but the sharing
/// itself still has to go through `RefCell` because ordinary borrowing
/// can't express "the Renamer and the ROB both hold a handle to the same
/// buffer".
pub type Shared<T> = Rc<RefCell<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}
