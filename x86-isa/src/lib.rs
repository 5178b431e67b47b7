//! Parses and cleans up an x86-64 instruction-set database scraped from the
//! Intel manuals: normalizes binary encoding specifications, fixes a
//! collection of known inconsistencies in how individual instructions are
//! documented, and fills in structured per-operand metadata (addressing
//! mode, size, register class, read/write usage) that the source tables
//! leave implicit.
//!
//! The pipeline is a priority-ordered list of independent transforms (see
//! [`registry`]) run one after another against an [`instruction_set::InstructionSet`];
//! [`transforms::default_registry`] returns the registry this crate ships
//! with.

pub mod encoding_specification;
pub mod error;
pub mod instruction_set;
pub mod operand_tables;
pub mod registry;
mod transforms;

pub use transforms::default_registry;

use crate::error::Result;
use crate::instruction_set::InstructionSet;

/// Runs the default cleanup pipeline against `instruction_set` in place.
pub fn clean_up(instruction_set: &mut InstructionSet) -> Result<()> {
    default_registry().run_all(instruction_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_set::Instruction;
    use x86_model::Operand;

    #[test]
    fn default_registry_is_non_empty() {
        let registry = default_registry();
        assert!(!registry.is_empty());
    }

    #[test]
    fn clean_up_runs_end_to_end_on_a_simple_instruction() {
        let mut add = Instruction::new("ADD", "00 /r");
        add.vendor_syntax[0].operands = vec![Operand::named("r/m8"), Operand::named("r8")];
        let mut instruction_set = InstructionSet::new(vec![add]);
        clean_up(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_ne!(operands[0].register_class, x86_model::RegisterClass::InvalidRegisterClass);
        assert_ne!(operands[1].register_class, x86_model::RegisterClass::InvalidRegisterClass);
    }
}
