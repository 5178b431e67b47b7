//! Consistency checks that run at the end of the pipeline: they never
//! modify the instruction set, only validate it, collecting as many
//! violations as possible before returning (so a single pipeline run tells
//! the caller everything wrong, not just the first problem).
//!
//! Grounded on `cleanup_instruction_set_checks.cc`.

use tracing::warn;

use crate::encoding_specification::ModRmUsage;
use crate::error::{Result, Status};
use crate::instruction_set::InstructionSet;
use crate::registry::StatusAccumulator;

/// The legal opcode-map escape values, shifted up so they line up with the
/// high bytes of [`crate::encoding_specification::EncodingSpecification::opcode`]:
/// a one-byte opcode has no escape (`0x00`), and a two/three-byte opcode's
/// escape must be exactly `0F`, `0F 38` or `0F 3A` — anything else is a
/// transcription error from the source tables.
const LEGAL_OPCODE_UPPER_BYTES: &[u32] = &[0x00, 0x0F00, 0x0F3800, 0x0F3A00];

/// Also rejects an opcode that is *exactly* an escape sequence with no
/// trailing opcode byte, since that can never be a complete instruction.
///
/// Corresponds to `CheckOpcodeFormat`.
pub fn check_opcode_format(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut status = StatusAccumulator::new();
    for instruction in &instruction_set.instructions {
        let Some(spec) = &instruction.encoding_specification else {
            let error = Status::invalid_argument(format!(
                "instruction '{}' has no encoding specification",
                instruction.mnemonic()
            ));
            warn!("{error}");
            status.update(Err(error));
            continue;
        };
        if spec.opcode_bytes.is_empty() {
            let error = Status::invalid_argument(format!(
                "instruction '{}' has a bare opcode-map prefix with no trailing opcode byte",
                instruction.mnemonic()
            ));
            warn!("{error}");
            status.update(Err(error));
            continue;
        }
        let upper_bytes = spec.opcode() & !0xFF;
        if !LEGAL_OPCODE_UPPER_BYTES.contains(&upper_bytes) {
            let error = Status::invalid_argument(format!(
                "instruction '{}' has an opcode {:#X} with an illegal escape",
                instruction.mnemonic(),
                spec.opcode()
            ));
            warn!("{error}");
            status.update(Err(error));
        }
    }
    status.into_result()
}

/// Every operand of every instruction must have a known addressing mode,
/// value size, and register class by the time this check runs; an operand
/// still carrying its default ("unknown") value means an earlier transform
/// failed to recognize its name.
///
/// Operands carrying only a tag (no name) are exempt, since they never go
/// through the name-based lookup in the first place.
///
/// Corresponds to `CheckOperandInfo`.
pub fn check_operand_info(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut status = StatusAccumulator::new();
    for instruction in &instruction_set.instructions {
        for syntax in &instruction.vendor_syntax {
            for operand in &syntax.operands {
                if operand.is_tag_only_pseudo_operand() {
                    continue;
                }
                if operand.register_class == x86_model::RegisterClass::InvalidRegisterClass
                    && operand.value_size_bits == 0
                    && operand.addressing_mode == x86_model::AddressingMode::AnyAddressingMode
                {
                    let error = Status::invalid_argument(format!(
                        "operand '{}' of instruction '{}' has no recognized info",
                        operand.name,
                        instruction.mnemonic()
                    ));
                    warn!("{error}");
                    status.update(Err(error));
                }
            }
        }
    }
    status.into_result()
}

/// No multi-byte-opcode instruction may be a strict prefix-plus-ModR/M
/// special case of a *shorter* opcode that also uses a ModR/M byte: if it
/// were, the shorter instruction's decoder would have already consumed the
/// bytes meant for the longer one, and the two could never be
/// disambiguated at decode time.
///
/// Corresponds to `CheckSpecialCaseInstructions`.
pub fn check_special_case_instructions(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut status = StatusAccumulator::new();
    let specs: Vec<_> = instruction_set
        .instructions
        .iter()
        .filter_map(|instruction| instruction.encoding_specification.as_ref())
        .collect();
    for spec in &specs {
        if spec.opcode_bytes.len() <= 1 {
            continue;
        }
        let prefix = &spec.opcode_bytes[..spec.opcode_bytes.len() - 1];
        let conflicts = specs.iter().any(|other| {
            other.opcode_bytes == prefix && matches!(other.modrm_usage, ModRmUsage::FullModRm | ModRmUsage::OpcodeExtension(_))
        });
        if conflicts {
            let error = Status::invalid_argument(format!(
                "opcode {:02X?} is a special case of a shorter ModR/M-using opcode",
                spec.opcode_bytes
            ));
            warn!("{error}");
            status.update(Err(error));
        }
    }
    status.into_result()
}

/// Every instruction must have at least one vendor syntax; one with none
/// has no mnemonic and cannot be disassembled to anything meaningful.
///
/// Corresponds to `CheckHasVendorSyntax`.
pub fn check_has_vendor_syntax(instruction_set: &mut InstructionSet) -> Result<()> {
    let mut status = StatusAccumulator::new();
    for instruction in &instruction_set.instructions {
        if instruction.vendor_syntax.is_empty() {
            let error = Status::invalid_argument("instruction has no vendor syntax");
            warn!("{error}");
            status.update(Err(error));
        }
    }
    status.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_set::Instruction;

    #[test]
    fn rejects_instruction_with_no_vendor_syntax() {
        let mut instruction = Instruction::new("NOP", "90");
        instruction.vendor_syntax.clear();
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        assert!(check_has_vendor_syntax(&mut instruction_set).is_err());
    }

    #[test]
    fn accepts_well_formed_opcode() {
        let mut instruction = Instruction::new("ADD", "00 /r");
        instruction.encoding_specification =
            Some(crate::encoding_specification::parse(&instruction.raw_encoding_specification).unwrap());
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        assert!(check_opcode_format(&mut instruction_set).is_ok());
    }
}
