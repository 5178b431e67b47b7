//! Fills in the structured per-operand fields (addressing mode, size,
//! encoding slot, register class, usage) from the static operand taxonomy
//! and from the instruction's parsed encoding specification.
//!
//! Grounded on `cleanup_instruction_set_operand_info.cc`.

use x86_model::{AddressingMode, EncodingSlot, Usage};

use crate::encoding_specification::available_encodings;
use crate::error::{Result, Status};
use crate::instruction_set::InstructionSet;
use crate::operand_tables;

/// The order of encoding slots a non-fixed operand should be matched
/// against, given its addressing mode, before falling back to whatever slot
/// is left over. Mirrors spec's `encoding_scheme`-letter heuristic (`M` →
/// `MODRM_RM`, `R` → `MODRM_REG` then `VEX_SUFFIX`, `V` → `VEX_V`, `X` →
/// `MODRM_REG`, `I` → `IMMEDIATE`) without needing the letter string itself:
/// an operand's addressing mode already tells us which family of slot it can
/// possibly bind to, so binding is done by slot kind rather than by the
/// position the operand happens to appear in.
fn preferred_slots(addressing_mode: AddressingMode) -> &'static [EncodingSlot] {
    use AddressingMode as A;
    match addressing_mode {
        A::IndirectAddressingWithVsib => &[EncodingSlot::Vsib],
        A::IndirectAddressing
        | A::IndirectAddressingWithBase
        | A::IndirectAddressingWithBaseAndDisplacement
        | A::AnyAddressingWithFlexibleRegisters
        | A::LoadEffectiveAddress
        | A::BlockDirectAddressing => &[EncodingSlot::ModrmRm, EncodingSlot::Vsib],
        A::DirectAddressing | A::AnyAddressingWithFixedRegisters => {
            &[EncodingSlot::ModrmReg, EncodingSlot::VexSuffix, EncodingSlot::Opcode, EncodingSlot::VexV]
        }
        A::NoAddressing => &[EncodingSlot::ImmediateValue],
        A::IndirectAddressingByRsi | A::IndirectAddressingByRdi | A::AnyAddressingMode => &[],
    }
}

/// Removes and returns the first slot in `available` that matches one of
/// `preferred`'s slot kinds, in `preferred`'s priority order; `None` if no
/// preferred kind remains.
fn take_preferred_slot(available: &mut Vec<EncodingSlot>, preferred: &[EncodingSlot]) -> Option<EncodingSlot> {
    for kind in preferred {
        if let Some(position) = available.iter().position(|slot| slot == kind) {
            return Some(available.remove(position));
        }
    }
    None
}

/// Assigns `addressing_mode`, `value_size_bits`, `register_class` and
/// `encoding` to every operand of every vendor syntax, consuming the
/// instruction's available encoding slots (C1's `available_encodings`)
/// against the operand's addressing-mode-derived slot kind (see
/// [`preferred_slots`]), falling back to whatever is left over only when no
/// preferred kind remains.
///
/// Operands whose name pins down a fixed slot (angle-bracket fixed
/// registers, `ST(0)`) are assigned that slot directly and do not consume
/// one from the available multiset: they are not actually encoded anywhere.
///
/// Fails with `InvalidArgument` if an operand needs a slot and the
/// encoding's available multiset is already exhausted: per spec, the
/// multiset of explicit operands' encodings must equal the multiset of
/// available slots (minus implicit operands), so running out is a
/// malformed instruction record, not something to paper over.
///
/// Must run after `RenameOperands`. Corresponds to `AddOperandInfo`.
pub fn add_operand_info(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let Some(spec) = &instruction.encoding_specification else {
            return Err(Status::failed_precondition(format!(
                "add_operand_info requires a parsed encoding specification for '{}'",
                instruction.mnemonic()
            )));
        };
        let mnemonic = instruction.mnemonic().to_string();

        for syntax in &mut instruction.vendor_syntax {
            let mut available = available_encodings(spec);

            for operand in &mut syntax.operands {
                let Some(template) = operand_tables::lookup(&operand.name) else {
                    continue;
                };
                operand.addressing_mode = template.addressing_mode;
                operand.value_size_bits = template.value_size_bits;
                operand.register_class = template.register_class;
                operand.encoding = match template.fixed_encoding {
                    Some(slot) => slot,
                    None => {
                        let preferred = preferred_slots(template.addressing_mode);
                        take_preferred_slot(&mut available, preferred)
                            .or_else(|| (!available.is_empty()).then(|| available.remove(0)))
                            .ok_or_else(|| {
                                Status::invalid_argument(format!(
                                    "instruction '{mnemonic}' has more positional operands than the \
                                     encoding specification exposes encoding slots for"
                                ))
                            })?
                    }
                };
            }
        }
    }
    Ok(())
}

/// Fills in `usage` for operands the SDM leaves unspecified: an immediate
/// can only be read; a `VEX.vvvv` operand is a source unless the manual
/// says otherwise (table 2-9 of the SDM volume 2), and it is an error for
/// one to appear at position 0 with no usage, since `vvvv` never encodes a
/// plain destination there; an implicit, directly-addressed operand (e.g.
/// `AND AX, imm8`'s `AX`) is written when it is the first operand and read
/// otherwise; an implicit operand with no addressing at all is an implicit
/// immediate, always read.
///
/// Corresponds to `AddMissingOperandUsage`.
pub fn add_missing_operand_usage(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let mnemonic = instruction.mnemonic().to_string();
        for syntax in &mut instruction.vendor_syntax {
            for (position, operand) in syntax.operands.iter_mut().enumerate() {
                if operand.usage != Usage::UsageUnknown {
                    continue;
                }
                operand.usage = match operand.encoding {
                    EncodingSlot::ImmediateValue => Usage::UsageRead,
                    EncodingSlot::VexV => {
                        if position == 0 {
                            return Err(Status::invalid_argument(format!(
                                "instruction '{mnemonic}' has a VEX.vvvv operand without a usage \
                                 specification at position 0"
                            )));
                        }
                        Usage::UsageRead
                    }
                    EncodingSlot::ImplicitEncoding if operand.addressing_mode == AddressingMode::DirectAddressing => {
                        if position == 0 {
                            Usage::UsageWrite
                        } else {
                            Usage::UsageRead
                        }
                    }
                    EncodingSlot::ImplicitEncoding if operand.addressing_mode == AddressingMode::NoAddressing => {
                        Usage::UsageRead
                    }
                    _ => Usage::UsageUnknown,
                };
            }
        }
    }
    Ok(())
}

/// `VBLENDVPS`/`VBLENDVPD`/`PBLENDVB`'s `/is4`-encoded selector operand
/// is consistently missing a usage annotation in the manual across several
/// revisions; it is always read-only.
///
/// Corresponds to `AddMissingOperandUsageToVblendInstructions`.
pub fn add_missing_operand_usage_to_vblend_instructions(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        if !instruction.mnemonic().starts_with("VBLEND") && instruction.mnemonic() != "PBLENDVB" {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.encoding == x86_model::EncodingSlot::VexSuffix && operand.usage == Usage::UsageUnknown {
                    operand.usage = Usage::UsageRead;
                }
            }
        }
    }
    Ok(())
}

/// Starting with the November 2018 SDM revision, Intel stopped documenting
/// which operand is bound to `VEX.vvvv`/`EVEX.vvvv` directly in the
/// encoding specification text. When the specification's `NDS`/`NDD`/`DDS`
/// token already names the role (`encoding_specification::VexOperandUsage`),
/// that role is authoritative and nothing here needs reconstructing;
/// otherwise this requires that exactly one operand consumed the `VexV`
/// slot in `add_operand_info`, and sets its usage to read if still unset.
///
/// Corresponds to `AddMissingVexVOperandUsage`.
pub fn add_missing_vex_v_operand_usage(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        let role_already_known = instruction
            .encoding_specification
            .as_ref()
            .and_then(|spec| spec.vex_prefix.as_ref())
            .is_some_and(|vex| vex.vex_operand_usage.is_some());
        if role_already_known {
            continue;
        }
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.encoding == x86_model::EncodingSlot::VexV && operand.usage == Usage::UsageUnknown {
                    operand.usage = Usage::UsageRead;
                }
            }
        }
    }
    Ok(())
}

/// Assigns `register_class` to every operand, derived the same way
/// `add_operand_info` derives addressing mode and size (straight from the
/// static taxonomy); split into its own transform because some operands
/// only get a name (and thus a register class) after earlier transforms
/// run, while `add_operand_info`'s positional-slot consumption must happen
/// exactly once, early.
///
/// Corresponds to `AddRegisterClassToOperands`.
pub fn add_register_class_to_operands(instruction_set: &mut InstructionSet) -> Result<()> {
    for instruction in &mut instruction_set.instructions {
        for syntax in &mut instruction.vendor_syntax {
            for operand in &mut syntax.operands {
                if operand.register_class != x86_model::RegisterClass::InvalidRegisterClass {
                    continue;
                }
                if let Some(template) = operand_tables::lookup(&operand.name) {
                    operand.register_class = template.register_class;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction_set::Instruction;
    use x86_model::{EncodingSlot, Operand};

    #[test]
    fn assigns_modrm_slots_in_order() {
        let mut instruction = Instruction::new("ADD", "00 /r");
        instruction.vendor_syntax[0].operands = vec![Operand::named("r/m8"), Operand::named("r8")];
        instruction.encoding_specification =
            Some(crate::encoding_specification::parse(&instruction.raw_encoding_specification).unwrap());
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_operand_info(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].encoding, EncodingSlot::ModrmRm);
        assert_eq!(operands[1].encoding, EncodingSlot::ModrmReg);
    }

    #[test]
    fn vsib_operand_consumes_the_vsib_slot() {
        let mut instruction = Instruction::new("VPGATHERDD", "VEX.DDS.128.66.0F38.W0 90 /vsib");
        instruction.vendor_syntax[0].operands =
            vec![Operand::named("xmm1"), Operand::named("vm32x"), Operand::named("xmm2")];
        instruction.encoding_specification =
            Some(crate::encoding_specification::parse(&instruction.raw_encoding_specification).unwrap());
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_operand_info(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].encoding, EncodingSlot::ModrmReg);
        assert_eq!(operands[1].encoding, EncodingSlot::Vsib);
        assert_eq!(operands[2].encoding, EncodingSlot::VexV);
    }

    #[test]
    fn missing_encoding_specification_is_a_failed_precondition() {
        let mut instruction_set = InstructionSet::new(vec![Instruction::new("ADD", "00 /r")]);
        let status = add_operand_info(&mut instruction_set).unwrap_err();
        assert!(!status.is_invalid_argument());
    }

    #[test]
    fn immediate_defaults_to_read() {
        let mut operand = Operand::named("imm8");
        operand.encoding = EncodingSlot::ImmediateValue;
        let mut instruction = Instruction::new("ADD", "04 ib");
        instruction.vendor_syntax[0].operands = vec![operand];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_missing_operand_usage(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].usage, Usage::UsageRead);
    }

    #[test]
    fn vex_v_not_at_position_zero_defaults_to_read() {
        let mut dest = Operand::named("xmm1");
        dest.encoding = EncodingSlot::ModrmReg;
        let mut vexv = Operand::named("xmm2");
        vexv.encoding = EncodingSlot::VexV;
        let mut instruction = Instruction::new("VADDPS", "VEX.NDS.128.0F.WIG 58 /r");
        instruction.vendor_syntax[0].operands = vec![dest, vexv];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_missing_operand_usage(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[1].usage, Usage::UsageRead);
    }

    #[test]
    fn vex_v_at_position_zero_without_usage_is_an_error() {
        let mut vexv = Operand::named("xmm1");
        vexv.encoding = EncodingSlot::VexV;
        let mut instruction = Instruction::new("VADDPS", "VEX.NDS.128.0F.WIG 58 /r");
        instruction.vendor_syntax[0].operands = vec![vexv];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        let status = add_missing_operand_usage(&mut instruction_set).unwrap_err();
        assert!(status.is_invalid_argument());
    }

    #[test]
    fn implicit_direct_addressed_operand_at_position_zero_is_written() {
        let mut operand = Operand::named("AX");
        operand.encoding = EncodingSlot::ImplicitEncoding;
        operand.addressing_mode = AddressingMode::DirectAddressing;
        let mut instruction = Instruction::new("AND", "25 iw");
        instruction.vendor_syntax[0].operands = vec![operand];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_missing_operand_usage(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].usage, Usage::UsageWrite);
    }

    #[test]
    fn implicit_direct_addressed_operand_after_position_zero_is_read() {
        let mut dest = Operand::named("r32");
        dest.encoding = EncodingSlot::ModrmReg;
        let mut implicit = Operand::named("CL");
        implicit.encoding = EncodingSlot::ImplicitEncoding;
        implicit.addressing_mode = AddressingMode::DirectAddressing;
        let mut instruction = Instruction::new("SHL", "D3 /4");
        instruction.vendor_syntax[0].operands = vec![dest, implicit];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_missing_operand_usage(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[1].usage, Usage::UsageRead);
    }

    #[test]
    fn implicit_operand_with_no_addressing_is_read() {
        let mut operand = Operand::named("1");
        operand.encoding = EncodingSlot::ImplicitEncoding;
        operand.addressing_mode = AddressingMode::NoAddressing;
        let mut instruction = Instruction::new("SHL", "D1 /4");
        instruction.vendor_syntax[0].operands = vec![operand];
        let mut instruction_set = InstructionSet::new(vec![instruction]);
        add_missing_operand_usage(&mut instruction_set).unwrap();
        let operands = &instruction_set.instructions[0].vendor_syntax[0].operands;
        assert_eq!(operands[0].usage, Usage::UsageRead);
    }
}
